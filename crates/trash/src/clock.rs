use chrono::{DateTime, Local};

/// Time source for deletion timestamps and slot names.
/// 刪除時間與槽位名稱所用的時間來源。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time in the local zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
