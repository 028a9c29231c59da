use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Whether a trashed item was a file or a folder.
/// 被丟入垃圾桶的項目類型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Directory,
}

/// One ledger record: where a trash slot came from and when.
/// 帳本中的一筆紀錄：垃圾桶槽位的來源與刪除時間。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    #[serde(rename = "trashFileName")]
    pub slot_name: String,
    #[serde(rename = "originalName")]
    pub original_name: String,
    #[serde(rename = "originalPath")]
    pub original_path: String,
    #[serde(rename = "deletedAt", with = "deleted_at")]
    pub deleted_at: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

impl TrashEntry {
    /// Logical path of the slot, relative to the workspace root.
    pub fn slot_path(&self, trash_dir_name: &str) -> String {
        format!("{trash_dir_name}/{}", self.slot_name)
    }
}

// RFC 3339 on write; offset-less ISO-8601 timestamps (local time) are
// accepted on read.
mod deleted_at {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{de::Error as DeError, Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(value: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid deletedAt timestamp: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Local>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Local))
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
                    .ok()
                    .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            })
    }
}
