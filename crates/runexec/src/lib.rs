//! Bounded external command execution.
//! （提供具逾時限制的外部指令執行。）
//!
//! The executor wraps `std::process::Command` for tools that may hang: stdin
//! is closed, stdout/stderr are drained on background threads so a chatty
//! child never blocks on a full pipe, and a timeout kills and reaps the
//! child before returning. The deadline also bounds output collection, so a
//! background process that inherited the pipes cannot hold the caller.
//! 本模組封裝 `std::process::Command`：關閉標準輸入、於背景執行緒讀取輸出，
//! 逾時則強制終止並回收子行程；讀取輸出同樣受逾時限制。

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Errors that may surface while preparing or executing a command.
/// （準備或執行指令時有可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum RunError {
    #[error("program {0:?} not found")]
    ProgramNotFound(String),
    #[error("failed to spawn process: {0}")]
    Spawn(io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(io::Error),
    #[error("failed to terminate process: {0}")]
    Kill(io::Error),
}

/// Command specification.
/// （指令設定資料結構。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl RunSpec {
    /// Creates a new command pointing at the given program.
    /// （以指定的程式建立指令設定。）
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Appends an argument to the command.
    /// （為指令加入一個參數。）
    pub fn push_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments at once.
    /// （一次加入多個參數。）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    /// （設定指令執行的工作目錄。）
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Bounds the whole execution, output collection included. The child is
    /// killed when the limit is reached.
    /// （設定指令執行的逾時限制，逾時即終止進程。）
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.max(Duration::from_millis(1)));
        self
    }
}

/// Result information produced by a command execution.
/// （指令執行完成後的結果資訊。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub timed_out: bool,
    /// Output pipes were still held open when the deadline passed; the
    /// captured streams may be incomplete.
    pub output_truncated: bool,
}

impl RunResult {
    /// Indicates whether the command exited successfully (code `0`).
    /// （判斷指令是否以 0 代表成功結束。）
    pub fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }
}

/// Executes commands according to the provided specification.
/// （依照設定執行指令的主要元件。）
pub struct RunExecutor;

impl RunExecutor {
    /// Runs the provided command and captures output.
    /// （執行指定指令並擷取輸出。）
    pub fn execute(spec: &RunSpec) -> Result<RunResult, RunError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let start = Instant::now();
        let deadline = spec.timeout.map(|timeout| start + timeout);
        let mut child = command.spawn().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => RunError::ProgramNotFound(spec.program.clone()),
            _ => RunError::Spawn(err),
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(RunError::Poll)? {
                break Some(status);
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    child.kill().map_err(RunError::Kill)?;
                    child.wait().map_err(RunError::Poll)?;
                    timed_out = true;
                    break None;
                }
                _ => thread::sleep(POLL_INTERVAL),
            }
        };

        // Readers still blocked at the deadline are left detached: whatever
        // holds the pipes open is not ours to wait for.
        let (stdout, stdout_done) = collect(stdout, deadline);
        let (stderr, stderr_done) = collect(stderr, deadline);

        Ok(RunResult {
            exit_code: status.and_then(|status| status.code()),
            stdout,
            stderr,
            duration: start.elapsed(),
            timed_out,
            output_truncated: !(stdout_done && stderr_done),
        })
    }
}

fn drain<R>(stream: Option<R>) -> Option<Receiver<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    stream.map(|mut stream| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stream.read_to_end(&mut buffer);
            let _ = sender.send(buffer);
        });
        receiver
    })
}

fn collect(receiver: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> (Vec<u8>, bool) {
    let Some(receiver) = receiver else {
        return (Vec::new(), true);
    };
    let received = match deadline {
        Some(deadline) => {
            receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())).ok()
        }
        None => receiver.recv().ok(),
    };
    match received {
        Some(buffer) => (buffer, true),
        None => (Vec::new(), false),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::str;
    use tempfile::tempdir;

    fn require_utf8(bytes: &[u8]) -> &str {
        str::from_utf8(bytes).expect("output should be valid UTF-8 / 輸出需為有效 UTF-8")
    }

    #[test]
    fn execute_command_with_arguments() {
        let spec = RunSpec::new("sh").with_args(["-c", "printf '%s' \"$0\"", "hello-texdesk"]);

        let result = RunExecutor::execute(&spec).expect("command should execute / 指令應成功執行");
        assert!(result.success(), "exit code should be zero / 結束碼應為 0");
        assert_eq!(require_utf8(&result.stdout), "hello-texdesk");
        assert!(
            require_utf8(&result.stderr).is_empty(),
            "stderr should be empty / 錯誤輸出應為空"
        );
    }

    #[test]
    fn execute_with_custom_working_directory() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let spec = RunSpec::new("sh")
            .with_args(["-c", "touch created.txt && pwd"])
            .with_working_dir(temp.path());

        let result = RunExecutor::execute(&spec).expect("command should execute / 指令應成功執行");
        assert!(result.success());
        assert!(temp.path().join("created.txt").exists());
    }

    #[test]
    fn stdin_is_closed() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "cat; echo done"])
            .with_timeout(Duration::from_secs(5));

        let result = RunExecutor::execute(&spec).expect("command should execute / 指令應成功執行");
        assert!(result.success(), "cat must see EOF instead of waiting / cat 應立即讀到 EOF");
        assert_eq!(require_utf8(&result.stdout), "done\n");
    }

    #[test]
    fn large_output_does_not_block() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "i=0; while [ $i -lt 4000 ]; do echo 'overfull hbox in paragraph at lines 1--2'; i=$((i+1)); done"])
            .with_timeout(Duration::from_secs(20));

        let result = RunExecutor::execute(&spec).expect("command should execute / 指令應成功執行");
        assert!(result.success());
        assert!(result.stdout.len() > 64 * 1024);
    }

    #[test]
    fn nonzero_exit_is_reported() {
        let spec = RunSpec::new("sh").with_args(["-c", "echo oops >&2; exit 3"]);
        let result = RunExecutor::execute(&spec).expect("command should execute / 指令應成功執行");
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(require_utf8(&result.stderr), "oops\n");
    }

    #[test]
    fn enforce_timeout_and_kill() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "sleep 5 && echo done"])
            .with_timeout(Duration::from_millis(100));

        let result =
            RunExecutor::execute(&spec).expect("command should report timeout / 指令應回報逾時");
        assert!(result.timed_out, "result should indicate timeout / 結果需標示逾時");
        assert!(!result.success());
        assert!(result.duration < Duration::from_secs(5));
    }

    #[test]
    fn background_process_holding_pipes_does_not_outlive_timeout() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "sleep 5 & echo started"])
            .with_timeout(Duration::from_millis(500));

        let started = Instant::now();
        let result = RunExecutor::execute(&spec).expect("command should execute / 指令應成功執行");
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!result.timed_out, "the direct child exited in time / 子行程已準時結束");
        assert_eq!(result.exit_code, Some(0));
        assert!(result.output_truncated);
    }

    #[test]
    fn missing_program_is_distinguished() {
        let spec = RunSpec::new("texdesk-definitely-not-installed");
        let err = RunExecutor::execute(&spec).unwrap_err();
        assert!(matches!(err, RunError::ProgramNotFound(name) if name == "texdesk-definitely-not-installed"));
    }
}
