use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::errors::HawxError;
use crate::models::ExecutionStatus;
use crate::utils::text::clean_line;
use super::TimeoutPolicy;

/// How long output is still collected after the process itself has exited.
const EXIT_DRAIN: Duration = Duration::from_millis(500);

/// Which timer ended a process early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Idle,
    Total,
}

impl TimeoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "inactivity",
            Self::Total => "total",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Cleaned output lines, stdout and stderr interleaved in arrival order.
    pub lines: Vec<String>,
    pub exit_code: Option<i32>,
    pub timed_out: Option<TimeoutKind>,
}

impl ProcessOutput {
    pub fn status(&self) -> ExecutionStatus {
        if self.timed_out.is_some() {
            ExecutionStatus::Timeout
        } else {
            ExecutionStatus::Success
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Raw per-command log, written line by line as output arrives.
pub struct CommandLog {
    path: PathBuf,
    file: tokio::fs::File,
}

impl CommandLog {
    pub async fn create(path: &Path, command: &str) -> Result<Self, HawxError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(format!("# Command: {}\n\n", command).as_bytes()).await?;
        file.flush().await?;
        Ok(Self { path: path.to_path_buf(), file })
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), HawxError> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Spawn `argv`, stream its output into `log`, and enforce `policy`.
///
/// `on_line` sees every cleaned line as it arrives. A non-zero exit is a
/// normal completion. Spawn failures (including a missing binary) are
/// returned as `HawxError::Process`.
pub async fn run_process<F>(
    argv: &[String],
    policy: &TimeoutPolicy,
    log: &mut CommandLog,
    mut on_line: F,
) -> Result<ProcessOutput, HawxError>
where
    F: FnMut(&str),
{
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| HawxError::Process("empty argv".into()))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HawxError::Process(format!("{}: command not found", program))
        } else {
            HawxError::Process(format!("failed to spawn {}: {}", program, e))
        }
    })?;

    let (tx, mut rx) = mpsc::channel::<String>(512);
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone());
    }
    drop(tx);

    let pid = child.id();
    let total_deadline = Instant::now() + policy.total;
    let mut idle_deadline = Instant::now() + policy.idle;
    let mut lines = Vec::new();
    let mut output_open = true;
    let mut exit_code = None;

    // Output and exit are watched together: closed pipes do not stop the
    // timers, and an exit does not wait for pipes held by descendants.
    let timed_out = loop {
        tokio::select! {
            received = rx.recv(), if output_open => match received {
                Some(raw) => {
                    idle_deadline = Instant::now() + policy.idle;
                    let line = clean_line(&raw);
                    log.write_line(&line).await?;
                    on_line(&line);
                    lines.push(line);
                }
                None => output_open = false,
            },
            status = child.wait() => {
                match status {
                    Ok(status) => exit_code = status.code(),
                    Err(e) => warn!(program = %program, error = %e, "Failed to reap process"),
                }
                break None;
            }
            _ = sleep_until(idle_deadline) => break Some(TimeoutKind::Idle),
            _ = sleep_until(total_deadline) => break Some(TimeoutKind::Total),
        }
    };

    if timed_out.is_none() && output_open {
        let drain_deadline = Instant::now() + EXIT_DRAIN;
        loop {
            match timeout_at(drain_deadline, rx.recv()).await {
                Ok(Some(raw)) => {
                    let line = clean_line(&raw);
                    log.write_line(&line).await?;
                    on_line(&line);
                    lines.push(line);
                }
                Ok(None) => {
                    output_open = false;
                    break;
                }
                Err(_) => break,
            }
        }
        if output_open {
            debug!(program = %program, "Background processes still hold the output, terminating them");
            if let Some(pid) = pid {
                signal_group(pid, "-TERM").await;
            }
        }
    }

    if let Some(kind) = timed_out {
        let limit = match kind {
            TimeoutKind::Idle => policy.idle,
            TimeoutKind::Total => policy.total,
        };
        debug!(program = %program, kind = kind.as_str(), "Terminating process");
        terminate(&mut child, policy.grace).await;

        while let Ok(raw) = rx.try_recv() {
            let line = clean_line(&raw);
            log.write_line(&line).await?;
            lines.push(line);
        }
        log.write_line(&format!(
            "Process terminated due to {}s {} timeout",
            limit.as_secs(),
            kind.as_str()
        ))
        .await?;
    }

    Ok(ProcessOutput { lines, exit_code, timed_out })
}

fn spawn_reader<R>(stream: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// SIGTERM the process group, wait out `grace`, then SIGKILL.
async fn terminate(child: &mut Child, grace: Duration) {
    let pid = child.id();
    if let Some(pid) = pid {
        signal_group(pid, "-TERM").await;
    }

    if timeout(grace, child.wait()).await.is_ok() {
        return;
    }

    if let Some(pid) = pid {
        signal_group(pid, "-KILL").await;
    }
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill after grace window failed");
    }
    let _ = child.wait().await;
}

async fn signal_group(pid: u32, signal: &str) {
    // Negative pid addresses the whole process group created at spawn.
    let target = if cfg!(unix) { format!("-{}", pid) } else { pid.to_string() };
    let result = Command::new("kill")
        .args([signal, "--", target.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        debug!(pid, signal, error = %e, "kill invocation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn policy(idle_ms: u64, total_ms: u64) -> TimeoutPolicy {
        TimeoutPolicy {
            idle: Duration::from_millis(idle_ms),
            total: Duration::from_millis(total_ms),
            baseline_multiplier: 1,
            grace: Duration::from_millis(500),
        }
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/t.txt");
        let mut log = CommandLog::create(&path, "test").await.unwrap();
        let out = run_process(&sh("echo out; echo err 1>&2"), &policy(5000, 10_000), &mut log, |_| {})
            .await
            .unwrap();
        assert_eq!(out.status(), ExecutionStatus::Success);
        assert!(out.lines.contains(&"out".to_string()));
        assert!(out.lines.contains(&"err".to_string()));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Command: test\n\n"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_normal_completion() {
        let dir = TempDir::new().unwrap();
        let mut log = CommandLog::create(&dir.path().join("x.txt"), "x").await.unwrap();
        let out = run_process(&sh("echo partial; exit 3"), &policy(5000, 10_000), &mut log, |_| {})
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.status(), ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_idle_timeout_kills_and_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idle.txt");
        let mut log = CommandLog::create(&path, "idle").await.unwrap();
        let started = std::time::Instant::now();
        let out = run_process(&sh("echo hello; sleep 30"), &policy(300, 20_000), &mut log, |_| {})
            .await
            .unwrap();
        assert_eq!(out.timed_out, Some(TimeoutKind::Idle));
        assert_eq!(out.status(), ExecutionStatus::Timeout);
        assert!(started.elapsed() < Duration::from_secs(10));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("hello"));
        assert!(content.contains("inactivity timeout"));
    }

    #[tokio::test]
    async fn test_idle_timeout_fires_after_output_is_closed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quiet.txt");
        let mut log = CommandLog::create(&path, "quiet").await.unwrap();
        let started = std::time::Instant::now();
        let out = run_process(
            &sh("echo hi; exec >/dev/null 2>&1; sleep 20"),
            &policy(500, 8000),
            &mut log,
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(out.timed_out, Some(TimeoutKind::Idle));
        assert!(started.elapsed() < Duration::from_secs(4));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("hi"));
        assert!(content.contains("inactivity timeout"));
    }

    #[tokio::test]
    async fn test_exit_completes_while_background_child_holds_output() {
        let dir = TempDir::new().unwrap();
        let mut log = CommandLog::create(&dir.path().join("bg.txt"), "bg").await.unwrap();
        let started = std::time::Instant::now();
        let out = run_process(&sh("echo done; sleep 20 &"), &policy(800, 10_000), &mut log, |_| {})
            .await
            .unwrap();
        assert_eq!(out.timed_out, None);
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.status(), ExecutionStatus::Success);
        assert_eq!(out.lines, vec!["done"]);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_total_timeout_fires_despite_activity() {
        let dir = TempDir::new().unwrap();
        let mut log = CommandLog::create(&dir.path().join("busy.txt"), "busy").await.unwrap();
        let script = "while true; do echo tick; sleep 0.1; done";
        let out = run_process(&sh(script), &policy(2000, 700), &mut log, |_| {}).await.unwrap();
        assert_eq!(out.timed_out, Some(TimeoutKind::Total));
        assert!(!out.lines.is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_process_error() {
        let dir = TempDir::new().unwrap();
        let mut log = CommandLog::create(&dir.path().join("m.txt"), "m").await.unwrap();
        let argv = vec!["hawx-definitely-not-a-binary".to_string()];
        let err = run_process(&argv, &policy(1000, 1000), &mut log, |_| {}).await.unwrap_err();
        assert!(matches!(err, HawxError::Process(_)));
    }

    #[tokio::test]
    async fn test_on_line_sees_cleaned_lines() {
        let dir = TempDir::new().unwrap();
        let mut log = CommandLog::create(&dir.path().join("c.txt"), "c").await.unwrap();
        let mut seen = Vec::new();
        run_process(&sh("printf '\\033[31mred\\033[0m\\n'"), &policy(5000, 10_000), &mut log, |l| {
            seen.push(l.to_string())
        })
        .await
        .unwrap();
        assert_eq!(seen, vec!["red"]);
    }
}
