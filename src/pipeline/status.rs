use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::runner::tool_name;
use crate::utils::formatting::snippet;

const SNIPPET_WIDTH: usize = 60;
const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Pending,
    Running,
    Done,
    Error,
}

impl CommandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub tool: String,
    pub command: String,
    pub state: CommandState,
    pub last_line: String,
}

impl StatusEntry {
    pub fn render(&self) -> String {
        format!("[{}] {}: {}", self.state.as_str(), self.tool, self.last_line)
    }
}

/// Live state of every command in one layer, written by workers and read by
/// the supervisor.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    entries: Vec<StatusEntry>,
}

pub type SharedStatus = Arc<Mutex<StatusTable>>;

impl StatusTable {
    pub fn new(commands: &[String]) -> Self {
        let entries = commands
            .iter()
            .map(|c| StatusEntry {
                tool: tool_name(c),
                command: c.clone(),
                state: CommandState::Pending,
                last_line: String::new(),
            })
            .collect();
        Self { entries }
    }

    pub fn shared(commands: &[String]) -> SharedStatus {
        Arc::new(Mutex::new(Self::new(commands)))
    }

    pub fn set_state(&mut self, index: usize, state: CommandState) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.state = state;
        }
    }

    pub fn record_line(&mut self, index: usize, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Some(entry) = self.entries.get_mut(index) {
            entry.last_line = snippet(line.trim(), SNIPPET_WIDTH);
        }
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn is_finished(&self) -> bool {
        self.entries.iter().all(|e| e.state.is_terminal())
    }
}

/// Lock the table even if a worker panicked while holding it.
pub fn lock(status: &SharedStatus) -> MutexGuard<'_, StatusTable> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Redraws a layer's status table on an interval until `cancel` fires.
pub fn spawn_supervisor(status: SharedStatus, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let style = ProgressStyle::default_spinner()
            .template("    {spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bars: Vec<ProgressBar> = lock(&status)
            .entries()
            .iter()
            .map(|entry| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style.clone());
                bar.set_message(entry.render());
                bar
            })
            .collect();

        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => refresh(&status, &bars),
            }
        }

        refresh(&status, &bars);
        for bar in bars {
            bar.finish();
        }
    })
}

fn refresh(status: &SharedStatus, bars: &[ProgressBar]) {
    let table = lock(status);
    for (entry, bar) in table.entries().iter().zip(bars) {
        bar.set_message(entry.render());
        if entry.state == CommandState::Running {
            bar.tick();
        }
    }
}
