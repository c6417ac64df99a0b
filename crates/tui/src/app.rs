use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};

use latency_core::logger;
use latency_core::settings::Settings;
use latency_core::types::{Command, OrchestratorState, RunRecord, TestKind};

use crate::ConfirmDialog;

/// Log lines received from the logger, viewed from the bottom.
#[derive(Default)]
pub struct LogPanel {
    pub visible: bool,
    lines: Vec<String>,
    scroll: usize, // lines scrolled up from the latest
}

impl LogPanel {
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_add(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    /// The lines that fit in `height` rows at the current scroll offset.
    pub fn window(&self, height: usize) -> &[String] {
        let total = self.lines.len();
        let scroll = self.scroll.min(total.saturating_sub(height));
        let end = total - scroll;
        &self.lines[end.saturating_sub(height)..end]
    }
}

pub struct App {
    pub records: Arc<Mutex<Vec<RunRecord>>>,
    pub orch_state: Arc<Mutex<OrchestratorState>>,
    pub selected: usize,
    pub log: LogPanel,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
    log_rx: mpsc::Receiver<String>,
    cmd_tx: mpsc::Sender<Command>,
    settings_path: PathBuf,
}

impl App {
    /// The selection starts on the test run last time, if settings remember one.
    pub fn new(
        records: Arc<Mutex<Vec<RunRecord>>>,
        orch_state: Arc<Mutex<OrchestratorState>>,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
        settings_path: PathBuf,
    ) -> Self {
        let selected = Settings::load(&settings_path)
            .last_test
            .and_then(|k| TestKind::ALL.iter().position(|t| *t == k))
            .unwrap_or(0);
        Self {
            records,
            orch_state,
            selected,
            log: LogPanel { visible: true, ..LogPanel::default() },
            confirm: None,
            should_quit: false,
            log_rx,
            cmd_tx,
            settings_path,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.log.push(line);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(TestKind::ALL.len() - 1);
    }

    pub fn selected_kind(&self) -> TestKind {
        TestKind::ALL[self.selected]
    }

    pub fn is_running(&self) -> bool {
        *self.orch_state.lock().unwrap() == OrchestratorState::Running
    }

    /// Most recent finished run of `kind`.
    pub fn last_record(&self, kind: TestKind) -> Option<RunRecord> {
        self.records.lock().unwrap().iter().rev().find(|r| r.kind == kind).cloned()
    }

    /// Ask the orchestrator to run the selected test and remember the choice.
    pub fn run_selected(&mut self) {
        if self.is_running() {
            logger::warn("a test is already running");
            return;
        }
        let kind = self.selected_kind();
        // Marked here so a second press before the orchestrator picks the
        // command up is refused.
        *self.orch_state.lock().unwrap() = OrchestratorState::Running;
        if self.cmd_tx.send(Command::Run(kind)).is_err() {
            logger::error("orchestrator is gone");
            *self.orch_state.lock().unwrap() = OrchestratorState::Idle;
            return;
        }

        let mut settings = Settings::load(&self.settings_path);
        settings.last_test = Some(kind);
        if let Err(e) = settings.save(&self.settings_path) {
            logger::warn(&format!("failed to save settings: {:#}", e));
        }
    }

    /// Quit, asking first while a test is running: a run cannot be
    /// interrupted, only abandoned.
    pub fn request_quit(&mut self) {
        if self.is_running() {
            self.confirm = Some(ConfirmDialog::new("A test is running. Quit anyway?"));
        } else {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        self.cmd_tx.send(Command::Quit).ok();
        self.should_quit = true;
    }
}
