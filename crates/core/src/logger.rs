use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

// Color indices for TUI rendering (mapped in the tui crate)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

struct Logger {
    file: File,
    path: PathBuf,
    tui_tx: Option<mpsc::Sender<String>>,
    colors: HashMap<String, u8>,
    verbose: bool,
}

impl Logger {
    fn emit(&mut self, level: Level, prefix: &str, msg: &str) {
        if level == Level::Debug && !self.verbose {
            return;
        }
        let now = Local::now();
        writeln!(self.file, "{}", file_line(&now.format("%H:%M:%S%.3f").to_string(), level, prefix, msg)).ok();

        // The per-sample trace is far too chatty for the log panel.
        if level == Level::Debug {
            return;
        }
        if let Some(tx) = &self.tui_tx {
            let color = self.colors.get(prefix).copied().unwrap_or(0);
            let line = tui_line(level, prefix, color, &now.format("%H:%M:%S").to_string(), msg);
            if tx.send(line).is_err() {
                // Receiver gone: the TUI has shut down.
                self.tui_tx = None;
            }
        }
    }
}

/// Open `app.log` in `log_dir`, truncating it. `verbose` enables the file-only
/// trace written by [`debug_p`]. Until this is called every log call is a no-op.
pub fn init(log_dir: &Path, verbose: bool) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    LOGGER
        .set(Mutex::new(Logger { file, path, tui_tx: None, colors: HashMap::new(), verbose }))
        .ok();
    Ok(())
}

/// Where the log file lives, once initialised.
pub fn log_path() -> Option<PathBuf> {
    LOGGER.get().map(|l| l.lock().unwrap().path.clone())
}

/// Mirror every non-debug line to the TUI log panel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().unwrap().tui_tx = Some(tx);
    }
}

/// Give a prefix its TUI color.
pub fn register_prefix(prefix: &str, color: u8) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().unwrap().colors.insert(prefix.to_string(), color);
    }
}

fn file_line(ts: &str, level: Level, prefix: &str, msg: &str) -> String {
    if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level.as_str(), msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level.as_str(), prefix, msg)
    }
}

/// TUI lines are `level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage`.
fn tui_line(level: Level, prefix: &str, color: u8, ts: &str, msg: &str) -> String {
    format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level.as_str(), prefix, color, ts, msg)
}

pub fn log(level: Level, prefix: &str, msg: &str) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().unwrap().emit(level, prefix, msg);
    }
}

pub fn info(msg: &str) {
    log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    log(Level::Error, "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    log(Level::Warn, prefix, msg);
}

/// File-only trace, dropped unless the logger was initialised verbose.
pub fn debug_p(prefix: &str, msg: &str) {
    log(Level::Debug, prefix, msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_line_omits_empty_prefix() {
        assert_eq!(file_line("12:00:00.000", Level::Info, "", "hi"), "[12:00:00.000] [INFO] hi");
        assert_eq!(
            file_line("12:00:00.000", Level::Warn, "engine", "moved"),
            "[12:00:00.000] [WARN] [engine] moved"
        );
    }

    #[test]
    fn tui_line_has_five_fields() {
        let line = tui_line(Level::Error, "sim", COLOR_GRAY, "12:00:00", "a\x1fb");
        let parts: Vec<&str> = line.splitn(5, '\x1f').collect();
        assert_eq!(parts, ["ERROR", "sim", "1", "12:00:00", "a\x1fb"]);
    }

    #[test]
    fn logging_before_init_is_a_noop() {
        // Tests never initialise the global logger.
        info("nothing");
        debug_p("engine", "nothing");
        assert!(log_path().is_none());
    }
}
