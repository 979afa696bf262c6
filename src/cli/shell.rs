//! Interactive terminal shell.
//!
//! Runs the timer in the foreground. One `tokio::select!` loop multiplexes
//! the evaluation triggers and user input:
//!
//! - a frame interval that redraws the status line
//! - a coarse background interval that also detects host suspension
//! - command lines read from stdin
//! - `SIGUSR1` as an explicit resume signal (for sleep hooks)
//! - Ctrl-C

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::controller::{Intent, TimerController};
use crate::sound::RodioAudioEngine;
use crate::store::{DurationStore, JsonFileStore};
use crate::types::{Mode, RuntimeConfig};

use super::commands::RunArgs;
use super::display::Display;

// ============================================================================
// Shell commands
// ============================================================================

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Dispatch(Intent),
    /// Duration edit with the raw text as typed
    SetDuration(Mode, String),
    ToggleMute,
    Help,
    Quit,
}

/// Parses one input line. Returns `None` for unknown commands.
///
/// An empty line toggles play/pause.
pub fn parse_command(line: &str) -> Option<ShellCommand> {
    let line = line.trim();

    if let Some(amount) = line.strip_prefix('+') {
        let minutes = match amount.trim() {
            "" => 1.0,
            text => text.parse::<f64>().ok()?,
        };
        return Some(ShellCommand::Dispatch(Intent::AddTime(minutes * 60.0)));
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let command = match (head, rest.is_empty()) {
        ("" | "p" | "play" | "pause", true) => ShellCommand::Dispatch(Intent::PlayPause),
        ("s" | "skip", true) => ShellCommand::Dispatch(Intent::Skip),
        ("r" | "reset", true) => ShellCommand::Dispatch(Intent::Reset),
        ("m" | "mute", true) => ShellCommand::ToggleMute,
        ("h" | "help" | "?", true) => ShellCommand::Help,
        ("q" | "quit" | "exit", true) => ShellCommand::Quit,
        ("f" | "focus", false) => ShellCommand::SetDuration(Mode::Focus, rest.to_string()),
        ("b" | "break", false) => ShellCommand::SetDuration(Mode::Break, rest.to_string()),
        _ => return None,
    };
    Some(command)
}

// ============================================================================
// Shell
// ============================================================================

/// Opens the settings file at `path`, or the default location.
pub fn open_store(path: Option<PathBuf>) -> Result<JsonFileStore> {
    let path = match path {
        Some(path) => path,
        None => JsonFileStore::default_path().context("設定ファイルの場所を特定できません")?,
    };
    Ok(JsonFileStore::open_or_empty(path))
}

/// Runs the interactive timer until quit, Ctrl-C or end of input.
pub async fn run(args: RunArgs) -> Result<()> {
    let backend = open_store(args.store.clone())?;
    info!("Settings file: {}", backend.path().display());

    let mut store = DurationStore::load(Box::new(backend));
    if let Some(minutes) = args.focus {
        store.set_minutes(Mode::Focus, minutes);
    }
    if let Some(minutes) = args.break_minutes {
        store.set_minutes(Mode::Break, minutes);
    }

    let config = RuntimeConfig::default();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Arc::new(RodioAudioEngine::new(args.mute));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut controller = TimerController::new(store, clock, engine, config).with_events(event_tx);

    let mut frames = interval(config.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut background = interval(config.background_interval);
    background.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut resume_signal = ResumeSignal::new()?;

    Display::show_help();

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let snapshot = controller.frame();
                Display::render(&snapshot, controller.is_muted())?;
            }
            _ = background.tick() => {
                controller.background_tick(std::time::Instant::now()).await;
            }
            Some(event) = event_rx.recv() => {
                Display::show_event(&event);
            }
            line = lines.next_line() => {
                let Some(line) = line.context("標準入力の読み込みに失敗しました")? else {
                    debug!("stdin closed");
                    break;
                };
                if !handle_line(&mut controller, &line).await {
                    break;
                }
            }
            _ = resume_signal.recv() => {
                info!("Resume signal received");
                controller.resume().await;
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    println!();
    Ok(())
}

/// Applies one command line. Returns false when the shell should exit.
async fn handle_line(controller: &mut TimerController<RodioAudioEngine>, line: &str) -> bool {
    match parse_command(line) {
        Some(ShellCommand::Dispatch(intent)) => {
            if !controller.dispatch(intent).await {
                Display::show_info("この操作は現在の状態では実行できません");
            }
        }
        Some(ShellCommand::SetDuration(mode, text)) => {
            let minutes = controller.edit_duration(mode, &text);
            Display::show_info(&format!("{}: {}分", Display::mode_label(mode), minutes));
        }
        Some(ShellCommand::ToggleMute) => {
            let muted = controller.toggle_muted();
            Display::show_info(if muted { "ミュートしました" } else { "ミュートを解除しました" });
        }
        Some(ShellCommand::Help) => Display::show_help(),
        Some(ShellCommand::Quit) => return false,
        None => Display::show_info(&format!("不明なコマンドです: {} (h でヘルプ)", line.trim())),
    }
    true
}

/// Explicit resume notification, delivered as `SIGUSR1` on unix.
struct ResumeSignal {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

impl ResumeSignal {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        let inner = signal(SignalKind::user_defined1()).context("シグナルの登録に失敗しました")?;
        Ok(Self { inner })
    }

    #[cfg(not(unix))]
    fn new() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> Option<()> {
        self.inner.recv().await
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

// ============================================================================
// Tests
// ============================================================================
