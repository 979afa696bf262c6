//! Display utilities for the focusfield CLI.
//!
//! This module provides formatted output for:
//! - The live status line (title, status, cycle, progress bar)
//! - Timer event messages
//! - Saved duration settings
//! - Error messages

use std::io::{self, Write};
use std::path::Path;

use crate::timer::TimerEvent;
use crate::types::{DurationSettings, Mode, Status, TimerSnapshot};

/// Width of the progress bar in cells.
pub const PROGRESS_WIDTH: usize = 24;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Builds the single-line status display.
    pub fn status_line(snapshot: &TimerSnapshot, muted: bool) -> String {
        let mut line = format!(
            "{}  {}  #{}  [{}]",
            snapshot.title(),
            Self::status_label(snapshot.status),
            snapshot.cycle_count,
            Self::progress_bar(snapshot.fraction, PROGRESS_WIDTH),
        );
        if snapshot.just_completed {
            line.push_str("  ✓");
        } else if snapshot.is_stopped_after_start() {
            line.push_str("  ■");
        }
        if muted {
            line.push_str("  (ミュート)");
        }
        line
    }

    /// Redraws the status line in place.
    pub fn render(snapshot: &TimerSnapshot, muted: bool) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "\r\x1b[2K{}", Self::status_line(snapshot, muted))?;
        stdout.flush()
    }

    /// Renders a bar whose filled part is the remaining fraction.
    pub fn progress_bar(fraction: f64, width: usize) -> String {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let filled = (fraction * width as f64).round() as usize;
        format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
    }

    pub fn mode_label(mode: Mode) -> &'static str {
        match mode {
            Mode::Focus => "集中",
            Mode::Break => "休憩",
        }
    }

    pub fn status_label(status: Status) -> &'static str {
        match status {
            Status::Idle => "待機中",
            Status::Running => "実行中",
            Status::Paused => "一時停止中",
        }
    }

    /// Returns the message for a timer event.
    pub fn event_message(event: &TimerEvent) -> String {
        match event {
            TimerEvent::Started { mode, .. } => {
                format!("> {}を開始しました", Self::mode_label(*mode))
            }
            TimerEvent::Paused { .. } => "|| 一時停止しました".to_string(),
            TimerEvent::Skipped { mode } => {
                format!(">> {}に切り替えました", Self::mode_label(*mode))
            }
            TimerEvent::Reset { mode } => {
                format!("[] {}をリセットしました", Self::mode_label(*mode))
            }
            TimerEvent::TimeAdded { seconds, .. } => {
                format!("+ {}分追加しました", (seconds / 60.0).round())
            }
            TimerEvent::Completed {
                finished,
                next,
                cycle_count,
            } => format!(
                "* {}が終了しました。{}を開始します (サイクル #{})",
                Self::mode_label(*finished),
                Self::mode_label(*next),
                cycle_count
            ),
            TimerEvent::CueCaughtUp { .. } => {
                "* スリープ中に鳴らせなかったチャイムを再生しました".to_string()
            }
        }
    }

    /// Prints an event message above the status line.
    pub fn show_event(event: &TimerEvent) {
        println!("\r\x1b[2K{}", Self::event_message(event));
    }

    /// Shows the saved durations.
    pub fn show_config(settings: &DurationSettings, path: &Path) {
        println!("保存されている設定");
        println!("─────────────────────────────");
        println!("集中: {}分", settings.focus_minutes());
        println!("休憩: {}分", settings.break_minutes());
        println!("保存先: {}", path.display());
    }

    /// Shows the interactive command help.
    pub fn show_help() {
        println!("\r\x1b[2Kコマンド:");
        println!("  p       開始 / 一時停止");
        println!("  s       スキップ");
        println!("  r       リセット");
        println!("  +N      N分追加");
        println!("  f N     集中時間をN分に設定");
        println!("  b N     休憩時間をN分に設定");
        println!("  m       ミュート切り替え");
        println!("  q       終了");
    }

    /// Shows an informational message above the status line.
    pub fn show_info(message: &str) {
        println!("\r\x1b[2K{}", message);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }
}

// ============================================================================
// Tests
// ============================================================================
