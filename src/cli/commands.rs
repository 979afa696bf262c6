//! Command definitions for the focusfield CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::{MAX_MINUTES, MIN_MINUTES};

// ============================================================================
// CLI Structure
// ============================================================================

/// focusfield - focus / break interval timer with audible cues
#[derive(Parser, Debug)]
#[command(
    name = "focusfield",
    version,
    about = "集中と休憩を交互に繰り返すインターバルタイマー",
    long_about = "ターミナル上で動作する集中/休憩タイマー。\n\
                  終了5秒前のカウントダウンと切り替え時のチャイムを再生し、\n\
                  スリープ復帰後も取りこぼしたチャイムを一度だけ鳴らします。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the interactive timer
    Run(RunArgs),

    /// Show or edit the saved durations
    Config(ConfigArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Run Command Arguments
// ============================================================================

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Focus duration in minutes (1-600), saved for later sessions
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(i64::from(MIN_MINUTES)..=i64::from(MAX_MINUTES))
    )]
    pub focus: Option<u32>,

    /// Break duration in minutes (1-600), saved for later sessions
    #[arg(
        short,
        long = "break",
        value_parser = clap::value_parser!(u32).range(i64::from(MIN_MINUTES)..=i64::from(MAX_MINUTES))
    )]
    pub break_minutes: Option<u32>,

    /// Start with sound muted
    #[arg(short, long)]
    pub mute: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,
}

// ============================================================================
// Config Command Arguments
// ============================================================================

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// New focus duration; non-digits are ignored and the value is clamped to 1-600
    #[arg(short, long, value_name = "MINUTES")]
    pub focus: Option<String>,

    /// New break duration; non-digits are ignored and the value is clamped to 1-600
    #[arg(short, long = "break", value_name = "MINUTES")]
    pub break_minutes: Option<String>,

    /// Print the settings as JSON
    #[arg(long)]
    pub json: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================
