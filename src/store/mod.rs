//! Duration store.
//!
//! Holds the user-configured focus and break lengths and persists them
//! through a [`KeyValueStore`] under fixed keys. Values are clamped to
//! `[1, 600]` minutes on every read and write.
//!
//! Input arrives as free-form text from the presentation layer. Text that
//! does not contain a number never becomes an error: the store keeps the
//! last valid value, or falls back to the documented default when reading.

mod error;
mod file;

use tracing::{debug, warn};

pub use error::StoreError;
pub use file::{JsonFileStore, MemoryStore};

use crate::types::{
    clamp_minutes, DurationSettings, Mode, DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES,
    MAX_MINUTES,
};

/// Persistence key for focus minutes.
pub const FOCUS_MINUTES_KEY: &str = "focusMinutes";

/// Persistence key for break minutes.
pub const BREAK_MINUTES_KEY: &str = "breakMinutes";

/// String key-value persistence.
pub trait KeyValueStore {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, persisting it immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Strips everything except ASCII digits.
pub fn only_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Normalizes minute text into the configurable range.
///
/// Non-digit characters are ignored. Empty or digit-free input yields
/// `fallback`; digit strings too large to parse clamp to the maximum.
pub fn normalize_minutes(raw: &str, fallback: u32) -> u32 {
    let digits = only_digits(raw);
    if digits.is_empty() {
        return clamp_minutes(fallback);
    }
    match digits.parse::<u64>() {
        Ok(n) => clamp_minutes(u32::try_from(n).unwrap_or(MAX_MINUTES)),
        Err(_) => MAX_MINUTES,
    }
}

fn key_for(mode: Mode) -> &'static str {
    match mode {
        Mode::Focus => FOCUS_MINUTES_KEY,
        Mode::Break => BREAK_MINUTES_KEY,
    }
}

fn default_for(mode: Mode) -> u32 {
    match mode {
        Mode::Focus => DEFAULT_FOCUS_MINUTES,
        Mode::Break => DEFAULT_BREAK_MINUTES,
    }
}

// ============================================================================
// DurationStore
// ============================================================================

/// Validated, persisted focus/break durations.
pub struct DurationStore {
    backend: Box<dyn KeyValueStore>,
    settings: DurationSettings,
}

impl DurationStore {
    /// Loads durations from the backend, falling back to defaults.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let focus = read_minutes(backend.as_ref(), Mode::Focus);
        let brk = read_minutes(backend.as_ref(), Mode::Break);
        let settings = DurationSettings::new(focus, brk);
        debug!(
            "Loaded durations: focus={}m break={}m",
            settings.focus_minutes(),
            settings.break_minutes()
        );

        Self { backend, settings }
    }

    /// Returns the current settings.
    pub fn settings(&self) -> DurationSettings {
        self.settings
    }

    /// Returns the configured minutes for a mode.
    pub fn minutes(&self, mode: Mode) -> u32 {
        self.settings.minutes_for(mode)
    }

    /// Applies a text edit for a mode and returns the resulting minutes.
    ///
    /// Empty or digit-free text keeps the last valid value. Anything else is
    /// normalized, stored and persisted.
    pub fn edit(&mut self, mode: Mode, raw: &str) -> u32 {
        let current = self.minutes(mode);
        if only_digits(raw).is_empty() {
            debug!("Ignoring {} duration edit without digits", mode.as_str());
            return current;
        }
        self.set_minutes(mode, normalize_minutes(raw, current))
    }

    /// Stores minutes for a mode (clamped) and persists the change.
    pub fn set_minutes(&mut self, mode: Mode, minutes: u32) -> u32 {
        let minutes = clamp_minutes(minutes);
        if minutes == self.minutes(mode) {
            return minutes;
        }

        self.settings = match mode {
            Mode::Focus => self.settings.with_focus_minutes(minutes),
            Mode::Break => self.settings.with_break_minutes(minutes),
        };

        if let Err(e) = self.backend.set(key_for(mode), &minutes.to_string()) {
            warn!("Failed to persist {} duration: {}", mode.as_str(), e);
        }
        minutes
    }
}

impl std::fmt::Debug for DurationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn read_minutes(backend: &dyn KeyValueStore, mode: Mode) -> u32 {
    let fallback = default_for(mode);
    match backend.get(key_for(mode)) {
        Ok(Some(saved)) => normalize_minutes(&saved, fallback),
        Ok(None) => fallback,
        Err(e) => {
            warn!("Failed to read {} duration, using default: {}", mode.as_str(), e);
            fallback
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
