//! UI-specific state (ephemeral)

use std::collections::VecDeque;

use studyhelper_core::config::ThemePreference;

const MAX_LOG_ENTRIES: usize = 200;

/// UI-specific state that doesn't need to be persisted
pub struct UiState {
    /// Current theme (dark/light)
    pub theme: Theme,

    /// Technical log visibility
    pub technical_log_expanded: bool,

    /// Technical log entries (bounded ring)
    pub technical_log: VecDeque<LogEntry>,
}

impl UiState {
    pub fn new(preference: ThemePreference) -> Self {
        Self {
            theme: Theme::from(preference),
            technical_log_expanded: false,
            technical_log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }

    /// Add a log entry, dropping the oldest past the cap.
    pub fn add_log_entry(&mut self, entry: LogEntry) {
        if self.technical_log.len() >= MAX_LOG_ENTRIES {
            self.technical_log.pop_front();
        }
        self.technical_log.push_back(entry);
    }
}

/// Theme selection
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl From<ThemePreference> for Theme {
    fn from(preference: ThemePreference) -> Self {
        match preference {
            ThemePreference::Dark => Theme::Dark,
            ThemePreference::Light => Theme::Light,
        }
    }
}

impl From<Theme> for ThemePreference {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Dark => ThemePreference::Dark,
            Theme::Light => ThemePreference::Light,
        }
    }
}

/// Technical log entry
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// Log level for coloring
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}
