//! Application state management for the Study Helper GUI.

use std::sync::{Arc, Mutex};

use studyhelper_core::client::ApiClient;
use studyhelper_core::config::{DEFAULT_API_BASE_URL, FileConfig};
use tracing::warn;

/// Domain state shared by every view: the loaded configuration and the one
/// API client derived from it.
pub struct AppState {
    pub config: FileConfig,
    pub client: ApiClient,
}

impl AppState {
    pub fn new() -> Self {
        let load = studyhelper_core::load_config();
        for warning in &load.warnings {
            warn!("{warning}");
        }

        // Sanitize has already vetted the URL, so this only trips when the
        // defaults themselves are broken.
        let client = ApiClient::new(&load.config.backend.api_base_url).unwrap_or_else(|err| {
            warn!(error = %err, "Configured base URL rejected; using the default");
            ApiClient::new(DEFAULT_API_BASE_URL).expect("default base URL is valid")
        });

        Self {
            config: load.config,
            client,
        }
    }

    /// Save configuration to disk.
    pub fn save_config(&self) -> Result<(), String> {
        studyhelper_core::save_config(&self.config).map_err(|e| e.to_string())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// The minimal per-request state machine every view runs:
/// Idle → Loading on submit, Loading → Ready/Failed on response, and back to
/// Idle implicitly on the next interaction.
#[derive(Debug, Clone)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Idle
    }
}

impl<T> From<Result<T, String>> for ViewState<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => ViewState::Ready(value),
            Err(message) => ViewState::Failed(message),
        }
    }
}

/// One-shot result mailbox shared between a background task and the view
/// that spawned it. The view polls with `take` on render; a resolution that
/// arrives while the view is not displayed just waits in the slot.
pub struct ResponseSlot<T>(Arc<Mutex<Option<Result<T, String>>>>);

impl<T> ResponseSlot<T> {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn post(&self, result: Result<T, String>) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = Some(result);
        }
    }

    pub fn take(&self) -> Option<Result<T, String>> {
        self.0.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl<T> Clone for ResponseSlot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for ResponseSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_state_transitions() {
        let mut state: ViewState<u32> = ViewState::Idle;
        assert!(!state.is_loading());

        state = ViewState::Loading;
        assert!(state.is_loading());

        state = ViewState::from(Ok(5));
        assert_eq!(state.ready(), Some(&5));
        assert!(state.error().is_none());

        state = ViewState::from(Err::<u32, _>("boom".to_string()));
        assert_eq!(state.error(), Some("boom"));
        assert!(state.ready().is_none());
    }

    #[test]
    fn slot_is_one_shot() {
        let slot: ResponseSlot<u32> = ResponseSlot::new();
        assert!(slot.take().is_none());

        let writer = slot.clone();
        writer.post(Ok(7));
        assert!(matches!(slot.take(), Some(Ok(7))));
        assert!(slot.take().is_none(), "take drains the slot");
    }
}
