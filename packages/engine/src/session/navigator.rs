use std::sync::Mutex;

use tracing::info;

/// Moves the respondent's browser to another page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Navigator that remembers every requested URL instead of leaving the page.
///
/// Used by headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        info!(url, "Navigating away from survey");
        self.visited.lock().unwrap().push(url.to_string());
    }
}
