use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::ports::NoticeSink;

/// Collects notices instead of showing them.
#[derive(Debug, Clone, Default)]
pub struct FakeNotices {
    shown: Arc<Mutex<Vec<String>>>,
}

impl FakeNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> Arc<dyn NoticeSink> {
        Arc::new(self.clone())
    }

    pub fn messages(&self) -> Vec<String> {
        self.shown.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.shown.lock().iter().any(|m| m.contains(needle))
    }
}

impl NoticeSink for FakeNotices {
    fn show_notice(&self, text: &str, _duration: Duration) {
        self.shown.lock().push(text.to_string());
    }
}
