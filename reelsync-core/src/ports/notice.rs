use std::time::Duration;

/// User-visible transient notices, shown as a toast or equivalent.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait NoticeSink: Send + Sync {
    fn show_notice(&self, text: &str, duration: Duration);
}
