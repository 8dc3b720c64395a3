//! Tunables for the timing-sensitive combinators and diagnostics.
//!
//! There is no configuration file or environment lookup; every knob is a
//! plain struct with a `Default` that callers override field by field.

use std::time::Duration;

/// Grace period `is_sync` waits for a late fire before concluding.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(100);

/// Quiet period used by [`SettleConfig::default`].
pub const DEFAULT_QUIET: Duration = Duration::from_millis(10);

/// Settings for `settle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleConfig {
    /// How long upstream must stay silent before the latest value is delivered.
    pub quiet: Duration,

    /// Also deliver the very first arrival immediately.
    pub leading: bool,
}

impl SettleConfig {
    /// A config with the given quiet period and no leading delivery.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            leading: false,
        }
    }

    /// Set the quiet period.
    pub fn with_quiet(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }

    /// Enable or disable immediate delivery of the first arrival.
    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET)
    }
}
