/// Default lifetime of a notification banner.
pub const DEFAULT_NOTIFICATION_MS: u64 = 10_000;

/// A single timed, dismissible banner.
///
/// Time only moves through [`Notification::advance`], so the owner decides
/// what a clock is. Showing a new message while one is visible restarts the
/// timer with the new message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Notification {
    message: String,
    duration_ms: u64,
    elapsed_ms: u64,
    visible: bool,
}

impl Notification {
    pub fn show(&mut self, message: impl Into<String>, duration_ms: u64) {
        self.message = message.into();
        self.duration_ms = duration_ms;
        self.elapsed_ms = 0;
        self.visible = duration_ms > 0;
    }

    /// Advances the timer; returns true while the banner was visible before the call.
    pub fn advance(&mut self, elapsed_ms: u64) -> bool {
        if !self.visible {
            return false;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
        if self.elapsed_ms >= self.duration_ms {
            self.visible = false;
        }
        true
    }

    pub fn dismiss(&mut self) -> bool {
        let was_visible = self.visible;
        self.visible = false;
        was_visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn message(&self) -> Option<&str> {
        self.visible.then_some(self.message.as_str())
    }

    /// Remaining lifetime in percent, decaying linearly from 100 to 0.
    pub fn progress_percent(&self) -> f64 {
        if !self.visible || self.duration_ms == 0 {
            return 0.0;
        }
        let remaining = self.duration_ms.saturating_sub(self.elapsed_ms);
        remaining as f64 * 100.0 / self.duration_ms as f64
    }
}
