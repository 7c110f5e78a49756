//! Exponential backoff between session recovery attempts.

use crate::config::ContainerSettings;
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    multiplier: u32,
    next: Duration,
    attempts: u32,
}

impl ReconnectBackoff {
    pub(crate) fn new(initial: Duration, max: Duration, multiplier: u32) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            multiplier: multiplier.max(1),
            next: initial,
            attempts: 0,
        }
    }

    pub(crate) fn from_settings(settings: &ContainerSettings) -> Self {
        Self::new(
            settings.recovery_initial_interval(),
            settings.recovery_max_interval(),
            settings.recovery_multiplier,
        )
    }

    /// Delay before the next attempt; grows until it reaches the ceiling.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.attempts = self.attempts.saturating_add(1);
        self.next = self
            .next
            .checked_mul(self.multiplier)
            .map_or(self.max, |grown| grown.min(self.max));
        delay
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn reset(&mut self) {
        self.next = self.initial;
        self.attempts = 0;
    }
}
