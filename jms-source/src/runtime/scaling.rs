//! Consumer-count scaling rules evaluated by the consumer supervisor.
//!
//! A container grows by one consumer when a delivery arrives while no other consumer is
//! waiting for work (sustained backlog), and retires a surplus consumer once it has come
//! back empty-handed `idle_limit` times in a row. The count always stays within
//! `floor..=ceiling`; with `floor == ceiling` the count is fixed.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ScalingDecision {
    Hold,
    ScaleUp,
    Retire,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ScalingPolicy {
    floor: usize,
    ceiling: usize,
    idle_limit: u32,
}

impl ScalingPolicy {
    pub(crate) fn new(floor: u32, ceiling: u32, idle_limit: u32) -> Self {
        let floor = floor as usize;
        Self {
            floor,
            ceiling: (ceiling as usize).max(floor),
            idle_limit: idle_limit.max(1),
        }
    }

    pub(crate) fn floor(&self) -> usize {
        self.floor
    }

    pub(crate) fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub(crate) fn is_elastic(&self) -> bool {
        self.ceiling > self.floor
    }

    /// `waiting` counts consumers that are not currently known to be busy.
    pub(crate) fn after_delivery(&self, active: usize, waiting: usize) -> ScalingDecision {
        if waiting == 0 && active < self.ceiling {
            ScalingDecision::ScaleUp
        } else {
            ScalingDecision::Hold
        }
    }

    pub(crate) fn after_idle(&self, active: usize, consecutive_idle: u32) -> ScalingDecision {
        if consecutive_idle >= self.idle_limit && active > self.floor {
            ScalingDecision::Retire
        } else {
            ScalingDecision::Hold
        }
    }
}
