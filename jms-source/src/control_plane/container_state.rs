//! Container lifecycle states and allowed transitions.

use std::fmt::{Display, Formatter};

/// `Created → Configured → Running → Stopping → Stopped`, with restart from `Stopped`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContainerState {
    Created,
    Configured,
    Running,
    Stopping,
    Stopped,
}

impl ContainerState {
    pub(crate) fn can_configure(self) -> bool {
        matches!(self, ContainerState::Created | ContainerState::Configured)
    }

    pub(crate) fn can_start(self) -> bool {
        matches!(self, ContainerState::Configured | ContainerState::Stopped)
    }

    pub(crate) fn can_register_listener(self) -> bool {
        !matches!(self, ContainerState::Running | ContainerState::Stopping)
    }
}

impl Display for ContainerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ContainerState::Created => "Created",
            ContainerState::Configured => "Configured",
            ContainerState::Running => "Running",
            ContainerState::Stopping => "Stopping",
            ContainerState::Stopped => "Stopped",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::ContainerState;

    #[test]
    fn configure_is_only_allowed_before_first_start() {
        assert!(ContainerState::Created.can_configure());
        assert!(ContainerState::Configured.can_configure());
        assert!(!ContainerState::Running.can_configure());
        assert!(!ContainerState::Stopping.can_configure());
        assert!(!ContainerState::Stopped.can_configure());
    }

    #[test]
    fn start_requires_configuration_or_restart() {
        assert!(!ContainerState::Created.can_start());
        assert!(ContainerState::Configured.can_start());
        assert!(!ContainerState::Running.can_start());
        assert!(ContainerState::Stopped.can_start());
    }
}
