/// Progress of the self-update cycle for the running copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateSessionState {
    #[default]
    None,
    Downloading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    CheckStarted,
    DownloadStarted,
    Installed,
    Failed,
}

impl UpdateSessionState {
    /// Next state after `event`. Out-of-order events leave the state as is.
    #[must_use]
    pub fn transition(self, event: UpdateEvent) -> Self {
        match (self, event) {
            (_, UpdateEvent::CheckStarted | UpdateEvent::Failed) => Self::None,
            (Self::None, UpdateEvent::DownloadStarted) => Self::Downloading,
            (Self::Downloading, UpdateEvent::Installed) => Self::Ready,
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{UpdateEvent, UpdateSessionState};

    #[test]
    fn happy_path_is_none_downloading_ready() {
        let state = UpdateSessionState::default()
            .transition(UpdateEvent::CheckStarted)
            .transition(UpdateEvent::DownloadStarted);
        assert_eq!(state, UpdateSessionState::Downloading);
        assert_eq!(
            state.transition(UpdateEvent::Installed),
            UpdateSessionState::Ready
        );
    }

    #[test]
    fn failure_resets_from_any_state() {
        for state in [
            UpdateSessionState::None,
            UpdateSessionState::Downloading,
            UpdateSessionState::Ready,
        ] {
            assert_eq!(
                state.transition(UpdateEvent::Failed),
                UpdateSessionState::None
            );
        }
    }

    #[test]
    fn states_are_not_skipped() {
        assert_eq!(
            UpdateSessionState::None.transition(UpdateEvent::Installed),
            UpdateSessionState::None
        );
        assert_eq!(
            UpdateSessionState::Ready.transition(UpdateEvent::DownloadStarted),
            UpdateSessionState::Ready
        );
    }
}
