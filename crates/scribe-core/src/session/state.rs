use std::fmt;

/// Lifecycle of a note editing session.
///
/// `Loading -> Ready -> Saving -> Saved | SaveFailed` and
/// `Ready -> Deleting -> Deleted | DeleteFailed`. The failed states accept
/// edits and another attempt; `Saved` and `Deleted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready,
    Saving,
    Saved,
    SaveFailed,
    Deleting,
    Deleted,
    DeleteFailed,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::SaveFailed => "save failed",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::DeleteFailed => "delete failed",
        }
    }

    /// Whether the draft may be edited, saved or deleted from this state.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Ready | Self::SaveFailed | Self::DeleteFailed)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Saved | Self::Deleted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_states_stay_editable() {
        assert!(SessionState::SaveFailed.is_editable());
        assert!(SessionState::DeleteFailed.is_editable());
        assert!(!SessionState::Saving.is_editable());
        assert!(!SessionState::Loading.is_editable());
    }

    #[test]
    fn saved_and_deleted_are_terminal() {
        assert!(SessionState::Saved.is_terminal());
        assert!(SessionState::Deleted.is_terminal());
        assert!(!SessionState::Saved.is_editable());
        assert!(!SessionState::DeleteFailed.is_terminal());
        assert_eq!(SessionState::SaveFailed.to_string(), "save failed");
    }
}
