//! Transient feedback for the login control.

use std::fmt;

/// Progress state of the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusState::Idle => write!(f, "idle"),
            StatusState::Loading => write!(f, "loading"),
            StatusState::Success => write!(f, "success"),
            StatusState::Error => write!(f, "error"),
        }
    }
}

/// User-facing status: state plus message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    pub state: StatusState,
    pub message: String,
}

impl Status {
    pub fn idle(message: impl Into<String>) -> Self {
        Self::with(StatusState::Idle, message)
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self::with(StatusState::Loading, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with(StatusState::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with(StatusState::Error, message)
    }

    fn with(state: StatusState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == StatusState::Loading
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.state)
        } else {
            write!(f, "{}: {}", self.state, self.message)
        }
    }
}
