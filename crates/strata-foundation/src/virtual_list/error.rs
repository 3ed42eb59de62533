use super::chunk::ChunkId;
use super::surface::Sentinel;

/// Programmer errors raised by the chunk mutation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    UnknownChunk { id: ChunkId },
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::UnknownChunk { id } => write!(f, "chunk {id} is not part of the window"),
        }
    }
}

impl std::error::Error for StateError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualListError {
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    MissingSentinel {
        which: Sentinel,
    },
    State(StateError),
}

impl std::fmt::Display for VirtualListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VirtualListError::InvalidConfig { field, reason } => {
                write!(f, "invalid list config `{field}`: {reason}")
            }
            VirtualListError::MissingSentinel { which } => {
                write!(f, "{which} sentinel is not rendered")
            }
            VirtualListError::State(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for VirtualListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VirtualListError::State(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StateError> for VirtualListError {
    fn from(err: StateError) -> Self {
        VirtualListError::State(err)
    }
}
