use crate::session::{SessionId, Status};

/// An event to track the lifecycle of the sessions of a registry.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The session is running through `total` candidates.
    Started { id: SessionId, total: u64 },
    /// The session reached a terminal status.
    Finished { id: SessionId, status: Status },
}

impl Event {
    /// Returns the id of the session concerned by the event.
    pub fn id(&self) -> SessionId {
        match self {
            Self::Started { id, .. } | Self::Finished { id, .. } => *id,
        }
    }
}
