use std::{io, path::PathBuf};

use thiserror::Error;

use crate::session::SessionId;

pub type AuditResult<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("The session {0} was already started")]
    AlreadyStarted(SessionId),

    #[error("Candidates longer than {0} characters are not supported")]
    CandidateLength(usize),

    #[error("The mask expands to an empty charset")]
    EmptyCharset,

    #[error("The target digest is not valid hexadecimal")]
    InvalidDigest,

    #[error("The word source became unreadable during the attack")]
    Io(#[from] io::Error),

    #[error("The minimum length ({min}) is greater than the maximum length ({max})")]
    LengthRange { min: usize, max: usize },

    #[error("The session {0} is still active and cannot be removed")]
    SessionActive(SessionId),

    #[error("No session has the id {0}")]
    SessionNotFound(SessionId),

    #[error("Only search spaces up to 2^64 candidates are supported, but the provided space is at least 2^{0}")]
    Space(u8),

    #[error("Too many active sessions, the limit is {0}")]
    TooManySessions(usize),

    #[error("Unknown hash algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("Unknown attack method `{0}`, expected one of dict, rule, brute or mask")]
    UnknownMethod(String),

    #[error("Unable to read the word source at {}", path.display())]
    WordSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AuditError {
    /// Returns true if the error comes from the attack configuration,
    /// meaning that the session could never have reached the running state.
    pub fn is_config(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::WordSource { .. })
    }
}
