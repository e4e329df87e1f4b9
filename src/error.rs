use std::path::PathBuf;

/// Failures raised by the list and table layers.
///
/// Table operations return `anyhow::Result`; when one of these is the cause
/// it can be recovered with `err.downcast_ref::<Error>()`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no matching element")]
    NotFound,

    /// The caller broke a documented precondition, e.g. asked for the
    /// distance to a node that does not precede the cursor, or used a
    /// position whose node has since been removed.
    #[error("precondition violated: {0}")]
    InvalidPrecondition(&'static str),

    #[error("cannot step past the {0} of the list")]
    OutOfRange(Bound),

    #[error("{path:?} is {len} bytes, not a multiple of the {record_width}-byte record width")]
    MalformedStorage {
        path: PathBuf,
        len: usize,
        record_width: usize,
    },

    #[error("failed to persist {path:?}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Front,
    End,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Front => write!(f, "front"),
            Bound::End => write!(f, "end"),
        }
    }
}
