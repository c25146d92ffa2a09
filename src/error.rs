use std::path::PathBuf;

/// Domain errors for the tagging batch.
///
/// Everything except [`Error::MissingLogFile`] and [`Error::MissingDirectory`]
/// is recoverable at file granularity: the offending record or frame is
/// logged and skipped, and the batch keeps going.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed shot log line {line}: {reason}")]
    MalformedLog { line: usize, reason: String },

    #[error("badly formatted coordinates: {0:?}")]
    CoordinateFormat(String),

    #[error("cannot derive a frame index from {0:?}")]
    UnindexableFilename(String),

    #[error("no exposure record for frame index {index} ({})", .path.display())]
    UnmatchedFrame { index: u32, path: PathBuf },

    #[error("{tool} (pid {pid:?}) exited with status {status:?}: {stderr}")]
    ExternalInvocation {
        tool: String,
        pid: Option<u32>,
        status: Option<i32>,
        stderr: String,
    },

    #[error("shot log not found: {}", .0.display())]
    MissingLogFile(PathBuf),

    #[error("negatives directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
