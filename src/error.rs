// Error taxonomy for seekable inputs and media opening.

use std::fmt;
use std::io;

use thiserror::Error;

/// Failure of an operation on a `SeekableInput` or `MediaData`.
#[derive(Debug, Error)]
pub enum InputError {
    /// Caller passed an invalid position, offset or length.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The input (or its media) has been closed.
    #[error("input is closed")]
    Closed,

    /// Another input created by the same media is still open.
    #[error("media already has an open input")]
    Busy,

    /// A suspending operation was interrupted by close or context cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// End of stream reached before the requested number of bytes.
    #[error("unexpected end of stream: read {read} of {requested} bytes")]
    UnexpectedEof { read: u64, requested: u64 },

    /// Underlying transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, InputError>;

impl InputError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        InputError::InvalidArgument(message.into())
    }

    /// Wrap a transport error from the download engine.
    pub(crate) fn transport(err: anyhow::Error) -> Self {
        InputError::Io(io::Error::other(err.to_string()))
    }
}

impl From<InputError> for io::Error {
    fn from(e: InputError) -> Self {
        match e {
            InputError::Io(inner) => inner,
            InputError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            InputError::UnexpectedEof { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string())
            }
            InputError::Closed | InputError::Busy => {
                io::Error::new(io::ErrorKind::BrokenPipe, e.to_string())
            }
            InputError::Cancelled => io::Error::new(io::ErrorKind::Interrupted, e.to_string()),
        }
    }
}

/// Why a media resource could not be turned into a playable input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenFailure {
    /// No resource matches the requested media.
    NoMatchingFile,
    /// The resource type is incompatible with the active engine.
    UnsupportedVideoSource,
    /// The engine was disabled after the source was resolved.
    EngineDisabled,
}

impl OpenFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenFailure::NoMatchingFile => "NO_MATCHING_FILE",
            OpenFailure::UnsupportedVideoSource => "UNSUPPORTED_VIDEO_SOURCE",
            OpenFailure::EngineDisabled => "ENGINE_DISABLED",
        }
    }
}

impl fmt::Display for OpenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raised by the acquisition step when a media source cannot be opened.
#[derive(Debug, Error)]
#[error("{reason}: {}", .message.as_deref().unwrap_or("media source could not be opened"))]
pub struct MediaSourceOpenError {
    pub reason: OpenFailure,
    pub message: Option<String>,
    #[source]
    pub cause: Option<BoxError>,
}

impl MediaSourceOpenError {
    pub fn new(reason: OpenFailure) -> Self {
        Self {
            reason,
            message: None,
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn open_error_display_includes_reason_and_message() {
        let err = MediaSourceOpenError::new(OpenFailure::UnsupportedVideoSource)
            .with_message("range requests not supported");
        assert_eq!(
            err.to_string(),
            "UNSUPPORTED_VIDEO_SOURCE: range requests not supported"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn open_error_chains_cause() {
        let cause = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = MediaSourceOpenError::new(OpenFailure::NoMatchingFile).with_cause(cause);
        assert_eq!(
            err.to_string(),
            "NO_MATCHING_FILE: media source could not be opened"
        );
        assert_eq!(err.source().map(|s| s.to_string()), Some("gone".to_string()));
    }

    #[test]
    fn input_error_maps_to_io_kind() {
        let e: io::Error = InputError::UnexpectedEof {
            read: 3,
            requested: 8,
        }
        .into();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);

        let e: io::Error = InputError::invalid("bad").into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
    }
}
