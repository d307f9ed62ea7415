//! Error taxonomy for the core.
//!
//! Capture failure, out-of-range keys and missing cross-view fingers are not
//! errors; they are ordinary outcomes handled where they occur.  Only
//! collaborator failures surface here, and every one of them ends the run.

/// Failures raised by collaborators while a session is running.
#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    /// The MIDI collaborator rejected a message.
    #[error("MIDI send failed: {0}")]
    Midi(String),

    /// The hand-landmark provider could not produce a result.
    #[error("hand detector failed: {0}")]
    Detector(String),

    /// The display could not present a frame.
    #[error("display error: {0}")]
    Display(String),

    /// A frame buffer does not match its declared dimensions.
    #[error("frame buffer is {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, KeysError>;
