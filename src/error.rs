//! Error types for shared memory ring buffer operations

use thiserror::Error;

/// Errors that can occur during shared memory ring buffer operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// `create` was called for a segment whose anchor file already exists
    #[error("segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// `open` (or a by-name query) couldn't find a live anchor file
    #[error("segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// `name` contained the path separator, or ended in the reserved
    /// archive suffix
    #[error("invalid segment name: {name}")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// A mapped segment's header didn't carry the expected magic number
    #[error("segment header corrupt or foreign: {name}")]
    InvalidHeader {
        /// Segment name
        name: String,
    },

    /// `publish` was called with dimensions that don't match the segment
    #[error(
        "frame size mismatch: segment is {expected_w}x{expected_h}x{expected_d}, got {actual_w}x{actual_h}x{actual_d}"
    )]
    FrameSizeMismatch {
        /// Segment width
        expected_w: u32,
        /// Segment height
        expected_h: u32,
        /// Segment depth
        expected_d: u32,
        /// Width the caller supplied
        actual_w: u32,
        /// Height the caller supplied
        actual_h: u32,
        /// Depth the caller supplied
        actual_d: u32,
    },

    /// `publish` was called with dimensions that match the segment but a
    /// `pixels` slice whose length doesn't agree with `width*height*depth`
    #[error("pixel buffer size mismatch: expected {expected_bytes} bytes, got {actual_bytes}")]
    PixelBufferSizeMismatch {
        /// `width*height*depth` for the segment
        expected_bytes: usize,
        /// `pixels.len()` the caller supplied
        actual_bytes: usize,
    },

    /// `publish` or `read` observed `is_alive == false`
    #[error("segment is not active: {name}")]
    BlockNotActive {
        /// Segment name
        name: String,
    },

    /// A non-blocking `read` found no frame newer than the caller's last
    /// seen `frame_uid`
    #[error("no new frame available")]
    NoNewFrame,

    /// `close` was called by the owner, or `destroy` by a non-owner on a
    /// segment that isn't poisoned
    #[error("refused: {reason}")]
    NotPermitted {
        /// Human-readable reason for the refusal
        reason: String,
    },

    /// Underlying OS call failed (open/ftruncate/mmap/rename/...)
    #[error("io error: {source}")]
    Io {
        /// Underlying IO error
        #[from]
        source: std::io::Error,
    },

    /// A `nix`-wrapped system call failed (kill, mmap flags, ...)
    #[error("system call error: {source}")]
    Nix {
        /// Underlying nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for shared memory ring buffer operations
pub type ShmResult<T> = Result<T, ShmError>;
