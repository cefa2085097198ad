//! Shared memory layout constants.
//!
//! Single source of truth for the sizes and names baked into every segment.
//! Mirrors the role `evo_common::shm::consts` plays for the EVO workspace,
//! scoped down to what one frame ring buffer needs.

use static_assertions::const_assert;

/// Number of slots in the ring. Fixed at compile time so every mapper of a
/// segment agrees on its layout without negotiation.
pub const RING_DEPTH: usize = 3;

const_assert!(RING_DEPTH >= 2);

/// CPU cache line size, used to keep the header and slot descriptors from
/// false-sharing with the hot pixel area.
pub const CACHE_LINE_SIZE: usize = 64;

/// Magic value stamped into every segment header at creation and checked on
/// attach, to reject a `name` that resolves to a file that isn't ours.
pub const SEGMENT_MAGIC: u64 = 0x4652_414d_4552_4e47; // "FRAMERNG" truncated to 8 bytes

/// Default RAM-backed directory segments are anchored under.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Anchor filename prefix: the file backing a segment named `name` is
/// `<prefix><name>` inside the anchor directory.
pub const ANCHOR_PREFIX: &str = "buffer-";

/// Suffix appended to the anchor filename during teardown, so a new `open`
/// can't resolve to a segment mid-destroy. Reserved: `create`/`open` refuse
/// any `name` ending in this suffix.
pub const ARCHIVE_SUFFIX: &str = ".archived";
