//! Shared memory segment layout: header, slot descriptors, and the flat
//! pixel area, laid out as one contiguous mmap-backed region.

use crate::consts::{CACHE_LINE_SIZE, RING_DEPTH, SEGMENT_MAGIC};
use crate::error::{ShmError, ShmResult};
use crate::sync::{RawCondvar, RawMutex, RawRwLock};
use memmap2::MmapMut;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};

/// Fixed-size segment header: scalar fields, owner tracking, and the master
/// mutex/condvar pair readers block on. Cache-line aligned so the
/// frequently-touched atomics don't false-share with the first slot
/// descriptor.
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Validates that a mapped file is actually one of ours.
    pub magic: u64,
    /// Immutable after creation (Invariant 1).
    pub width: u32,
    /// Immutable after creation (Invariant 1).
    pub height: u32,
    /// Immutable after creation (Invariant 1).
    pub depth: u32,
    _pad0: u32,
    /// PID of the single owning process. Immutable after creation.
    pub owner_pid: AtomicU32,
    /// Set true at creation, false exactly once by `destroy` (Invariant 5).
    pub is_alive: AtomicBool,
    _pad1: [u8; 3],
    /// Monotonic publish counter (Invariant 2).
    pub frame_cnt: AtomicU64,
    /// Taken only to guard the wait/wake protocol in §4.4, never across
    /// pixel I/O.
    pub master_mutex: RawMutex,
    /// Broadcast by `publish` (step 7) and by `destroy` (step 4).
    pub master_cond: RawCondvar,
    _pad2: [u8; CACHE_LINE_SIZE],
}

impl SegmentHeader {
    /// Zero-initialize then stamp the scalar fields and initialize the
    /// process-shared primitives. Must run exactly once, by the creator,
    /// before the anchor file is made visible to other processes under its
    /// final name.
    ///
    /// # Safety
    /// `header` must point at zeroed, exclusively-owned memory of at least
    /// `size_of::<SegmentHeader>()` bytes.
    pub unsafe fn init(header: *mut SegmentHeader, width: u32, height: u32, depth: u32, owner_pid: u32) {
        unsafe {
            (*header).magic = SEGMENT_MAGIC;
            (*header).width = width;
            (*header).height = height;
            (*header).depth = depth;
            (*header).owner_pid = AtomicU32::new(owner_pid);
            (*header).is_alive = AtomicBool::new(true);
            (*header).frame_cnt = AtomicU64::new(0);
            (*header)
                .master_mutex
                .init()
                .expect("pthread_mutex_init on fresh shared memory cannot fail");
            (*header)
                .master_cond
                .init()
                .expect("pthread_cond_init on fresh shared memory cannot fail");
        }
    }

    /// Reject a mapping whose header wasn't stamped by us.
    pub fn validate(&self) -> ShmResult<()> {
        if self.magic != SEGMENT_MAGIC {
            return Err(ShmError::InvalidHeader {
                name: String::new(),
            });
        }
        Ok(())
    }
}

/// One ring position: which publication it holds and the lock guarding it
/// one ring position.
#[repr(C, align(64))]
pub struct SlotDescriptor {
    /// `frame_cnt` at the moment this slot was committed; 0 means never
    /// written (Invariant 4).
    pub frame_uid: AtomicU64,
    /// Opaque producer-supplied timestamp.
    pub acquisition_time: AtomicU64,
    /// Multi-reader/single-writer lock. Writers hold it exclusively only
    /// while copying pixels in; readers hold it shared only while copying
    /// pixels out.
    pub lock: RawRwLock,
    _pad: [u8; CACHE_LINE_SIZE - 24],
}

impl SlotDescriptor {
    /// # Safety
    /// Same preconditions as [`SegmentHeader::init`].
    pub unsafe fn init(slot: *mut SlotDescriptor) {
        unsafe {
            (*slot).frame_uid = AtomicU64::new(0);
            (*slot).acquisition_time = AtomicU64::new(0);
            (*slot)
                .lock
                .init()
                .expect("pthread_rwlock_init on fresh shared memory cannot fail");
        }
    }
}

/// Compute the total bytes a segment with the given frame dimensions needs:
/// header + `RING_DEPTH` slot descriptors + `RING_DEPTH` pixel buffers.
pub fn segment_size(width: u32, height: u32, depth: u32) -> usize {
    let header = std::mem::size_of::<SegmentHeader>();
    let slots = std::mem::size_of::<SlotDescriptor>() * RING_DEPTH;
    let pixels = (width as usize) * (height as usize) * (depth as usize) * RING_DEPTH;
    header + slots + pixels
}

/// A mapped segment and the accessors to reach its three regions. Owned by
/// a [`crate::lifecycle::Handle`]; never cloned or moved once mapped.
pub struct SharedSegment {
    mmap: MmapMut,
    frame_bytes: usize,
}

impl SharedSegment {
    /// Wrap an already-sized mapping. `frame_bytes` is `width*height*depth`
    /// for one slot's worth of pixels.
    pub fn new(mmap: MmapMut, frame_bytes: usize) -> Self {
        Self { mmap, frame_bytes }
    }

    /// Bytes of pixel data held by a single slot.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Header accessor. Valid for the lifetime of the mapping.
    pub fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.mmap.as_ptr() as *const SegmentHeader) }
    }

    fn slots_ptr(&self) -> *const SlotDescriptor {
        unsafe { self.mmap.as_ptr().add(std::mem::size_of::<SegmentHeader>()) as *const SlotDescriptor }
    }

    /// Descriptor for ring position `index` (`0..RING_DEPTH`).
    pub fn slot(&self, index: usize) -> &SlotDescriptor {
        debug_assert!(index < RING_DEPTH);
        unsafe { &*self.slots_ptr().add(index) }
    }

    /// Raw pointer to slot `index`, for one-time initialization before any
    /// shared reference into the slot is taken.
    pub(crate) fn slot_ptr(&self, index: usize) -> *mut SlotDescriptor {
        debug_assert!(index < RING_DEPTH);
        unsafe { self.slots_ptr().add(index) as *mut SlotDescriptor }
    }

    fn pixel_area_ptr(&self) -> *const u8 {
        unsafe { self.slots_ptr().add(RING_DEPTH) as *const u8 }
    }

    /// Read-only view of slot `index`'s pixel bytes.
    pub fn slot_pixels(&self, index: usize) -> &[u8] {
        debug_assert!(index < RING_DEPTH);
        unsafe {
            let ptr = self.pixel_area_ptr().add(index * self.frame_bytes);
            std::slice::from_raw_parts(ptr, self.frame_bytes)
        }
    }

    /// Mutable view of slot `index`'s pixel bytes. Caller must already hold
    /// that slot's write lock.
    ///
    /// # Safety
    /// The caller must hold `slot(index).lock` exclusively and must not
    /// alias this slice with any other reference into the same slot.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_pixels_mut(&self, index: usize) -> &mut [u8] {
        debug_assert!(index < RING_DEPTH);
        unsafe {
            let ptr = self.pixel_area_ptr().add(index * self.frame_bytes) as *mut u8;
            std::slice::from_raw_parts_mut(ptr, self.frame_bytes)
        }
    }
}
