//! Publication protocol: the owner's `publish` call.

use crate::consts::RING_DEPTH;
use crate::error::{ShmError, ShmResult};
use crate::lifecycle::Handle;
use std::sync::atomic::Ordering;

impl Handle {
    /// Publish one frame. `width`/`height`/`depth` must match the segment's
    /// dimensions; `pixels` must be exactly `width*height*depth` bytes.
    pub fn publish(
        &self,
        width: u32,
        height: u32,
        depth: u32,
        acquisition_time: u64,
        pixels: &[u8],
    ) -> ShmResult<()> {
        let segment = self.segment();
        let header = segment.header();

        let (expected_w, expected_h, expected_d) = (header.width, header.height, header.depth);
        if (width, height, depth) != (expected_w, expected_h, expected_d) {
            return Err(ShmError::FrameSizeMismatch {
                expected_w,
                expected_h,
                expected_d,
                actual_w: width,
                actual_h: height,
                actual_d: depth,
            });
        }
        if pixels.len() != segment.frame_bytes() {
            return Err(ShmError::PixelBufferSizeMismatch {
                expected_bytes: segment.frame_bytes(),
                actual_bytes: pixels.len(),
            });
        }

        if !header.is_alive.load(Ordering::Acquire) {
            return Err(ShmError::BlockNotActive {
                name: self.name().to_string(),
            });
        }

        // Step 1: pick the slot that will hold the next frame_uid, before
        // the counter is incremented.
        let current = header.frame_cnt.load(Ordering::Relaxed);
        let target_uid = current + 1;
        let target_slot = (target_uid % RING_DEPTH as u64) as usize;

        // Step 2: exclude readers of the target slot.
        let slot = segment.slot(target_slot);
        let write_guard = slot.lock.write();

        // Step 3: copy pixels in.
        unsafe {
            segment.slot_pixels_mut(target_slot).copy_from_slice(pixels);
        }

        // Step 4: commit the counter.
        let new_uid = header.frame_cnt.fetch_add(1, Ordering::AcqRel) + 1;
        debug_assert_eq!(new_uid, target_uid);

        // Step 5: stamp the descriptor.
        slot.acquisition_time.store(acquisition_time, Ordering::Relaxed);
        slot.frame_uid.store(new_uid, Ordering::Release);

        // Step 6: release the slot write lock.
        drop(write_guard);

        // Step 7: broadcast under the master mutex, never held during the
        // pixel copy above.
        let master_guard = header.master_mutex.lock();
        header.master_cond.broadcast();
        drop(master_guard);

        tracing::debug!(
            name = self.name(),
            frame_uid = new_uid,
            slot = target_slot,
            "published frame"
        );

        Ok(())
    }
}
