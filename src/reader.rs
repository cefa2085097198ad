//! Reader wait/wake core: target-slot selection, the catch-up rule, and
//! blocking/non-blocking read.

use crate::consts::RING_DEPTH;
use crate::error::{ShmError, ShmResult};
use crate::frame::FrameRecord;
use crate::lifecycle::Handle;
use std::sync::atomic::Ordering;

impl Handle {
    /// Read the next frame this record hasn't seen yet into `record`.
    ///
    /// `blocking == true` waits for a new publish if none is available yet;
    /// `blocking == false` returns [`ShmError::NoNewFrame`] instead.
    pub fn read(&self, record: &mut FrameRecord, blocking: bool) -> ShmResult<()> {
        let segment = self.segment();
        let header = segment.header();
        let ring_depth = RING_DEPTH as u64;

        // Step 1.
        let mut master_guard = header.master_mutex.lock();

        // Step 2.
        record.ensure_capacity(header.width, header.height, header.depth);

        // Step 3.
        if !header.is_alive.load(Ordering::Acquire) {
            drop(master_guard);
            return Err(ShmError::BlockNotActive {
                name: self.name().to_string(),
            });
        }

        loop {
            // Step 4.
            let newest = header.frame_cnt.load(Ordering::Acquire);
            let last = record.frame_uid;
            let target_uid = if newest < ring_depth {
                last + 1
            } else {
                (last + 1).max(newest - ring_depth + 1)
            };
            let target_slot = (target_uid % ring_depth) as usize;

            // Step 5.
            if last == newest {
                if blocking {
                    master_guard = header.master_cond.wait(master_guard);
                    if !header.is_alive.load(Ordering::Acquire) {
                        drop(master_guard);
                        return Err(ShmError::BlockNotActive {
                            name: self.name().to_string(),
                        });
                    }
                    continue;
                } else {
                    drop(master_guard);
                    return Err(ShmError::NoNewFrame);
                }
            }

            // Step 6.
            match segment.slot(target_slot).lock.try_read() {
                Some(read_guard) => {
                    // Step 7.
                    drop(master_guard);

                    // Step 8.
                    let slot = segment.slot(target_slot);
                    let frame_uid = slot.frame_uid.load(Ordering::Acquire);
                    let acquisition_time = slot.acquisition_time.load(Ordering::Relaxed);
                    record.pixels.copy_from_slice(segment.slot_pixels(target_slot));
                    record.frame_uid = frame_uid;
                    record.acquisition_time = acquisition_time;

                    // Step 9.
                    drop(read_guard);

                    tracing::debug!(
                        name = self.name(),
                        frame_uid,
                        slot = target_slot,
                        "read frame"
                    );
                    return Ok(());
                }
                None => {
                    tracing::debug!(name = self.name(), slot = target_slot, "slot contended, waiting");
                    master_guard = header.master_cond.wait(master_guard);
                    if !header.is_alive.load(Ordering::Acquire) {
                        drop(master_guard);
                        return Err(ShmError::BlockNotActive {
                            name: self.name().to_string(),
                        });
                    }
                }
            }
        }
    }
}
