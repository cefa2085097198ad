//! Handle lifecycle: create, open, close, destroy.

use crate::consts::{ANCHOR_PREFIX, ARCHIVE_SUFFIX, DEFAULT_SHM_DIR};
use crate::error::{ShmError, ShmResult};
use crate::platform::{attach_segment_mmap, create_segment_mmap, get_current_pid, is_process_alive};
use crate::segment::{SegmentHeader, SharedSegment, SlotDescriptor, segment_size};
use crate::consts::RING_DEPTH;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

fn validate_name(name: &str) -> ShmResult<()> {
    if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        return Err(ShmError::InvalidName {
            name: name.to_string(),
        });
    }
    if name.ends_with(ARCHIVE_SUFFIX) {
        return Err(ShmError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn anchor_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{ANCHOR_PREFIX}{name}"))
}

/// A per-process view of a mapped segment: the anchor path, the mapping, and
/// whether this process is the segment's owner.
pub struct Handle {
    name: String,
    anchor_path: PathBuf,
    segment: SharedSegment,
    owner_pid: u32,
}

impl Handle {
    /// Create a new segment named `name` under `/dev/shm`, sized for frames
    /// of `width x height x depth` bytes. Fails if the anchor already
    /// exists.
    pub fn create(name: &str, width: u32, height: u32, depth: u32) -> ShmResult<Self> {
        Self::create_in(Path::new(DEFAULT_SHM_DIR), name, width, height, depth)
    }

    /// Like [`Handle::create`], anchored under an arbitrary directory.
    /// Exists so tests can avoid colliding in the shared `/dev/shm`
    /// namespace.
    pub fn create_in(dir: &Path, name: &str, width: u32, height: u32, depth: u32) -> ShmResult<Self> {
        validate_name(name)?;
        let path = anchor_path(dir, name);
        if path.exists() {
            return Err(ShmError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let size = segment_size(width, height, depth);
        let mut mmap = match create_segment_mmap(&path, size) {
            Ok(mmap) => mmap,
            Err(ShmError::Io { source }) if source.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ShmError::AlreadyExists {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let owner_pid = get_current_pid();
        let header_ptr = mmap.as_mut_ptr() as *mut SegmentHeader;
        unsafe {
            SegmentHeader::init(header_ptr, width, height, depth, owner_pid);
        }

        let segment = SharedSegment::new(mmap, (width as usize) * (height as usize) * (depth as usize));
        for i in 0..RING_DEPTH {
            unsafe {
                SlotDescriptor::init(segment.slot_ptr(i));
            }
        }

        tracing::info!(name, width, height, depth, pid = owner_pid, "segment created");

        Ok(Self {
            name: name.to_string(),
            anchor_path: path,
            segment,
            owner_pid,
        })
    }

    /// Open an existing segment by name under `/dev/shm`.
    pub fn open(name: &str) -> ShmResult<Self> {
        Self::open_in(Path::new(DEFAULT_SHM_DIR), name)
    }

    /// Like [`Handle::open`], resolving the anchor under an arbitrary
    /// directory.
    pub fn open_in(dir: &Path, name: &str) -> ShmResult<Self> {
        validate_name(name)?;
        let path = anchor_path(dir, name);
        if !path.exists() {
            return Err(ShmError::NotFound {
                name: name.to_string(),
            });
        }

        let mmap = attach_segment_mmap(&path)?;
        let header = unsafe { &*(mmap.as_ptr() as *const SegmentHeader) };
        header.validate().map_err(|_| ShmError::InvalidHeader {
            name: name.to_string(),
        })?;

        let frame_bytes = (header.width as usize) * (header.height as usize) * (header.depth as usize);
        let owner_pid = header.owner_pid.load(Ordering::Acquire);
        let segment = SharedSegment::new(mmap, frame_bytes);

        tracing::debug!(name, "segment opened");

        Ok(Self {
            name: name.to_string(),
            anchor_path: path,
            segment,
            owner_pid,
        })
    }

    /// Release this handle. Refused if the caller is the segment's owner
    /// (use [`Handle::destroy`] instead): closing an owner handle would
    /// leave consumers with a live-looking but abandoned feed. On refusal
    /// the handle is handed back unchanged, so a mis-aimed `close()` doesn't
    /// strand the owner without a handle to act on.
    pub fn close(self) -> Result<(), (Self, ShmError)> {
        if self.is_owner() {
            return Err((
                self,
                ShmError::NotPermitted {
                    reason: "owner must call destroy, not close".to_string(),
                },
            ));
        }
        tracing::debug!(name = self.name.as_str(), "handle closed");
        Ok(())
    }

    /// Graceful teardown. Allowed if the caller owns the segment, or if the
    /// segment is poisoned (owner dead, `is_alive` still true). Otherwise
    /// refused.
    pub fn destroy(self) -> ShmResult<()> {
        let owner = self.is_owner();
        let poisoned = self.is_poisoned();
        if !owner && !poisoned {
            return Err(ShmError::NotPermitted {
                reason: "destroy refused: caller is neither owner nor segment poisoned".to_string(),
            });
        }

        let header = self.segment.header();
        header.is_alive.store(false, Ordering::Release);

        let guard = header.master_mutex.lock();
        let mut archived = self.anchor_path.as_os_str().to_owned();
        archived.push(ARCHIVE_SUFFIX);
        let archived_path = PathBuf::from(archived);
        if let Err(e) = std::fs::rename(&self.anchor_path, &archived_path) {
            tracing::warn!(name = self.name.as_str(), error = %e, "archive rename failed during destroy");
        }
        header.master_cond.broadcast();
        drop(guard);

        if let Err(e) = std::fs::remove_file(&archived_path) {
            tracing::warn!(name = self.name.as_str(), error = %e, "archived anchor unlink failed during destroy");
        }

        tracing::info!(name = self.name.as_str(), owner, poisoned, "segment destroyed");
        Ok(())
    }

    /// Name this handle was created or opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(width, height, depth)` of this segment, fixed at creation.
    pub fn dims(&self) -> (u32, u32, u32) {
        let header = self.segment.header();
        (header.width, header.height, header.depth)
    }

    /// True iff teardown has not yet run on this segment.
    pub fn is_alive(&self) -> bool {
        self.segment.header().is_alive.load(Ordering::Acquire)
    }

    /// True iff `is_alive` is still set but the recorded owner process is no
    /// longer running.
    pub fn is_poisoned(&self) -> bool {
        self.is_alive() && !is_process_alive(self.owner_pid)
    }

    pub(crate) fn is_owner(&self) -> bool {
        get_current_pid() == self.owner_pid
    }

    pub(crate) fn segment(&self) -> &SharedSegment {
        &self.segment
    }
}

/// Open `name` under `/dev/shm`, read `is_alive`, and close. Convenience for
/// callers with no standing handle.
pub fn is_alive_by_name(name: &str) -> ShmResult<bool> {
    is_alive_by_name_in(Path::new(DEFAULT_SHM_DIR), name)
}

/// Like [`is_alive_by_name`], resolving under an arbitrary directory.
pub fn is_alive_by_name_in(dir: &Path, name: &str) -> ShmResult<bool> {
    let handle = Handle::open_in(dir, name)?;
    let alive = handle.is_alive();
    drop(handle);
    Ok(alive)
}

/// Open `name` under `/dev/shm`, read `is_poisoned`, and close.
pub fn is_poisoned_by_name(name: &str) -> ShmResult<bool> {
    is_poisoned_by_name_in(Path::new(DEFAULT_SHM_DIR), name)
}

/// Like [`is_poisoned_by_name`], resolving under an arbitrary directory.
pub fn is_poisoned_by_name_in(dir: &Path, name: &str) -> ShmResult<bool> {
    let handle = Handle::open_in(dir, name)?;
    let poisoned = handle.is_poisoned();
    drop(handle);
    Ok(poisoned)
}
