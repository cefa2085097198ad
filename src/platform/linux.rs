//! Linux-specific shared memory operations: mapping a segment file and
//! testing whether a recorded owner PID still denotes a live process.

use crate::error::ShmResult;
use memmap2::{MmapMut, MmapOptions};
use nix::sys::signal::kill;
use nix::unistd::{Pid, getpid};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;

/// Create (or truncate) the anchor file at `path` to `size` bytes and map it
/// read/write, shared. Used only by `create`, before the header is stamped.
pub fn create_segment_mmap(path: &std::path::Path, size: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .mode(0o700)
        .open(path)?;

    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

/// Open an existing anchor file and map it read/write, shared. The mapping
/// length is the file's current length, which `open` uses without knowing
/// the dimensions in advance.
pub fn attach_segment_mmap(path: &std::path::Path) -> ShmResult<MmapMut> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

/// Check if process `pid` is alive using `kill(pid, 0)`. `ESRCH` means dead;
/// `EPERM` means alive but owned by someone else.
pub fn is_process_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::Error::ESRCH) => false,
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}

/// PID of the calling process, as recorded in a segment header at creation.
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}
