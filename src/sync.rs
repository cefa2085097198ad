//! Process-shared synchronization primitives.
//!
//! The segment header and slot descriptors embed raw `pthread` objects
//! directly in the mapped memory, initialized with the `PTHREAD_PROCESS_SHARED`
//! attribute so the kernel futex they wrap is valid across every address
//! space that maps the segment. This emulates process-shared primitives
//! on platforms (all the ones this crate targets) that lack a higher-level
//! one in the standard library.
//!
//! None of these types are `Send`/movable once initialized: they must stay
//! at the mmap address they were initialized at, for the lifetime of the
//! segment.

use std::cell::UnsafeCell;
use std::io;
use std::mem::MaybeUninit;

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(ret))
    }
}

/// A `pthread_mutex_t` living inside shared memory.
#[repr(transparent)]
pub struct RawMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

unsafe impl Sync for RawMutex {}

impl RawMutex {
    /// Initialize a zeroed mutex slot with the process-shared attribute.
    /// Must be called exactly once, by the segment's creator, before any
    /// other mapper touches this memory.
    ///
    /// # Safety
    /// `self` must point at writable, zero-initialized memory that no other
    /// thread or process is concurrently accessing.
    pub unsafe fn init(&self) -> io::Result<()> {
        unsafe {
            let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
            check(libc::pthread_mutexattr_init(attr.as_mut_ptr()))?;
            let mut attr = attr.assume_init();
            check(libc::pthread_mutexattr_setpshared(
                &mut attr,
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            let res = check(libc::pthread_mutex_init(self.inner.get(), &attr));
            libc::pthread_mutexattr_destroy(&mut attr);
            res
        }
    }

    /// Block until the mutex is acquired.
    pub fn lock(&self) -> RawMutexGuard<'_> {
        unsafe {
            let rc = libc::pthread_mutex_lock(self.inner.get());
            debug_assert_eq!(rc, 0, "pthread_mutex_lock failed: {rc}");
        }
        RawMutexGuard { mutex: self }
    }
}

/// RAII guard releasing a [`RawMutex`] on drop.
pub struct RawMutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl Drop for RawMutexGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_unlock(self.mutex.inner.get());
        }
    }
}

/// A `pthread_cond_t` living inside shared memory, always paired with a
/// specific [`RawMutex`] by convention (never enforced by the type, exactly
/// as POSIX leaves it to the caller).
#[repr(transparent)]
pub struct RawCondvar {
    inner: UnsafeCell<libc::pthread_cond_t>,
}

unsafe impl Sync for RawCondvar {}

impl RawCondvar {
    /// Initialize a zeroed condvar slot with the process-shared attribute.
    ///
    /// # Safety
    /// Same preconditions as [`RawMutex::init`].
    pub unsafe fn init(&self) -> io::Result<()> {
        unsafe {
            let mut attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
            check(libc::pthread_condattr_init(attr.as_mut_ptr()))?;
            let mut attr = attr.assume_init();
            check(libc::pthread_condattr_setpshared(
                &mut attr,
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            let res = check(libc::pthread_cond_init(self.inner.get(), &attr));
            libc::pthread_condattr_destroy(&mut attr);
            res
        }
    }

    /// Release `guard`'s mutex and block until woken, then reacquire it
    /// before returning. Mirrors `std::sync::Condvar::wait`.
    pub fn wait<'a>(&self, guard: RawMutexGuard<'a>) -> RawMutexGuard<'a> {
        unsafe {
            let rc = libc::pthread_cond_wait(self.inner.get(), guard.mutex.inner.get());
            debug_assert_eq!(rc, 0, "pthread_cond_wait failed: {rc}");
        }
        guard
    }

    /// Wake every thread/process currently waiting on this condvar.
    pub fn broadcast(&self) {
        unsafe {
            libc::pthread_cond_broadcast(self.inner.get());
        }
    }
}

/// A `pthread_rwlock_t` living inside shared memory: the per-slot lock from
/// §4.2, taken shared by readers copying pixels out and exclusive by the
/// writer copying pixels in.
#[repr(transparent)]
pub struct RawRwLock {
    inner: UnsafeCell<libc::pthread_rwlock_t>,
}

unsafe impl Sync for RawRwLock {}

impl RawRwLock {
    /// Initialize a zeroed rwlock slot with the process-shared attribute.
    ///
    /// # Safety
    /// Same preconditions as [`RawMutex::init`].
    pub unsafe fn init(&self) -> io::Result<()> {
        unsafe {
            let mut attr = MaybeUninit::<libc::pthread_rwlockattr_t>::uninit();
            check(libc::pthread_rwlockattr_init(attr.as_mut_ptr()))?;
            let mut attr = attr.assume_init();
            check(libc::pthread_rwlockattr_setpshared(
                &mut attr,
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            let res = check(libc::pthread_rwlock_init(self.inner.get(), &attr));
            libc::pthread_rwlockattr_destroy(&mut attr);
            res
        }
    }

    /// Block until a shared (read) lock is acquired.
    pub fn read(&self) -> RawRwLockReadGuard<'_> {
        unsafe {
            let rc = libc::pthread_rwlock_rdlock(self.inner.get());
            debug_assert_eq!(rc, 0, "pthread_rwlock_rdlock failed: {rc}");
        }
        RawRwLockReadGuard { lock: self }
    }

    /// Try to acquire a shared (read) lock without blocking. `None` if the
    /// writer currently holds it.
    pub fn try_read(&self) -> Option<RawRwLockReadGuard<'_>> {
        let rc = unsafe { libc::pthread_rwlock_tryrdlock(self.inner.get()) };
        match rc {
            0 => Some(RawRwLockReadGuard { lock: self }),
            libc::EBUSY => None,
            other => {
                debug_assert_eq!(other, libc::EBUSY, "pthread_rwlock_tryrdlock failed: {other}");
                None
            }
        }
    }

    /// Block until the exclusive (write) lock is acquired.
    pub fn write(&self) -> RawRwLockWriteGuard<'_> {
        unsafe {
            let rc = libc::pthread_rwlock_wrlock(self.inner.get());
            debug_assert_eq!(rc, 0, "pthread_rwlock_wrlock failed: {rc}");
        }
        RawRwLockWriteGuard { lock: self }
    }
}

/// RAII guard releasing a shared [`RawRwLock`] hold on drop.
pub struct RawRwLockReadGuard<'a> {
    lock: &'a RawRwLock,
}

impl Drop for RawRwLockReadGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_rwlock_unlock(self.lock.inner.get());
        }
    }
}

/// RAII guard releasing an exclusive [`RawRwLock`] hold on drop.
pub struct RawRwLockWriteGuard<'a> {
    lock: &'a RawRwLock,
}

impl Drop for RawRwLockWriteGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_rwlock_unlock(self.lock.inner.get());
        }
    }
}
