// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process-shared POSIX unnamed semaphores
//!
//! A [`Semaphore`] is a `sem_t` living inside a shared mapping. It is never moved:
//! it is only ever reached through a reference into the sync segment.

use std::cell::UnsafeCell;
use std::io;
use std::time::Duration;

use crate::error::{StateError, StateResult};

/// A `sem_t` placed in shared memory
#[repr(transparent)]
pub struct Semaphore(UnsafeCell<libc::sem_t>);

// sem_* functions are safe to call concurrently on the same object
unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    /// Initialise in place with `pshared = 1`.
    ///
    /// # Safety
    /// `self` must live in memory shared by every process that uses it, and must not be
    /// initialised twice without an intervening [`Semaphore::destroy`].
    pub unsafe fn init(&self, value: u32) -> StateResult<()> {
        if libc::sem_init(self.0.get(), 1, value) != 0 {
            return Err(StateError::semaphore("init"));
        }
        Ok(())
    }

    /// Destroy in place.
    ///
    /// # Safety
    /// No process may be blocked on or use the semaphore afterwards.
    pub unsafe fn destroy(&self) -> StateResult<()> {
        if libc::sem_destroy(self.0.get()) != 0 {
            return Err(StateError::semaphore("destroy"));
        }
        Ok(())
    }

    /// Block until the count is positive, then decrement. Retries on EINTR.
    pub fn wait(&self) -> StateResult<()> {
        loop {
            if unsafe { libc::sem_wait(self.0.get()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(StateError::Semaphore {
                    op: "wait",
                    source: err,
                });
            }
        }
    }

    /// Decrement without blocking. `Ok(false)` if the count was zero.
    pub fn try_wait(&self) -> StateResult<bool> {
        loop {
            if unsafe { libc::sem_trywait(self.0.get()) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => {
                    return Err(StateError::Semaphore {
                        op: "trywait",
                        source: err,
                    })
                }
            }
        }
    }

    /// Wait at most `timeout`. `Ok(false)` on expiry.
    pub fn wait_timeout(&self, timeout: Duration) -> StateResult<bool> {
        let deadline = realtime_deadline(timeout)?;
        loop {
            if unsafe { libc::sem_timedwait(self.0.get(), &deadline) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ETIMEDOUT) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => {
                    return Err(StateError::Semaphore {
                        op: "timedwait",
                        source: err,
                    })
                }
            }
        }
    }

    pub fn post(&self) -> StateResult<()> {
        if unsafe { libc::sem_post(self.0.get()) } != 0 {
            return Err(StateError::semaphore("post"));
        }
        Ok(())
    }

    /// Current count (diagnostics and tests only; racy by nature)
    pub fn value(&self) -> StateResult<i32> {
        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.0.get(), &mut value) } != 0 {
            return Err(StateError::semaphore("getvalue"));
        }
        Ok(value)
    }
}

/// `sem_timedwait` takes an absolute CLOCK_REALTIME deadline
fn realtime_deadline(timeout: Duration) -> StateResult<libc::timespec> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } != 0 {
        return Err(StateError::semaphore("clock_gettime"));
    }

    let mut tv_sec = now.tv_sec + timeout.as_secs() as libc::time_t;
    let mut tv_nsec = now.tv_nsec + timeout.subsec_nanos() as libc::c_long;
    if tv_nsec >= 1_000_000_000 {
        tv_sec += 1;
        tv_nsec -= 1_000_000_000;
    }
    Ok(libc::timespec { tv_sec, tv_nsec })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;
    use std::sync::Arc;
    use std::thread;

    /// Heap-backed semaphore for single-process tests
    struct LocalSemaphore(Box<MaybeUninit<Semaphore>>);

    impl LocalSemaphore {
        fn new(value: u32) -> Self {
            let slot: Box<MaybeUninit<Semaphore>> = Box::new(MaybeUninit::zeroed());
            let sem = unsafe { slot.assume_init_ref() };
            unsafe { sem.init(value).unwrap() };
            Self(slot)
        }

        fn get(&self) -> &Semaphore {
            unsafe { self.0.assume_init_ref() }
        }
    }

    impl Drop for LocalSemaphore {
        fn drop(&mut self) {
            unsafe {
                let _ = self.get().destroy();
            }
        }
    }

    #[test]
    fn test_try_wait_reports_empty() {
        let sem = LocalSemaphore::new(1);
        assert!(sem.get().try_wait().unwrap());
        assert!(!sem.get().try_wait().unwrap());
        sem.get().post().unwrap();
        assert_eq!(sem.get().value().unwrap(), 1);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let sem = LocalSemaphore::new(0);
        let start = std::time::Instant::now();
        assert!(!sem.get().wait_timeout(Duration::from_millis(30)).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_post_wakes_waiter() {
        let sem = Arc::new(LocalSemaphore::new(0));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.get().wait_timeout(Duration::from_secs(5)).unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        sem.get().post().unwrap();
        assert!(waiter.join().unwrap());
    }
}
