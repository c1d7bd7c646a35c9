// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reader/writer protocol with writer admission
//!
//! `writer_admission` is taken by every entrant, reader or writer, before anything
//! else. A writer holds it while waiting for `state_lock`, so readers arriving after
//! the writer queue behind it and the writer waits for at most the current reader
//! generation.
//!
//! If an entry wait fails midway, the primitives already acquired are released before
//! the error is returned.

use std::sync::atomic::Ordering;

use tracing::warn;

use crate::error::StateResult;
use crate::layout::SyncBlock;
use crate::semaphore::Semaphore;

fn release_best_effort(sem: &Semaphore, what: &str) {
    if let Err(e) = sem.post() {
        warn!("Failed to release {} during rollback: {}", what, e);
    }
}

impl SyncBlock {
    pub(crate) fn writer_enter(&self) -> StateResult<()> {
        self.writer_admission.wait()?;
        if let Err(e) = self.state_lock.wait() {
            release_best_effort(&self.writer_admission, "writer admission");
            return Err(e);
        }
        if let Err(e) = self.writer_admission.post() {
            release_best_effort(&self.state_lock, "state lock");
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn writer_exit(&self) -> StateResult<()> {
        self.state_lock.post()
    }

    pub(crate) fn reader_enter(&self) -> StateResult<()> {
        self.writer_admission.wait()?;
        if let Err(e) = self.reader_count_guard.wait() {
            release_best_effort(&self.writer_admission, "writer admission");
            return Err(e);
        }

        // First reader in locks writers out for the whole generation
        if self.reader_count.load(Ordering::Relaxed) == 0 {
            if let Err(e) = self.state_lock.wait() {
                release_best_effort(&self.reader_count_guard, "reader count guard");
                release_best_effort(&self.writer_admission, "writer admission");
                return Err(e);
            }
        }
        self.reader_count.fetch_add(1, Ordering::Relaxed);

        let guard_released = self.reader_count_guard.post();
        let admission_released = self.writer_admission.post();
        guard_released.and(admission_released)
    }

    pub(crate) fn reader_exit(&self) -> StateResult<()> {
        self.reader_count_guard.wait()?;
        let remaining = self.reader_count.fetch_sub(1, Ordering::Relaxed) - 1;
        let lock_released = if remaining == 0 {
            self.state_lock.post()
        } else {
            Ok(())
        };
        let guard_released = self.reader_count_guard.post();
        lock_released.and(guard_released)
    }

    /// Number of readers currently inside
    pub(crate) fn active_readers(&self) -> u32 {
        self.reader_count.load(Ordering::Relaxed)
    }
}
