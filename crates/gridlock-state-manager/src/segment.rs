// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! File-backed shared memory segments
//!
//! On Linux the default directory `/dev/shm` is tmpfs, so a segment is POSIX shared
//! memory under a path name. Any other directory works the same way, which is what the
//! tests use.

use memmap2::{Mmap, MmapMut};
use std::fs::{self, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};

enum Mapping {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

/// One mapped segment
pub struct Segment {
    path: PathBuf,
    mapping: Mapping,
}

impl Segment {
    /// Create a zero-filled segment of `size` bytes.
    ///
    /// Fails with [`StateError::StaleSegment`] if the file exists, unless
    /// `reclaim_stale` is set, in which case the old file is unlinked first.
    pub fn create(path: &Path, size: usize, reclaim_stale: bool) -> StateResult<Self> {
        let file = match Self::open_exclusive(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !reclaim_stale {
                    return Err(StateError::StaleSegment {
                        path: path.to_path_buf(),
                    });
                }
                warn!("Reclaiming stale segment {}", path.display());
                fs::remove_file(path).map_err(|e| StateError::segment(path, e))?;
                Self::open_exclusive(path).map_err(|e| StateError::segment(path, e))?
            }
            Err(e) => return Err(StateError::segment(path, e)),
        };

        // Fresh file: set_len zero-fills
        file.set_len(size as u64)
            .map_err(|e| StateError::segment(path, e))?;
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| StateError::segment(path, e))?;

        info!("Created segment {} ({} bytes)", path.display(), size);
        Ok(Self {
            path: path.to_path_buf(),
            mapping: Mapping::ReadWrite(mmap),
        })
    }

    fn open_exclusive(path: &Path) -> io::Result<fs::File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
    }

    /// Map an existing segment, checking it is at least `min_size` bytes
    pub fn open(path: &Path, writable: bool, min_size: usize) -> StateResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|e| StateError::segment(path, e))?;

        let len = file
            .metadata()
            .map_err(|e| StateError::segment(path, e))?
            .len() as usize;
        if len < min_size {
            return Err(StateError::InvalidLayout {
                path: path.to_path_buf(),
                reason: format!("size {} smaller than {}", len, min_size),
            });
        }

        let mapping = if writable {
            Mapping::ReadWrite(
                unsafe { MmapMut::map_mut(&file) }.map_err(|e| StateError::segment(path, e))?,
            )
        } else {
            Mapping::ReadOnly(unsafe { Mmap::map(&file) }.map_err(|e| StateError::segment(path, e))?)
        };

        debug!(
            "Attached segment {} ({} bytes, {})",
            path.display(),
            len,
            if writable { "rw" } else { "ro" }
        );
        Ok(Self {
            path: path.to_path_buf(),
            mapping,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.mapping, Mapping::ReadWrite(_))
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.mapping {
            Mapping::ReadWrite(m) => &m[..],
            Mapping::ReadOnly(m) => &m[..],
        }
    }

    /// Mutable bytes; `None` for read-only mappings
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.mapping {
            Mapping::ReadWrite(m) => Some(&mut m[..]),
            Mapping::ReadOnly(_) => None,
        }
    }

    /// Base address of the mapping (page aligned)
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes().as_ptr()
    }

    /// Unmap and remove the backing file
    pub fn unlink(self) -> StateResult<()> {
        let Segment { path, mapping } = self;
        drop(mapping);
        fs::remove_file(&path).map_err(|e| StateError::segment(&path, e))?;
        info!("Unlinked segment {}", path.display());
        Ok(())
    }
}
