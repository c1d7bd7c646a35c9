// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Agent move channels and their multiplexed wait
//!
//! Each agent writes one byte per granted turn into its channel (its stdout pipe when
//! spawned). The orchestrator waits on every open channel at once with `poll(2)`.

use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

/// Readable end of an agent channel
pub trait MoveSource: Read + AsFd + Send {}

impl<T: Read + AsFd + Send> MoveSource for T {}

/// Result of reading one byte from a ready channel
#[derive(Debug)]
pub enum ChannelRead {
    Byte(u8),
    /// Zero-length read: the agent closed its end
    Closed,
    Failed(io::Error),
}

/// One agent's channel
pub struct AgentChannel {
    source: Box<dyn MoveSource>,
}

impl AgentChannel {
    pub fn new(source: impl MoveSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.source.as_fd()
    }

    /// Read exactly one byte; call only after the channel polled ready
    pub fn read_byte(&mut self) -> ChannelRead {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return ChannelRead::Closed,
                Ok(_) => return ChannelRead::Byte(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return ChannelRead::Failed(e),
            }
        }
    }
}

/// Wait until at least one of `channels` is readable or `timeout` passes.
///
/// `channels` pairs a caller-chosen key with a channel; the keys of the ready channels
/// are returned. Hang-up and error conditions count as ready so the following read
/// observes them. A signal interrupting the wait yields an empty result.
pub fn poll_ready<K: Copy>(
    channels: &[(K, &AgentChannel)],
    timeout: Duration,
) -> io::Result<Vec<K>> {
    if channels.is_empty() {
        std::thread::sleep(timeout);
        return Ok(Vec::new());
    }

    let mut fds: Vec<PollFd<'_>> = channels
        .iter()
        .map(|(_, channel)| PollFd::new(channel.fd(), PollFlags::POLLIN))
        .collect();

    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
    let timeout = PollTimeout::try_from(timeout_ms).unwrap_or(PollTimeout::MAX);
    match poll(&mut fds, timeout) {
        Ok(_) => {}
        Err(Errno::EINTR) => return Ok(Vec::new()),
        Err(errno) => return Err(errno.into()),
    }

    let ready = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
    Ok(fds
        .iter()
        .zip(channels)
        .filter(|(fd, _)| fd.revents().is_some_and(|revents| revents.intersects(ready)))
        .map(|(_, (key, _))| *key)
        .collect())
}
