// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error kinds for the IPC substrate. Mirrors the error taxonomy the
// original C bridge reports via `fprintf(stderr, "[ipc] ...")` lines,
// collected here into a typed enum instead of ad-hoc strings.

use std::fmt;
use std::io;

/// Prefix every diagnostic line the way `examples/original_source` does.
macro_rules! log_line {
    ($($arg:tt)*) => {
        eprintln!("[ipc] {}", format_args!($($arg)*))
    };
}
pub(crate) use log_line;

/// Error kinds surfaced by the IPC substrate.
///
/// Creation-time errors (`MapFailed`, `NameInUse`, `SemFailed`, `SpawnFailed`,
/// `Oom`) unwind a partially constructed endpoint and are terminal. Runtime
/// ring errors (`RingFull`, `RingEmpty`) are expected and non-fatal —
/// callers see them as `false`/`Ok(false)` from the ring API, not as this
/// enum; `IpcError` only carries them when an operation has no other way to
/// report them (e.g. message framing).
#[derive(Debug)]
pub enum IpcError {
    /// Allocation failed (handle allocation, buffer growth).
    Oom,
    /// A segment of this name already exists.
    NameInUse,
    /// No segment of this name exists.
    NameNotFound,
    /// `mmap`/`MapViewOfFile` (or the reverse) failed.
    MapFailed(io::Error),
    /// Semaphore create/wake/wait failed at the OS level.
    SemFailed(io::Error),
    /// The child process could not be spawned.
    SpawnFailed(io::Error),
    /// Producer tried to stage more bytes than the ring currently has room for.
    RingFull,
    /// Consumer tried to read more bytes than the ring currently holds.
    RingEmpty,
    /// A committed record failed to parse cleanly — fatal to the channel.
    FramingViolation,
    /// The peer process has exited (observed via `is_running` returning false).
    PeerDead,
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcError::Oom => write!(f, "out of memory"),
            IpcError::NameInUse => write!(f, "segment name already in use"),
            IpcError::NameNotFound => write!(f, "segment name not found"),
            IpcError::MapFailed(e) => write!(f, "shared memory mapping failed: {e}"),
            IpcError::SemFailed(e) => write!(f, "semaphore operation failed: {e}"),
            IpcError::SpawnFailed(e) => write!(f, "child process spawn failed: {e}"),
            IpcError::RingFull => write!(f, "ring buffer full"),
            IpcError::RingEmpty => write!(f, "ring buffer empty"),
            IpcError::FramingViolation => write!(f, "ringbuffer data race"),
            IpcError::PeerDead => write!(f, "peer process is no longer running"),
        }
    }
}

impl std::error::Error for IpcError {}

impl From<io::Error> for IpcError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::AlreadyExists => IpcError::NameInUse,
            io::ErrorKind::NotFound => IpcError::NameNotFound,
            _ => IpcError::MapFailed(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
