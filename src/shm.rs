// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Named shared-memory segment (C1). Exactly one creator (`ServerSegment`)
// and one attacher (`ClientSegment`) per segment, per spec.md §3
// "Lifecycle" — ownership is encoded as two distinct types with different
// `Drop` behaviour rather than the teacher's ref-counted `ShmHandle`.

use crate::error::{log_line, IpcError, Result};
use crate::platform;

/// `true` iff no segment of this name currently exists. Race-tolerant: a
/// hint for name selection, not a reservation.
pub fn check(name: &str) -> bool {
    platform::check(name)
}

/// A segment created and owned by this process. Unmaps and unlinks the
/// kernel object on drop.
pub struct ServerSegment {
    mapping: platform::ServerMapping,
}

unsafe impl Send for ServerSegment {}
unsafe impl Sync for ServerSegment {}

impl ServerSegment {
    /// Create and map a fresh named segment of exactly `size` bytes.
    /// `memlock` is best-effort (a failed lock is logged, not fatal).
    pub fn create(name: &str, size: usize, memlock: bool) -> Result<Self> {
        let mapping = platform::server_create(name, size, memlock).map_err(IpcError::from)?;
        Ok(Self { mapping })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.mapping.ptr
    }

    pub fn size(&self) -> usize {
        self.mapping.size
    }
}

impl Drop for ServerSegment {
    fn drop(&mut self) {
        platform::server_destroy(&self.mapping);
    }
}

/// A segment attached by a peer of the creating process. Unmaps only on
/// drop — never unlinks the name.
pub struct ClientSegment {
    mapping: platform::ClientMapping,
}

unsafe impl Send for ClientSegment {}
unsafe impl Sync for ClientSegment {}

impl ClientSegment {
    /// Attach to an existing named segment. `size` must match what the
    /// server created exactly.
    pub fn attach(name: &str, size: usize, memlock: bool) -> Result<Self> {
        let mapping = platform::client_attach(name, size, memlock).map_err(|e| {
            log_line!("client_attach({name}) failed: {e}");
            IpcError::from(e)
        })?;
        Ok(Self { mapping })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.mapping.ptr
    }

    pub fn size(&self) -> usize {
        self.mapping.size
    }
}

impl Drop for ClientSegment {
    fn drop(&mut self) {
        platform::client_detach(&self.mapping);
    }
}
