// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock-free SPSC byte ring (C3). Generalized from `proto/shm_ring.rs`'s
// fixed-slot atomic header style to a variable-length byte ring with a
// staged-write/atomic-commit protocol, cross-checked against the header
// layout spec.md §3 describes (`size`/`head`/`tail`/`wrtn`/`flags`).

use std::sync::atomic::{AtomicU32, Ordering};

const FLAG_INVALIDATE_COMMIT: u32 = 1 << 0;
const FLAG_ERROR_READING: u32 = 1 << 1;
const FLAG_ERROR_WRITING: u32 = 1 << 2;

/// Ring header, laid out in shared memory immediately before the ring's
/// data bytes.
#[repr(C)]
pub struct RingHeader {
    size: AtomicU32,
    head: AtomicU32,
    tail: AtomicU32,
    wrtn: AtomicU32,
    flags: AtomicU32,
}

// Safety: lives inside a process-shared mapping by construction.
unsafe impl Send for RingHeader {}
unsafe impl Sync for RingHeader {}

impl RingHeader {
    pub const fn byte_size() -> usize {
        std::mem::size_of::<Self>()
    }
}

/// A view over a ring header plus its data buffer, both living inside a
/// shared segment. Does not own the memory — `Ring` is borrowed for the
/// lifetime of the segment mapping it was carved out of.
pub struct Ring {
    header: *const RingHeader,
    data: *mut u8,
    size: u32,
}

// Safety: the pointed-to memory is process-shared; synchronization is via
// the atomics in `RingHeader`.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Construct a view over an already-initialised ring (client side, or
    /// any re-open of a ring a previous call to `init` has already set up).
    ///
    /// # Safety
    /// `header` must point to a valid `RingHeader` immediately followed by
    /// at least `header.size` bytes of writable memory, for the lifetime of
    /// the returned `Ring`.
    pub unsafe fn from_raw(header: *mut RingHeader, size: u32) -> Self {
        let data = (header as *mut u8).add(RingHeader::byte_size());
        Self {
            header,
            data,
            size,
        }
    }

    /// Zero the header and record `size` as the buffer's capacity. Must be
    /// called exactly once, by the segment's creator, before any peer
    /// observes the memory.
    ///
    /// # Safety
    /// Same preconditions as `from_raw`.
    pub unsafe fn init(header: *mut RingHeader, size: u32) -> Self {
        let h = &*header;
        h.size.store(size, Ordering::Relaxed);
        h.head.store(0, Ordering::Relaxed);
        h.tail.store(0, Ordering::Relaxed);
        h.wrtn.store(0, Ordering::Relaxed);
        h.flags.store(0, Ordering::Relaxed);
        Self::from_raw(header, size)
    }

    fn header(&self) -> &RingHeader {
        unsafe { &*self.header }
    }

    /// Bytes available to read.
    pub fn read_size(&self) -> u32 {
        let h = self.header();
        let head = h.head.load(Ordering::Acquire);
        let tail = h.tail.load(Ordering::Relaxed);
        if head >= tail {
            head - tail
        } else {
            head + self.size - tail
        }
    }

    /// Bytes available to stage via `write` before the ring is full.
    pub fn write_size(&self) -> u32 {
        let h = self.header();
        let tail = h.tail.load(Ordering::Acquire);
        let wrtn = h.wrtn.load(Ordering::Relaxed);
        (tail + self.size - wrtn - 1) % self.size
    }

    fn copy_in_wrapping(&self, at: u32, src: &[u8]) {
        let n = src.len();
        let size = self.size as usize;
        let at = at as usize;
        let first = n.min(size - at);
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.data.add(at), first);
            if first < n {
                std::ptr::copy_nonoverlapping(src.as_ptr().add(first), self.data, n - first);
            }
        }
    }

    fn copy_out_wrapping(&self, at: u32, dst: &mut [u8]) {
        let n = dst.len();
        let size = self.size as usize;
        let at = at as usize;
        let first = n.min(size - at);
        unsafe {
            std::ptr::copy_nonoverlapping(self.data.add(at), dst.as_mut_ptr(), first);
            if first < n {
                std::ptr::copy_nonoverlapping(self.data, dst.as_mut_ptr().add(first), n - first);
            }
        }
    }

    /// Read `dst.len()` bytes from the ring, advancing `tail`. Fails without
    /// side effects if the ring holds fewer bytes than requested.
    pub fn read(&self, dst: &mut [u8]) -> bool {
        let n = dst.len() as u32;
        assert!(n > 0 && n < self.size, "read length out of range");

        let h = self.header();
        if n > self.read_size() {
            h.flags.fetch_or(FLAG_ERROR_READING, Ordering::Relaxed);
            return false;
        }

        let tail = h.tail.load(Ordering::Relaxed);
        self.copy_out_wrapping(tail, dst);
        let new_tail = (tail + n) % self.size;
        h.tail.store(new_tail, Ordering::Release);
        h.flags.fetch_and(!FLAG_ERROR_READING, Ordering::Relaxed);
        true
    }

    /// Stage `src.len()` bytes starting at the producer's write cursor.
    /// Does not publish the record — call `commit` once the full record has
    /// been staged. On failure, marks the pending commit to be rolled back.
    pub fn write(&self, src: &[u8]) -> bool {
        let n = src.len() as u32;
        assert!(n > 0 && n < self.size, "write length out of range");

        let h = self.header();
        if n >= self.write_size() {
            h.flags
                .fetch_or(FLAG_INVALIDATE_COMMIT | FLAG_ERROR_WRITING, Ordering::Relaxed);
            return false;
        }

        let wrtn = h.wrtn.load(Ordering::Relaxed);
        self.copy_in_wrapping(wrtn, src);
        let new_wrtn = (wrtn + n) % self.size;
        h.wrtn.store(new_wrtn, Ordering::Relaxed);
        h.flags.fetch_and(!FLAG_ERROR_WRITING, Ordering::Relaxed);
        true
    }

    /// Publish the staged range as one atomic record, or roll it back if a
    /// prior `write` in this record failed.
    pub fn commit(&self) -> bool {
        let h = self.header();
        let flags = h.flags.load(Ordering::Relaxed);
        if flags & FLAG_INVALIDATE_COMMIT != 0 {
            let head = h.head.load(Ordering::Relaxed);
            h.wrtn.store(head, Ordering::Relaxed);
            h.flags.fetch_and(!FLAG_INVALIDATE_COMMIT, Ordering::Relaxed);
            return false;
        }
        let wrtn = h.wrtn.load(Ordering::Relaxed);
        h.head.store(wrtn, Ordering::Release);
        true
    }

    pub fn capacity(&self) -> u32 {
        self.size
    }
}
