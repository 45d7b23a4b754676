// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Channel endpoint (C5): composes C1–C4 into server and client halves of a
// duplex channel, per spec.md §4.5. New composition module in the style of
// `channel.rs`'s `ChanInner`, wired per
// `examples/original_source/src/ipc.h`.

use std::time::Duration;

use crate::error::{log_line, IpcError, Result};
use crate::process::ChildProcess;
use crate::ring::{Ring, RingHeader};
use crate::sem::SemState;
use crate::shm::{ClientSegment, ServerSegment};
use crate::shm_name::choose_name;

/// Ring capacity in bytes, used when a caller doesn't specify one.
pub const DEFAULT_RBSIZE: u32 = 0x7FFF;

fn sem_size() -> usize {
    std::mem::size_of::<SemState>()
}

fn ring_a_offset() -> usize {
    2 * sem_size()
}

fn ring_b_offset(rbsize: u32) -> usize {
    ring_a_offset() + RingHeader::byte_size() + rbsize as usize
}

fn total_size(rbsize: u32) -> usize {
    ring_b_offset(rbsize) + RingHeader::byte_size() + rbsize as usize
}

unsafe fn sem_at(base: *mut u8, offset: usize) -> *const SemState {
    base.add(offset) as *const SemState
}

unsafe fn ring_header_at(base: *mut u8, offset: usize) -> *mut RingHeader {
    base.add(offset) as *mut RingHeader
}

/// Operations common to both ends of a channel, shared by message framing
/// (C6) so it can be written once against either endpoint type.
pub trait ChannelOps {
    fn write(&self, src: &[u8]) -> bool;
    fn commit(&self) -> bool;
    fn wake(&self);
    fn read(&self, dst: &mut [u8]) -> bool;
    fn read_size(&self) -> u32;
    fn wait_secs(&self, secs: u32) -> bool;
}

/// Server-side state machine per spec.md §4.5.
enum ServerState {
    ChildSpawned,
    Shutdown,
}

/// The server half of a duplex channel: owns the segment, spawns and
/// supervises the child process bound to it.
pub struct EndpointServer {
    segment: ServerSegment,
    ring_out: Ring, // Ring A, server -> client
    ring_in: Ring,  // Ring B, client -> server
    sem_out: *const SemState, // sem_client: posted by server, waited by client
    sem_in: *const SemState,  // sem_server: waited by server, posted by client
    child: ChildProcess,
    state: ServerState,
}

unsafe impl Send for EndpointServer {}
unsafe impl Sync for EndpointServer {}

impl EndpointServer {
    /// Create the segment, initialise both rings and semaphores, and spawn
    /// `argv[0]`. Any step failing rolls back everything allocated so far.
    pub fn server_start(argv: &[&str], name: &str, rbsize: u32) -> Result<Self> {
        let size = total_size(rbsize);
        let segment = ServerSegment::create(name, size, false)?;

        let base = segment.as_ptr();
        unsafe { std::ptr::write_bytes(base, 0, size) };

        let sem_server = unsafe { &*sem_at(base, 0) };
        let sem_client = unsafe { &*sem_at(base, sem_size()) };
        sem_server.init();
        sem_client.init();

        let ring_out = unsafe { Ring::init(ring_header_at(base, ring_a_offset()), rbsize) };
        let ring_in = unsafe { Ring::init(ring_header_at(base, ring_b_offset(rbsize)), rbsize) };

        let child = match ChildProcess::start(argv) {
            Ok(c) => c,
            Err(e) => {
                log_line!("server_start: child spawn failed, rolling back");
                return Err(e);
            }
        };

        Ok(Self {
            segment,
            ring_out,
            ring_in,
            sem_out: sem_client as *const SemState,
            sem_in: sem_server as *const SemState,
            child,
            state: ServerState::ChildSpawned,
        })
    }

    /// Convenience constructor implementing the `lv2-gtk-ui-bridge-<N>` name-probing
    /// loop and the child argv contract from spec.md §6: `argv[0]`=path,
    /// `argv[1]`=plugin URI, `argv[2]`=segment name, `argv[3]`=parent
    /// window id in decimal.
    pub fn spawn(child_path: &str, plugin_uri: &str, window_id: u64, rbsize: u32) -> Result<Self> {
        let name = choose_name(crate::shm::check)
            .ok_or(IpcError::NameInUse)?;
        let wid = window_id.to_string();
        let argv = [child_path, plugin_uri, name.as_str(), wid.as_str()];
        Self::server_start(&argv, &name, rbsize)
    }

    /// Block until the inbound semaphore signals, or `secs` elapses.
    /// Callers that care about confirming the child attached (spec.md
    /// §4.5 step 6) call this before trusting the channel; the core
    /// itself does not require it.
    pub fn wait_for_client_ready(&self, secs: u32) -> bool {
        self.wait_secs(secs)
    }

    pub fn is_running(&self) -> bool {
        self.child.is_running()
    }

    pub fn pid(&self) -> u32 {
        self.child.pid()
    }

    /// Terminate the child, destroy the semaphores, unmap and unlink the
    /// segment. Idempotent.
    pub fn stop(&mut self) {
        if matches!(self.state, ServerState::Shutdown) {
            return;
        }
        self.child.stop();
        self.state = ServerState::Shutdown;
        // segment teardown happens in `Drop`
    }
}

impl ChannelOps for EndpointServer {
    fn write(&self, src: &[u8]) -> bool {
        self.ring_out.write(src)
    }

    fn commit(&self) -> bool {
        self.ring_out.commit()
    }

    fn wake(&self) {
        unsafe { &*self.sem_out }.wake();
    }

    fn read(&self, dst: &mut [u8]) -> bool {
        self.ring_in.read(dst)
    }

    fn read_size(&self) -> u32 {
        self.ring_in.read_size()
    }

    fn wait_secs(&self, secs: u32) -> bool {
        unsafe { &*self.sem_in }.wait_secs(secs)
    }
}

impl Drop for EndpointServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The client half of a duplex channel: attaches to an already-live
/// segment without re-initialising anything.
pub struct EndpointClient {
    segment: ClientSegment,
    ring_out: Ring, // Ring B, client -> server
    ring_in: Ring,  // Ring A, server -> client
    sem_out: *const SemState, // sem_server: posted by client, waited by server
    sem_in: *const SemState,  // sem_client: waited by client, posted by server
}

unsafe impl Send for EndpointClient {}
unsafe impl Sync for EndpointClient {}

impl EndpointClient {
    pub fn client_attach(name: &str, rbsize: u32) -> Result<Self> {
        let size = total_size(rbsize);
        let segment = ClientSegment::attach(name, size, false)?;

        let base = segment.as_ptr();
        let sem_server = unsafe { &*sem_at(base, 0) };
        let sem_client = unsafe { &*sem_at(base, sem_size()) };

        let ring_in = unsafe { Ring::from_raw(ring_header_at(base, ring_a_offset()), rbsize) };
        let ring_out = unsafe { Ring::from_raw(ring_header_at(base, ring_b_offset(rbsize)), rbsize) };

        Ok(Self {
            segment,
            ring_out,
            ring_in,
            sem_out: sem_server as *const SemState,
            sem_in: sem_client as *const SemState,
        })
    }

    /// Unmap the segment. Never unlinks — the server owns the name.
    pub fn detach(self) {}
}

impl ChannelOps for EndpointClient {
    fn write(&self, src: &[u8]) -> bool {
        self.ring_out.write(src)
    }

    fn commit(&self) -> bool {
        self.ring_out.commit()
    }

    fn wake(&self) {
        unsafe { &*self.sem_out }.wake();
    }

    fn read(&self, dst: &mut [u8]) -> bool {
        self.ring_in.read(dst)
    }

    fn read_size(&self) -> u32 {
        self.ring_in.read_size()
    }

    fn wait_secs(&self, secs: u32) -> bool {
        unsafe { &*self.sem_in }.wait_secs(secs)
    }
}
