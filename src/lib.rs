// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Duplex shared-memory IPC substrate for bridging a foreign-toolkit plugin
// UI into a supervised child process: a named POSIX/Win32 segment, two
// lock-free SPSC byte rings, two cross-process wake primitives, and a thin
// message-framing layer on top.

pub mod error;
pub mod shm_name;

mod platform;

pub mod shm;
pub use shm::{check, ClientSegment, ServerSegment};

pub mod sem;
pub use sem::SemState;

pub mod ring;
pub use ring::{Ring, RingHeader};

pub mod process;
pub use process::ChildProcess;

pub mod endpoint;
pub use endpoint::{ChannelOps, EndpointClient, EndpointServer, DEFAULT_RBSIZE};

pub mod message;
pub use message::{MsgType, PortEvent, Received, UridTable};

mod spin_lock;

pub use error::{IpcError, Result};
