// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

#[cfg(unix)]
pub mod posix;

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use posix::{check, client_attach, client_detach, server_create, server_destroy, ClientMapping, ServerMapping};

#[cfg(windows)]
pub use windows::{check, client_attach, client_detach, server_create, server_destroy, ClientMapping, ServerMapping};
