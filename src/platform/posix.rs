// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX shared-memory primitives (C1). Binary-compatible with
// `examples/original_source/src/ipc/ipc_shm.h`: `shm_open`+`ftruncate`+
// `mmap`, `/`-prefixed names, best-effort `mlock`.

use std::ffi::CString;
use std::io;
use std::ptr;

use crate::shm_name::make_posix_name;

/// `true` iff no segment of this name currently exists.
pub fn check(name: &str) -> bool {
    let posix_name = make_posix_name(name);
    let Ok(c_name) = CString::new(posix_name.as_bytes()) else {
        return false;
    };
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
    if fd < 0 {
        return true;
    }
    unsafe { libc::close(fd) };
    false
}

fn mmap_rw(fd: i32, size: usize) -> io::Result<*mut u8> {
    let mem = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if mem == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(mem as *mut u8)
}

fn best_effort_mlock(mem: *mut u8, size: usize) {
    unsafe { libc::mlock(mem as *const libc::c_void, size) };
}

pub struct ServerMapping {
    pub ptr: *mut u8,
    pub size: usize,
    posix_name: String,
}

unsafe impl Send for ServerMapping {}
unsafe impl Sync for ServerMapping {}

pub fn server_create(name: &str, size: usize, memlock: bool) -> io::Result<ServerMapping> {
    let posix_name = make_posix_name(name);
    let c_name = CString::new(posix_name.as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let fd = unsafe {
        libc::shm_open(
            c_name.as_ptr(),
            libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
            0o666,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
        let e = io::Error::last_os_error();
        unsafe {
            libc::close(fd);
            libc::shm_unlink(c_name.as_ptr());
        }
        return Err(e);
    }

    let mem = match mmap_rw(fd, size) {
        Ok(m) => m,
        Err(e) => {
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(e);
        }
    };
    unsafe { libc::close(fd) };

    if memlock {
        best_effort_mlock(mem, size);
    }

    Ok(ServerMapping {
        ptr: mem,
        size,
        posix_name,
    })
}

pub fn server_destroy(mapping: &ServerMapping) {
    unsafe { libc::munmap(mapping.ptr as *mut libc::c_void, mapping.size) };
    if let Ok(c_name) = CString::new(mapping.posix_name.as_bytes()) {
        unsafe { libc::shm_unlink(c_name.as_ptr()) };
    }
}

pub struct ClientMapping {
    pub ptr: *mut u8,
    pub size: usize,
}

unsafe impl Send for ClientMapping {}
unsafe impl Sync for ClientMapping {}

pub fn client_attach(name: &str, size: usize, memlock: bool) -> io::Result<ClientMapping> {
    let posix_name = make_posix_name(name);
    let c_name = CString::new(posix_name.as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    let mem = match mmap_rw(fd, size) {
        Ok(m) => m,
        Err(e) => {
            unsafe { libc::close(fd) };
            return Err(e);
        }
    };
    unsafe { libc::close(fd) };

    if memlock {
        best_effort_mlock(mem, size);
    }

    Ok(ClientMapping { ptr: mem, size })
}

pub fn client_detach(mapping: &ClientMapping) {
    unsafe { libc::munmap(mapping.ptr as *mut libc::c_void, mapping.size) };
}
