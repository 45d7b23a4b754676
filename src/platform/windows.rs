// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Win32 shared-memory primitives (C1). Binary-compatible with
// `examples/original_source/src/ipc/ipc_shm.h`: `CreateFileMappingW`+
// `MapViewOfFile`, `Local\`-prefixed names, best-effort `VirtualLock`.
// The backing store is the system pagefile, so there is no unlink step —
// the kernel object is reclaimed when the last handle closes.

use std::io;
use std::ptr;

use crate::shm_name::make_win32_name;

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// `true` iff no segment of this name currently exists.
pub fn check(name: &str) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, FALSE};
    use windows_sys::Win32::System::Memory::{OpenFileMappingW, FILE_MAP_ALL_ACCESS};

    let wide_name = to_wide(&make_win32_name(name));
    let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
    if handle == 0 {
        return true;
    }
    unsafe { CloseHandle(handle) };
    false
}

pub struct ServerMapping {
    pub ptr: *mut u8,
    pub size: usize,
    handle: windows_sys::Win32::Foundation::HANDLE,
}

unsafe impl Send for ServerMapping {}
unsafe impl Sync for ServerMapping {}

pub fn server_create(name: &str, size: usize, memlock: bool) -> io::Result<ServerMapping> {
    use windows_sys::Win32::Foundation::*;
    use windows_sys::Win32::System::Memory::*;
    use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;

    let wide_name = to_wide(&make_win32_name(name));
    let mut sa = SECURITY_ATTRIBUTES {
        nLength: std::mem::size_of::<SECURITY_ATTRIBUTES>() as u32,
        lpSecurityDescriptor: ptr::null_mut(),
        bInheritHandle: TRUE,
    };

    let handle = unsafe {
        CreateFileMappingW(
            INVALID_HANDLE_VALUE,
            &mut sa,
            PAGE_READWRITE | SEC_COMMIT,
            0,
            size as u32,
            wide_name.as_ptr(),
        )
    };
    let err = unsafe { GetLastError() };
    if err == ERROR_ALREADY_EXISTS {
        if handle != 0 {
            unsafe { CloseHandle(handle) };
        }
        return Err(io::Error::new(io::ErrorKind::AlreadyExists, "segment exists"));
    }
    if handle == 0 {
        return Err(io::Error::last_os_error());
    }

    let mem = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
    if mem.is_null() {
        let e = io::Error::last_os_error();
        unsafe { CloseHandle(handle) };
        return Err(e);
    }

    if memlock {
        unsafe { VirtualLock(mem as *const _ as *mut _, size) };
    }

    Ok(ServerMapping {
        ptr: mem as *mut u8,
        size,
        handle,
    })
}

pub fn server_destroy(mapping: &ServerMapping) {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Memory::UnmapViewOfFile;

    unsafe {
        UnmapViewOfFile(mapping.ptr as *const _);
        CloseHandle(mapping.handle);
    }
}

pub struct ClientMapping {
    pub ptr: *mut u8,
    pub size: usize,
    handle: windows_sys::Win32::Foundation::HANDLE,
}

unsafe impl Send for ClientMapping {}
unsafe impl Sync for ClientMapping {}

pub fn client_attach(name: &str, size: usize, memlock: bool) -> io::Result<ClientMapping> {
    use windows_sys::Win32::Foundation::*;
    use windows_sys::Win32::System::Memory::*;

    let wide_name = to_wide(&make_win32_name(name));
    let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
    if handle == 0 {
        return Err(io::Error::last_os_error());
    }

    let mem = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, size) };
    if mem.is_null() {
        let e = io::Error::last_os_error();
        unsafe { CloseHandle(handle) };
        return Err(e);
    }

    if memlock {
        unsafe { VirtualLock(mem as *const _ as *mut _, size) };
    }

    Ok(ClientMapping {
        ptr: mem as *mut u8,
        size,
        handle,
    })
}

pub fn client_detach(mapping: &ClientMapping) {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Memory::UnmapViewOfFile;

    unsafe {
        UnmapViewOfFile(mapping.ptr as *const _);
        CloseHandle(mapping.handle);
    }
}
