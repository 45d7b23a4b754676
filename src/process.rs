// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Child-process supervisor (C4). Grounded on
// `examples/original_source/src/ipc/ipc_proc.h`: `vfork`+`execvp` on POSIX,
// `CreateProcessW` with a hand-quoted UTF-16 command line on Windows, and a
// two-phase terminate (poll exited, then SIGTERM/TerminateProcess, then
// poll every 5ms) for `stop`.

use std::cell::Cell;
use std::ffi::CString;
use std::io;
use std::time::Duration;

use crate::error::{log_line, IpcError, Result};

/// A spawned child process bound to a channel.
pub struct ChildProcess {
    pid: u32,
    exited: Cell<bool>,
    #[cfg(windows)]
    handle: windows_sys::Win32::Foundation::HANDLE,
}

// Safety: the handle/pid are only ever touched through `&self` methods that
// take care not to race (this crate's child process has exactly one
// supervisor thread per spec.md §5).
unsafe impl Send for ChildProcess {}
unsafe impl Sync for ChildProcess {}

impl ChildProcess {
    /// Spawn `argv[0]` with the given argument vector.
    pub fn start(argv: &[&str]) -> Result<Self> {
        if argv.is_empty() {
            return Err(IpcError::SpawnFailed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty argv",
            )));
        }

        #[cfg(unix)]
        {
            Self::start_posix(argv)
        }
        #[cfg(windows)]
        {
            Self::start_windows(argv)
        }
    }

    #[cfg(unix)]
    fn start_posix(argv: &[&str]) -> Result<Self> {
        let c_args: Vec<CString> = argv
            .iter()
            .map(|a| CString::new(*a).expect("argv entry contains NUL"))
            .collect();
        let mut arg_ptrs: Vec<*const libc::c_char> =
            c_args.iter().map(|c| c.as_ptr()).collect();
        arg_ptrs.push(std::ptr::null());

        let pid = unsafe { libc::vfork() };
        match pid {
            0 => {
                unsafe {
                    libc::execvp(arg_ptrs[0], arg_ptrs.as_ptr());
                    log_line!("exec failed: {}", io::Error::last_os_error());
                    libc::_exit(1);
                }
            }
            -1 => {
                let e = io::Error::last_os_error();
                log_line!("vfork failed: {e}");
                Err(IpcError::SpawnFailed(e))
            }
            _ => Ok(Self {
                pid: pid as u32,
                exited: Cell::new(false),
            }),
        }
    }

    #[cfg(windows)]
    fn start_windows(argv: &[&str]) -> Result<Self> {
        use windows_sys::Win32::Foundation::*;
        use windows_sys::Win32::System::Threading::*;

        let cmdline = quote_command_line(argv);
        let mut wide: Vec<u16> = cmdline.encode_utf16().chain(std::iter::once(0)).collect();

        let mut si: STARTUPINFOW = unsafe { std::mem::zeroed() };
        si.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
        let mut pi: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };

        let ok = unsafe {
            CreateProcessW(
                std::ptr::null(),
                wide.as_mut_ptr(),
                std::ptr::null(),
                std::ptr::null(),
                TRUE,
                0,
                std::ptr::null(),
                std::ptr::null(),
                &si,
                &mut pi,
            )
        };
        if ok == 0 {
            let e = io::Error::last_os_error();
            log_line!("CreateProcess failed: {e}");
            return Err(IpcError::SpawnFailed(e));
        }

        unsafe { CloseHandle(pi.hThread) };

        Ok(Self {
            pid: pi.dwProcessId,
            exited: Cell::new(false),
            handle: pi.hProcess,
        })
    }

    /// The OS process id of the spawned child.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking check of whether the child is still running. Once an
    /// exit has been observed, permanently returns `false` without
    /// re-probing the OS.
    pub fn is_running(&self) -> bool {
        if self.exited.get() {
            return false;
        }

        #[cfg(unix)]
        {
            let ret = unsafe { libc::waitpid(self.pid as libc::pid_t, std::ptr::null_mut(), libc::WNOHANG) };
            if ret == self.pid as libc::pid_t {
                self.exited.set(true);
                return false;
            }
            if ret == -1 {
                let e = io::Error::last_os_error();
                if e.raw_os_error() == Some(libc::ECHILD) {
                    self.exited.set(true);
                    return false;
                }
            }
            true
        }

        #[cfg(windows)]
        {
            use windows_sys::Win32::Foundation::*;
            use windows_sys::Win32::System::Threading::*;

            let mut code: u32 = 0;
            let ok = unsafe { GetExitCodeProcess(self.handle, &mut code) };
            if ok == 0 || code != STILL_ACTIVE || unsafe { WaitForSingleObject(self.handle, 0) } != WAIT_TIMEOUT {
                self.exited.set(true);
                unsafe { CloseHandle(self.handle) };
                return false;
            }
            true
        }
    }

    /// Two-phase terminate with grace: poll for already-exited, then send a
    /// terminate signal and poll every 5ms until reaped.
    pub fn stop(&self) {
        let mut should_terminate = true;

        #[cfg(unix)]
        loop {
            if self.exited.get() {
                return;
            }
            let ret = unsafe { libc::waitpid(self.pid as libc::pid_t, std::ptr::null_mut(), libc::WNOHANG) };
            if ret == self.pid as libc::pid_t {
                self.exited.set(true);
                return;
            }
            if ret == -1 {
                let e = io::Error::last_os_error();
                if e.raw_os_error() == Some(libc::ECHILD) {
                    self.exited.set(true);
                    return;
                }
                log_line!("waitpid failed: {e}");
                return;
            }
            if should_terminate {
                should_terminate = false;
                unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGTERM) };
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        #[cfg(windows)]
        {
            use windows_sys::Win32::Foundation::*;
            use windows_sys::Win32::System::Threading::*;

            loop {
                if self.exited.get() {
                    return;
                }
                let mut code: u32 = 0;
                let ok = unsafe { GetExitCodeProcess(self.handle, &mut code) };
                if ok == 0 || code != STILL_ACTIVE || unsafe { WaitForSingleObject(self.handle, 0) } != WAIT_TIMEOUT {
                    self.exited.set(true);
                    unsafe { CloseHandle(self.handle) };
                    return;
                }
                if should_terminate {
                    should_terminate = false;
                    unsafe { TerminateProcess(self.handle, ERROR_BROKEN_PIPE) };
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    /// Terminate-with-grace, then block until the child is fully reaped.
    /// `grace` is currently advisory — the 5ms poll cadence of `stop`
    /// already bounds wall-clock latency; kept as a parameter for API
    /// parity with `examples/original_source`'s shutdown path.
    pub fn shutdown(&self, _grace: Duration) {
        self.stop();
    }
}

#[cfg(windows)]
fn quote_command_line(argv: &[&str]) -> String {
    let mut cmd = String::new();
    for (i, arg) in argv.iter().enumerate() {
        if i != 0 {
            cmd.push(' ');
        }
        let needs_quotes = !arg.starts_with('"') && arg.contains(' ');
        if needs_quotes {
            cmd.push('"');
        }
        cmd.push_str(arg);
        if needs_quotes {
            cmd.push('"');
        }
    }
    cmd
}
