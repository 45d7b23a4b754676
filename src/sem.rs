// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-process wake primitive (C2), embedded directly inside the shared
// segment next to the rings it guards. Grounded on
// `examples/original_source/src/ipc/ipc_sem.h`: a real process-shared POSIX
// semaphore (`sem_init(..., pshared=1, ...)`/`sem_post`/`sem_timedwait`) on
// the generic POSIX path, an inheritable Win32 `CreateSemaphoreW` handle on
// Windows. A companion `AtomicU32` gates `wake` so a second post while the
// first token is still unconsumed is a true no-op rather than a second
// kernel token — the original's raw `sem_post` fallback is a counting
// semaphore and does not have this property on its own, but spec.md P4
// ("wake coalescing") requires it. macOS lacks a working timed wait on
// unnamed `sem_t` (`sem_init` with `pshared=1` is unsupported there), so
// that one platform falls back to the CAS-plus-backoff poll
// `platform/posix.rs`'s `lock_timeout` already uses for the same reason —
// not a general substitute for blocking.

#[cfg(all(unix, not(target_os = "macos")))]
mod imp {
    use std::cell::UnsafeCell;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::log_line;

    #[repr(C)]
    pub struct SemState {
        word: AtomicU32,
        sem: UnsafeCell<libc::sem_t>,
    }

    unsafe impl Send for SemState {}
    unsafe impl Sync for SemState {}

    impl SemState {
        pub fn new() -> Self {
            let s = Self {
                word: AtomicU32::new(0),
                sem: UnsafeCell::new(unsafe { std::mem::zeroed() }),
            };
            s.init();
            s
        }

        fn ptr(&self) -> *mut libc::sem_t {
            self.sem.get()
        }

        pub fn init(&self) {
            self.word.store(0, Ordering::Relaxed);
            if unsafe { libc::sem_init(self.ptr(), 1, 0) } != 0 {
                log_line!("sem_init failed: {}", io::Error::last_os_error());
            }
        }

        /// Post one token, coalescing: a no-op if the previous token hasn't
        /// been consumed yet.
        pub fn wake(&self) {
            if self.word.compare_exchange(0, 1, Ordering::Release, Ordering::Relaxed).is_ok() {
                unsafe { libc::sem_post(self.ptr()) };
            }
        }

        pub fn try_wait(&self) -> bool {
            if unsafe { libc::sem_trywait(self.ptr()) } == 0 {
                self.word.store(0, Ordering::Relaxed);
                true
            } else {
                false
            }
        }

        pub fn wait_secs(&self, secs: u32) -> bool {
            let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
            unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
            ts.tv_sec += secs as libc::time_t;
            loop {
                let ret = unsafe { libc::sem_timedwait(self.ptr(), &ts) };
                if ret == 0 {
                    self.word.store(0, Ordering::Relaxed);
                    return true;
                }
                match io::Error::last_os_error().raw_os_error() {
                    Some(libc::EINTR) => continue,
                    _ => return false,
                }
            }
        }
    }

    impl Drop for SemState {
        fn drop(&mut self) {
            unsafe { libc::sem_destroy(self.ptr()) };
        }
    }
}

#[cfg(target_os = "macos")]
mod imp {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    use crate::spin_lock::adaptive_yield_pub;

    const NO_TOKEN: u32 = 0;
    const TOKEN: u32 = 1;

    #[repr(C)]
    pub struct SemState {
        word: AtomicU32,
    }

    unsafe impl Send for SemState {}
    unsafe impl Sync for SemState {}

    impl SemState {
        pub fn new() -> Self {
            Self {
                word: AtomicU32::new(NO_TOKEN),
            }
        }

        pub fn init(&self) {
            self.word.store(NO_TOKEN, Ordering::Relaxed);
        }

        pub fn wake(&self) {
            self.word.store(TOKEN, Ordering::Release);
        }

        pub fn try_wait(&self) -> bool {
            self.word
                .compare_exchange(TOKEN, NO_TOKEN, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        }

        pub fn wait_secs(&self, secs: u32) -> bool {
            let deadline = Instant::now() + Duration::from_secs(secs as u64);
            let mut k = 0u32;
            loop {
                if self.try_wait() {
                    return true;
                }
                if Instant::now() >= deadline {
                    return false;
                }
                adaptive_yield_pub(&mut k);
            }
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::UnsafeCell;
    use std::io;
    use std::ptr;
    use std::sync::atomic::{AtomicU32, Ordering};

    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, TRUE, WAIT_OBJECT_0};
    use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
    use windows_sys::Win32::System::Threading::{
        CreateSemaphoreW, ReleaseSemaphore, WaitForSingleObject,
    };

    use crate::error::log_line;

    #[repr(C)]
    pub struct SemState {
        word: AtomicU32,
        handle: UnsafeCell<HANDLE>,
    }

    unsafe impl Send for SemState {}
    unsafe impl Sync for SemState {}

    impl SemState {
        pub fn new() -> Self {
            let s = Self {
                word: AtomicU32::new(0),
                handle: UnsafeCell::new(0),
            };
            s.init();
            s
        }

        fn handle(&self) -> HANDLE {
            unsafe { *self.handle.get() }
        }

        /// Create an inheritable anonymous semaphore. Must run before the
        /// child process is spawned so it inherits the handle value.
        pub fn init(&self) {
            self.word.store(0, Ordering::Relaxed);
            let mut sa = SECURITY_ATTRIBUTES {
                nLength: std::mem::size_of::<SECURITY_ATTRIBUTES>() as u32,
                lpSecurityDescriptor: ptr::null_mut(),
                bInheritHandle: TRUE,
            };
            let h = unsafe { CreateSemaphoreW(&mut sa, 0, i32::MAX, ptr::null()) };
            if h == 0 {
                log_line!("CreateSemaphore failed: {}", io::Error::last_os_error());
            }
            unsafe { *self.handle.get() = h };
        }

        /// Post one token, coalescing: a no-op if the previous token hasn't
        /// been consumed yet.
        pub fn wake(&self) {
            if self.word.compare_exchange(0, 1, Ordering::Release, Ordering::Relaxed).is_ok() {
                unsafe { ReleaseSemaphore(self.handle(), 1, ptr::null_mut()) };
            }
        }

        pub fn try_wait(&self) -> bool {
            if unsafe { WaitForSingleObject(self.handle(), 0) } == WAIT_OBJECT_0 {
                self.word.store(0, Ordering::Relaxed);
                true
            } else {
                false
            }
        }

        pub fn wait_secs(&self, secs: u32) -> bool {
            if unsafe { WaitForSingleObject(self.handle(), secs.saturating_mul(1000)) } == WAIT_OBJECT_0 {
                self.word.store(0, Ordering::Relaxed);
                true
            } else {
                false
            }
        }
    }

    impl Drop for SemState {
        fn drop(&mut self) {
            let h = self.handle();
            if h != 0 {
                unsafe { CloseHandle(h) };
            }
        }
    }
}

pub use imp::SemState;

impl Default for SemState {
    fn default() -> Self {
        Self::new()
    }
}
