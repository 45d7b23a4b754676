// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_ipc::SemState;

#[test]
fn wake_coalesces_across_many_posts() {
    let sem = SemState::new();
    for _ in 0..10 {
        sem.wake();
    }
    assert!(sem.wait_secs(0));
    assert!(!sem.wait_secs(0));
}

#[test]
fn wait_secs_times_out_promptly() {
    let sem = SemState::new();
    let start = Instant::now();
    assert!(!sem.wait_secs(0));
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn cross_thread_wake_unblocks_waiter() {
    let sem = Arc::new(SemState::new());
    let sem2 = Arc::clone(&sem);

    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        sem2.wake();
    });

    assert!(sem.wait_secs(2));
    handle.join().unwrap();
}
