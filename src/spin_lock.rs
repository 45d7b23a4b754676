// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Adaptive backoff shared by the semaphore's timed-wait loop: busy spin →
// CPU pause hint → thread yield → 1ms sleep.

#[inline]
fn adaptive_yield(k: &mut u32) {
    if *k < 4 {
        // busy spin
    } else if *k < 16 {
        std::hint::spin_loop();
    } else if *k < 32 {
        std::thread::yield_now();
    } else {
        std::thread::sleep(std::time::Duration::from_millis(1));
        return;
    }
    *k += 1;
}

pub(crate) fn adaptive_yield_pub(k: &mut u32) {
    adaptive_yield(k);
}
