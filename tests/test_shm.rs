// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Rust port of cpp-ipc/test/test_shm.cpp, adapted to this crate's
// owned/borrowed segment split (`ServerSegment` / `ClientSegment`).

use std::sync::atomic::{AtomicUsize, Ordering};

use bridge_ipc::{check, ClientSegment, ServerSegment};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{n}")
}

#[test]
fn server_create_then_client_attach() {
    let name = unique_name("attach");
    let server = ServerSegment::create(&name, 1024, false).expect("server create");
    assert_eq!(server.size(), 1024);
    assert_ne!(server.as_ptr() as usize, 0);

    let client = ClientSegment::attach(&name, 1024, false).expect("client attach");
    assert_eq!(client.size(), 1024);
}

#[test]
fn check_reflects_segment_lifetime() {
    let name = unique_name("check");
    assert!(check(&name));

    let server = ServerSegment::create(&name, 256, false).expect("create");
    assert!(!check(&name));

    drop(server);
    assert!(check(&name));
}

#[test]
fn client_attach_before_create_fails() {
    let name = unique_name("attach_missing");
    assert!(ClientSegment::attach(&name, 256, false).is_err());
}

#[test]
fn server_create_twice_fails() {
    let name = unique_name("twice");
    let _h1 = ServerSegment::create(&name, 256, false).expect("first create");
    let result = ServerSegment::create(&name, 256, false);
    assert!(result.is_err(), "exclusive create should fail when segment already exists");
}

#[test]
fn write_through_server_visible_to_client() {
    let name = unique_name("write_visible");
    let server = ServerSegment::create(&name, 512, false).expect("create");
    let client = ClientSegment::attach(&name, 512, false).expect("attach");

    let payload = b"shared memory test data";
    unsafe {
        std::ptr::copy_nonoverlapping(payload.as_ptr(), server.as_ptr(), payload.len());
    }
    let read_back = unsafe { std::slice::from_raw_parts(client.as_ptr(), payload.len()) };
    assert_eq!(read_back, payload);
}

#[test]
fn client_detach_does_not_unlink() {
    let name = unique_name("detach_keeps");
    let server = ServerSegment::create(&name, 256, false).expect("create");
    let client = ClientSegment::attach(&name, 256, false).expect("attach");
    drop(client);

    // The name is still live — server owns it.
    assert!(!check(&name));
    drop(server);
    assert!(check(&name));
}

#[test]
fn empty_name_fails() {
    assert!(ServerSegment::create("", 256, false).is_err());
}

#[test]
fn zero_size_fails() {
    assert!(ServerSegment::create("zero_size_test", 0, false).is_err());
}

#[test]
fn various_sizes_create_successfully() {
    for &size in &[1usize, 16, 64, 255, 256, 1023, 1024, 4096, 65536] {
        let name = unique_name(&format!("size_{size}"));
        let server = ServerSegment::create(&name, size, false)
            .unwrap_or_else(|e| panic!("failed to create segment of size {size}: {e}"));
        assert_eq!(server.size(), size);
    }
}

#[test]
fn large_segment_pattern_write_read() {
    let name = unique_name("large_segment");
    let size = 1024 * 1024;
    let server = ServerSegment::create(&name, size, false).expect("create 1MB");

    unsafe {
        let mem = server.as_ptr();
        for i in 0..1024 {
            *mem.add(i) = (i % 256) as u8;
        }
        for i in 0..1024 {
            assert_eq!(*mem.add(i), (i % 256) as u8, "mismatch at byte {i}");
        }
    }
}
