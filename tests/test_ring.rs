// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Covers P1-P3 and the tiny-echo/wrap/overflow scenarios from spec.md §8.

use bridge_ipc::ring::{Ring, RingHeader};

fn make_ring(size: u32) -> (Vec<u8>, Ring) {
    let total = RingHeader::byte_size() + size as usize;
    let mut buf = vec![0u8; total];
    let header = buf.as_mut_ptr() as *mut RingHeader;
    let ring = unsafe { Ring::init(header, size) };
    (buf, ring)
}

// P1: ring round trip.
#[test]
fn tiny_echo_scenario() {
    let (_buf, ring) = make_ring(32);
    let port: u32 = 7;
    let size: u32 = 4;
    let format: u32 = 0;
    let payload = 0xDEADBEEFu32.to_ne_bytes();

    assert!(ring.write(&1u32.to_ne_bytes())); // msg_type = port_event
    assert!(ring.write(&port.to_ne_bytes()));
    assert!(ring.write(&size.to_ne_bytes()));
    assert!(ring.write(&format.to_ne_bytes()));
    assert!(ring.write(&payload));
    assert!(ring.commit());

    assert_eq!(ring.read_size(), 19);

    let mut fields = [0u8; 4];
    let mut out_port = [0u8; 4];
    let mut out_size = [0u8; 4];
    let mut out_format = [0u8; 4];
    let mut out_buf = [0u8; 4];
    assert!(ring.read(&mut fields));
    assert!(ring.read(&mut out_port));
    assert!(ring.read(&mut out_size));
    assert!(ring.read(&mut out_format));
    assert!(ring.read(&mut out_buf));

    assert_eq!(u32::from_ne_bytes(fields), 1);
    assert_eq!(u32::from_ne_bytes(out_port), 7);
    assert_eq!(u32::from_ne_bytes(out_size), 4);
    assert_eq!(u32::from_ne_bytes(out_format), 0);
    assert_eq!(out_buf, payload);
}

// P1 over 100 wraps.
#[test]
fn wrap_scenario_100_iterations() {
    let (_buf, ring) = make_ring(16);
    for i in 0..100u8 {
        let rec = [i, i.wrapping_add(1), i.wrapping_add(2), i.wrapping_add(3), i.wrapping_add(4), i.wrapping_add(5), i.wrapping_add(6)];
        assert!(ring.write(&rec));
        assert!(ring.commit());

        let mut out = [0u8; 7];
        assert!(ring.read(&mut out));
        assert_eq!(out, rec, "mismatch at iteration {i}");
    }
}

// P2: commit atomicity / overflow rollback scenario.
#[test]
fn overflow_rollback_scenario() {
    let (_buf, ring) = make_ring(16);
    let first = [1u8; 12];
    assert!(ring.write(&first));
    assert!(ring.commit());

    let second = [2u8; 12];
    assert!(!ring.write(&second));
    assert!(!ring.commit());

    assert_eq!(ring.read_size(), 12);
    let mut out = [0u8; 12];
    assert!(ring.read(&mut out));
    assert_eq!(out, first);

    assert!(ring.write(&[9, 9, 9, 9]));
    assert!(ring.commit());
    assert_eq!(ring.read_size(), 4);
}

// P3: full/empty symmetry.
#[test]
fn full_empty_symmetry_across_operations() {
    let (_buf, ring) = make_ring(64);
    assert_eq!(ring.read_size() + ring.write_size() + 1, ring.capacity());

    for i in 0..10u8 {
        let rec = [i; 5];
        assert!(ring.write(&rec));
        assert!(ring.commit());
        assert_eq!(ring.read_size() + ring.write_size() + 1, ring.capacity());
    }

    let mut out = [0u8; 5];
    while ring.read_size() > 0 {
        assert!(ring.read(&mut out));
        assert_eq!(ring.read_size() + ring.write_size() + 1, ring.capacity());
    }
}
