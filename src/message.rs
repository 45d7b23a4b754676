// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Message framing (C6): typed records layered on a channel endpoint, per
// spec.md §6's wire formats. Grounded on
// `examples/original_source/src/ui-server.c` (`lv2ui_port_event`,
// `lv2ui_idle`'s dispatch switch) and `src/ui-client.c` (`lv2ui_uris_add`,
// the synchronous URID round trip).

use std::collections::HashMap;

use crate::endpoint::ChannelOps;
use crate::error::log_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MsgType {
    Null = 0,
    PortEvent = 1,
    /// Reserved, not emitted — matches the original source exactly, which
    /// defines no payload or handler for it either.
    TouchEvent = 2,
    WindowId = 3,
    UridMapReq = 4,
    UridMapResp = 5,
}

impl MsgType {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Null),
            1 => Some(Self::PortEvent),
            2 => Some(Self::TouchEvent),
            3 => Some(Self::WindowId),
            4 => Some(Self::UridMapReq),
            5 => Some(Self::UridMapResp),
            _ => None,
        }
    }
}

/// A decoded control-port event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEvent {
    pub port_index: u32,
    pub format: u32,
    pub buffer: Vec<u8>,
}

/// A message received off the incoming ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    PortEvent(PortEvent),
    WindowId(u64),
    UridMapReq(String),
    UridMapResp(u32, String),
}

fn read_u32<C: ChannelOps>(chan: &C) -> Option<u32> {
    let mut buf = [0u8; 4];
    if chan.read(&mut buf) {
        Some(u32::from_ne_bytes(buf))
    } else {
        None
    }
}

fn read_u64<C: ChannelOps>(chan: &C) -> Option<u64> {
    let mut buf = [0u8; 8];
    if chan.read(&mut buf) {
        Some(u64::from_ne_bytes(buf))
    } else {
        None
    }
}

fn read_bytes<C: ChannelOps>(chan: &C, n: u32) -> Option<Vec<u8>> {
    let mut buf = vec![0u8; n as usize];
    if chan.read(&mut buf) {
        Some(buf)
    } else {
        None
    }
}

/// Drain every complete record currently readable, dispatching each to
/// `Received`. On any read failure mid-record this is a framing violation:
/// logs "ringbuffer data race" and stops draining, matching
/// `ui-server.c`/`ui-client.c`'s abort-the-consumer-loop behaviour exactly
/// (the protocol never attempts to resynchronise within a ring).
pub fn drain<C: ChannelOps>(chan: &C, out: &mut Vec<Received>) -> bool {
    while chan.read_size() != 0 {
        let Some(msg_type) = read_u32(chan).and_then(MsgType::from_u32) else {
            log_line!("ringbuffer data race, abort");
            return false;
        };

        let ok = match msg_type {
            MsgType::PortEvent => (|| {
                let port_index = read_u32(chan)?;
                let buffer_size = read_u32(chan)?;
                let format = read_u32(chan)?;
                let buffer = read_bytes(chan, buffer_size)?;
                out.push(Received::PortEvent(PortEvent {
                    port_index,
                    format,
                    buffer,
                }));
                Some(())
            })(),
            MsgType::WindowId => (|| {
                let window_id = read_u64(chan)?;
                out.push(Received::WindowId(window_id));
                Some(())
            })(),
            MsgType::UridMapReq => (|| {
                let uri_size = read_u32(chan)?;
                let bytes = read_bytes(chan, uri_size)?;
                let uri = String::from_utf8(bytes).ok()?;
                out.push(Received::UridMapReq(uri));
                Some(())
            })(),
            MsgType::UridMapResp => (|| {
                let urid = read_u32(chan)?;
                let uri_size = read_u32(chan)?;
                let bytes = read_bytes(chan, uri_size)?;
                let uri = String::from_utf8(bytes).ok()?;
                out.push(Received::UridMapResp(urid, uri));
                Some(())
            })(),
            MsgType::Null | MsgType::TouchEvent => None,
        };

        if ok.is_none() {
            log_line!("ringbuffer data race, abort");
            return false;
        }
    }
    true
}

/// Send a `port_event` record: type tag, three u32 fields, then the raw
/// buffer. Rolls back silently on a staging failure via `commit`'s
/// `invalidate_commit` path.
pub fn send_port_event<C: ChannelOps>(chan: &C, port_index: u32, format: u32, buffer: &[u8]) {
    let msg_type = (MsgType::PortEvent as u32).to_ne_bytes();
    let buffer_size = (buffer.len() as u32).to_ne_bytes();
    chan.write(&msg_type)
        && chan.write(&port_index.to_ne_bytes())
        && chan.write(&buffer_size)
        && chan.write(&format.to_ne_bytes())
        && chan.write(buffer);
    chan.commit();
}

pub fn send_window_id<C: ChannelOps>(chan: &C, window_id: u64) {
    let msg_type = (MsgType::WindowId as u32).to_ne_bytes();
    chan.write(&msg_type) && chan.write(&window_id.to_ne_bytes());
    chan.commit();
}

pub fn send_urid_map_req<C: ChannelOps>(chan: &C, uri: &str) {
    let msg_type = (MsgType::UridMapReq as u32).to_ne_bytes();
    let uri_size = (uri.len() as u32).to_ne_bytes();
    chan.write(&msg_type) && chan.write(&uri_size) && chan.write(uri.as_bytes());
    chan.commit();
}

pub fn send_urid_map_resp<C: ChannelOps>(chan: &C, urid: u32, uri: &str) {
    let msg_type = (MsgType::UridMapResp as u32).to_ne_bytes();
    let uri_size = (uri.len() as u32).to_ne_bytes();
    chan.write(&msg_type)
        && chan.write(&urid.to_ne_bytes())
        && chan.write(&uri_size)
        && chan.write(uri.as_bytes());
    chan.commit();
}

/// Bidirectional URI↔URID interning table, maintained independently by each
/// endpoint. Grounded on `ui-client.c`'s `lv2ui_uris_add`, which grows a
/// flat array and fills gaps with a linear scan; expressed here as a safe
/// `HashMap` plus reverse `Vec`.
#[derive(Default)]
pub struct UridTable {
    by_uri: HashMap<String, u32>,
    by_urid: Vec<Option<String>>,
}

impl UridTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `uri` under `urid`, as reported by a `urid_map_resp`.
    pub fn insert(&mut self, urid: u32, uri: &str) {
        self.by_uri.insert(uri.to_string(), urid);
        let idx = urid as usize;
        if self.by_urid.len() <= idx {
            self.by_urid.resize(idx + 1, None);
        }
        self.by_urid[idx] = Some(uri.to_string());
    }

    pub fn urid_of(&self, uri: &str) -> Option<u32> {
        self.by_uri.get(uri).copied()
    }

    pub fn uri_of(&self, urid: u32) -> Option<&str> {
        self.by_urid.get(urid as usize)?.as_deref()
    }
}

/// Synchronous client-side URID map round trip: send the request, then
/// loop `wait_secs(1) → drain` until a matching response has interned the
/// URI. Logs "uri map failed" if the loop exits without a result, matching
/// `ui-client.c`'s one unstructured failure path.
pub fn request_urid_blocking<C: ChannelOps>(chan: &C, table: &mut UridTable, uri: &str) -> Option<u32> {
    if let Some(existing) = table.urid_of(uri) {
        return Some(existing);
    }

    send_urid_map_req(chan, uri);
    chan.wake();

    let mut received = Vec::new();
    loop {
        if !chan.wait_secs(1) {
            log_line!("uri map failed");
            return None;
        }
        received.clear();
        if !drain(chan, &mut received) {
            log_line!("uri map failed");
            return None;
        }
        for msg in received.drain(..) {
            if let Received::UridMapResp(urid, resp_uri) = msg {
                table.insert(urid, &resp_uri);
                if resp_uri == uri {
                    return Some(urid);
                }
            }
        }
        if let Some(urid) = table.urid_of(uri) {
            return Some(urid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{Ring, RingHeader};
    use std::cell::Cell;

    struct LoopbackChannel {
        ring: Ring,
        woken: Cell<bool>,
        _buf: Vec<u8>,
    }

    impl LoopbackChannel {
        fn new(size: u32) -> Self {
            let total = RingHeader::byte_size() + size as usize;
            let mut buf = vec![0u8; total];
            let header = buf.as_mut_ptr() as *mut RingHeader;
            let ring = unsafe { Ring::init(header, size) };
            Self {
                ring,
                woken: Cell::new(false),
                _buf: buf,
            }
        }
    }

    impl ChannelOps for LoopbackChannel {
        fn write(&self, src: &[u8]) -> bool {
            self.ring.write(src)
        }
        fn commit(&self) -> bool {
            self.ring.commit()
        }
        fn wake(&self) {
            self.woken.set(true);
        }
        fn read(&self, dst: &mut [u8]) -> bool {
            self.ring.read(dst)
        }
        fn read_size(&self) -> u32 {
            self.ring.read_size()
        }
        fn wait_secs(&self, _secs: u32) -> bool {
            true
        }
    }

    #[test]
    fn tiny_echo_port_event() {
        let chan = LoopbackChannel::new(32);
        send_port_event(&chan, 7, 0, &0xDEADBEEFu32.to_ne_bytes());
        assert_eq!(chan.read_size(), 19);

        let mut out = Vec::new();
        assert!(drain(&chan, &mut out));
        assert_eq!(out.len(), 1);
        match &out[0] {
            Received::PortEvent(ev) => {
                assert_eq!(ev.port_index, 7);
                assert_eq!(ev.format, 0);
                assert_eq!(ev.buffer, 0xDEADBEEFu32.to_ne_bytes());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn synchronous_urid_map_scenario() {
        let chan = LoopbackChannel::new(256);
        let mut table = UridTable::new();

        // Simulate the server's deterministic response arriving in the
        // same ring before the client drains (loopback has one ring).
        send_urid_map_req(&chan, "http://x");
        let mut received = Vec::new();
        assert!(drain(&chan, &mut received));
        assert_eq!(received, vec![Received::UridMapReq("http://x".to_string())]);

        send_urid_map_resp(&chan, 42, "http://x");
        let urid = request_urid_blocking(&chan, &mut table, "http://x");
        assert_eq!(urid, Some(42));
        assert_eq!(table.urid_of("http://x"), Some(42));
        assert_eq!(table.uri_of(42), Some("http://x"));
    }

    #[test]
    fn window_id_round_trip() {
        let chan = LoopbackChannel::new(32);
        send_window_id(&chan, 0xCAFEBABEu64);
        let mut out = Vec::new();
        assert!(drain(&chan, &mut out));
        assert_eq!(out, vec![Received::WindowId(0xCAFEBABE)]);
    }

    #[test]
    fn duplex_distinct_streams_in_order() {
        let chan = LoopbackChannel::new(512);
        for i in 0..20u32 {
            send_port_event(&chan, i, 0, &i.to_ne_bytes());
        }
        let mut out = Vec::new();
        assert!(drain(&chan, &mut out));
        assert_eq!(out.len(), 20);
        for (i, msg) in out.iter().enumerate() {
            match msg {
                Received::PortEvent(ev) => assert_eq!(ev.port_index, i as u32),
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}
