#![allow(dead_code)]
//! Test harness utilities for soundnav-core integration tests.

use std::net::UdpSocket;
use std::time::Duration;

use rosc::{OscPacket, OscType};
use soundnav_core::geometry::Matrix4;
use soundnav_core::mapping::InstrumentTable;
use soundnav_core::scene::TransformScene;
use soundnav_core::ConnectionManager;
use soundnav_types::{Endpoint, InstrumentSlot};

/// Loopback UDP socket standing in for the synthesis server.
pub struct OscReceiver {
    socket: UdpSocket,
}

impl OscReceiver {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Self { socket }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.socket.local_addr().unwrap().port())
    }

    /// Receive one datagram and decode it as a single-float message.
    pub fn recv(&self) -> (String, f32) {
        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = self.socket.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => match msg.args.as_slice() {
                [OscType::Float(value)] => (msg.addr, *value),
                other => panic!("Expected one float argument, got {:?}", other),
            },
            other => panic!("Expected Message, got {:?}", other),
        }
    }

    pub fn recv_n(&self, n: usize) -> Vec<(String, f32)> {
        (0..n).map(|_| self.recv()).collect()
    }

    /// True when nothing arrives within `wait`.
    pub fn is_quiet(&self, wait: Duration) -> bool {
        self.socket.set_read_timeout(Some(wait)).unwrap();
        let mut buf = [0u8; rosc::decoder::MTU];
        let quiet = self.socket.recv_from(&mut buf).is_err();
        self.socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        quiet
    }
}

/// Scene with one `Tool` transform, mapped to slot 0 as "Tool".
pub fn tool_setup(to_world: Matrix4) -> (ConnectionManager<TransformScene>, InstrumentTable) {
    let mut scene = TransformScene::new();
    let tool = scene.add_transform("Tool", to_world);
    let mut table = InstrumentTable::default();
    table.set_slot(0, InstrumentSlot::new("Tool", tool)).unwrap();
    (ConnectionManager::udp(scene), table)
}

/// Move a transform and deliver the resulting notifications.
pub fn move_transform(manager: &mut ConnectionManager<TransformScene>, name: &str, to_parent: Matrix4) -> usize {
    let id = manager.host().find(name).unwrap();
    let tokens = manager.host_mut().set_matrix(id, to_parent).unwrap();
    tokens
        .into_iter()
        .map(|token| manager.handle_notification(token).sent)
        .sum()
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {}, got {}",
        expected,
        actual
    );
}
