mod common;

use std::time::Duration;

use common::{assert_close, move_transform, tool_setup, OscReceiver};
use soundnav_core::geometry::Matrix4;
use soundnav_core::mapping::InstrumentTable;
use soundnav_core::scene::TransformScene;
use soundnav_core::ConnectionManager;
use soundnav_types::{ConnectionState, InstrumentSlot};

#[test]
fn test_transform_values_reach_server() {
    let receiver = OscReceiver::bind();
    let (mut manager, table) = tool_setup(Matrix4::IDENTITY);
    manager.connect(&receiver.endpoint()).unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();

    let sent = move_transform(&mut manager, "Tool", Matrix4::from_translation(1.0, 2.0, 3.0));
    assert_eq!(sent, 8);

    let received = receiver.recv_n(8);
    let addresses: Vec<&str> = received.iter().map(|(addr, _)| addr.as_str()).collect();
    assert_eq!(
        addresses,
        vec![
            "/SoundNav/Tool/TranslationX",
            "/SoundNav/Tool/TranslationY",
            "/SoundNav/Tool/TranslationZ",
            "/SoundNav/Tool/Distance",
            "/SoundNav/Tool/OrientationX",
            "/SoundNav/Tool/OrientationY",
            "/SoundNav/Tool/OrientationZ",
            "/SoundNav/Tool/Orientation",
        ]
    );
    let values: Vec<f32> = received.iter().map(|(_, v)| *v).collect();
    assert_close(values[0], 1.0);
    assert_close(values[1], 2.0);
    assert_close(values[2], 3.0);
    assert_close(values[3], 14f32.sqrt());
    for value in &values[4..] {
        assert_close(*value, 0.0);
    }
}

#[test]
fn test_orientation_is_sent_in_degrees() {
    let receiver = OscReceiver::bind();
    let (mut manager, table) = tool_setup(Matrix4::IDENTITY);
    manager.connect(&receiver.endpoint()).unwrap();
    manager.start_transmission(&table, "/SoundNav/").unwrap();

    move_transform(&mut manager, "Tool", Matrix4::rotation_z(90.0));
    let received = receiver.recv_n(8);
    assert_eq!(received[6].0, "/SoundNav/Tool/OrientationZ");
    assert_close(received[6].1, 90.0);
    assert_eq!(received[7].0, "/SoundNav/Tool/Orientation");
    assert_close(received[7].1, 90.0);
}

#[test]
fn test_breach_warning_sends_single_distance() {
    let receiver = OscReceiver::bind();
    let mut scene = TransformScene::new();
    let needle = scene.add_breach("Needle", 2.0);
    let mut table = InstrumentTable::default();
    table.set_slot(1, InstrumentSlot::new("Warning", needle)).unwrap();

    let mut manager = ConnectionManager::udp(scene);
    manager.connect(&receiver.endpoint()).unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();

    let tokens = manager.host_mut().set_signed_distance(needle, -0.5).unwrap();
    for token in tokens {
        manager.handle_notification(token);
    }
    let (addr, value) = receiver.recv();
    assert_eq!(addr, "/SoundNav/Warning/Distance");
    assert_close(value, -0.5);
    assert!(receiver.is_quiet(Duration::from_millis(100)));
}

#[test]
fn test_reference_frame_moves_with_parent() {
    let receiver = OscReceiver::bind();
    let mut scene = TransformScene::new();
    let patient = scene.add_transform("Patient", Matrix4::from_translation(10.0, 0.0, 0.0));
    let tool = scene.add_transform("Tool", Matrix4::from_translation(13.0, 4.0, 0.0));
    let mut table = InstrumentTable::default();
    table
        .set_slot(0, InstrumentSlot::new("Tool", tool).with_reference(patient))
        .unwrap();

    let mut manager = ConnectionManager::udp(scene);
    manager.connect(&receiver.endpoint()).unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();

    // Moving only the reference still produces an update for the tool.
    move_transform(&mut manager, "Patient", Matrix4::from_translation(12.0, 0.0, 0.0));
    let received = receiver.recv_n(8);
    assert_close(received[0].1, 1.0);
    assert_close(received[1].1, 4.0);
    assert_close(received[3].1, 17f32.sqrt());
}

#[test]
fn test_reconnect_redirects_stream() {
    let first = OscReceiver::bind();
    let second = OscReceiver::bind();
    let (mut manager, table) = tool_setup(Matrix4::IDENTITY);

    manager.connect(&first.endpoint()).unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();
    manager.connect(&second.endpoint()).unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.start_transmission(&table, "SoundNav").unwrap();
    move_transform(&mut manager, "Tool", Matrix4::from_translation(0.0, 0.0, 5.0));

    let received = second.recv_n(8);
    assert_close(received[3].1, 5.0);
    assert!(first.is_quiet(Duration::from_millis(100)));
}

#[test]
fn test_stop_transmission_silences_updates() {
    let receiver = OscReceiver::bind();
    let (mut manager, table) = tool_setup(Matrix4::IDENTITY);
    manager.connect(&receiver.endpoint()).unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();
    manager.stop_transmission();

    let sent = move_transform(&mut manager, "Tool", Matrix4::from_translation(1.0, 0.0, 0.0));
    assert_eq!(sent, 0);
    assert!(receiver.is_quiet(Duration::from_millis(100)));
}

#[test]
fn test_distance_matches_translation_norm() {
    let receiver = OscReceiver::bind();
    let (mut manager, table) = tool_setup(Matrix4::IDENTITY);
    manager.connect(&receiver.endpoint()).unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();

    let poses = [
        Matrix4::from_translation(3.0, 4.0, 0.0),
        Matrix4::from_translation(-1.5, 0.25, 8.0) * Matrix4::rotation_x(35.0),
        Matrix4::from_translation(0.0, -7.0, 2.0) * Matrix4::rotation_y(-120.0),
        Matrix4::IDENTITY,
    ];
    for pose in poses {
        move_transform(&mut manager, "Tool", pose);
        let received = receiver.recv_n(8);
        let (x, y, z) = (received[0].1, received[1].1, received[2].1);
        assert_close(received[3].1, (x * x + y * y + z * z).sqrt());
    }
}

#[test]
fn test_updates_to_silent_port_never_fail() {
    // Reserve a loopback port, then release it so nothing listens there.
    let port = {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    };
    let (mut manager, table) = tool_setup(Matrix4::IDENTITY);
    manager
        .connect(&soundnav_types::Endpoint::new("127.0.0.1", port))
        .unwrap();
    manager.start_transmission(&table, "SoundNav").unwrap();

    let tool = manager.host().find("Tool").unwrap();
    for step in 0..5 {
        let pose = Matrix4::from_translation(step as f64, 0.0, 0.0);
        let tokens = manager.host_mut().set_matrix(tool, pose).unwrap();
        assert_eq!(tokens.len(), 1);
        for token in tokens {
            let report = manager.handle_notification(token);
            assert!(report.failures.is_empty(), "step {}: {:?}", step, report.failures);
            assert_eq!(report.sent, 8);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(manager.state(), ConnectionState::Streaming);
}
