//! OSC wire encoding and the UDP client.

pub mod client;
pub mod codec;

pub use client::{Connector, Link, OscClient, SentDatagram, TestConnector, UdpConnector, UdpLink};
