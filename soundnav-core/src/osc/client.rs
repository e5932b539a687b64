//! Outbound OSC client.
//!
//! `OscClient` owns at most one open link to an endpoint. Opening a link is
//! delegated to a [`Connector`] so the socket layer can be swapped for a
//! recording double in tests.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use soundnav_types::{Endpoint, OscMessage};

use super::codec;
use crate::error::{Result, SoundNavError};

/// An open datagram connection. Dropping it closes the connection.
pub trait Link {
    fn send_datagram(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// Opens links to endpoints.
pub trait Connector {
    type Link: Link;

    /// Resolve `endpoint` and create a socket for it. Must not wait for the
    /// peer: datagram transport has no handshake.
    fn open(&mut self, endpoint: &Endpoint) -> Result<Self::Link>;
}

struct Connection<L> {
    endpoint: Endpoint,
    link: L,
}

/// Fire-and-forget OSC sender with at most one active connection.
pub struct OscClient<C: Connector = UdpConnector> {
    connector: C,
    connection: Option<Connection<C::Link>>,
    logging_enabled: bool,
}

impl OscClient<UdpConnector> {
    pub fn udp() -> Self {
        Self::new(UdpConnector)
    }
}

impl<C: Connector> OscClient<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            connection: None,
            logging_enabled: false,
        }
    }

    /// Close any existing connection, then open one to `endpoint`.
    ///
    /// The old connection is dropped before the new one is opened, so a
    /// failed connect leaves the client disconnected.
    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.disconnect();
        info!(target: "osc", "Connect to OSC server at {}", endpoint);
        let link = self.connector.open(endpoint)?;
        self.connection = Some(Connection {
            endpoint: endpoint.clone(),
            link,
        });
        Ok(())
    }

    /// Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            info!(target: "osc", "Disconnect from OSC server at {}", conn.endpoint);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.connection.as_ref().map(|c| &c.endpoint)
    }

    /// Log every message before it is sent. May slow down streaming.
    pub fn set_logging_enabled(&mut self, enabled: bool) {
        self.logging_enabled = enabled;
    }

    /// Encode and send `msg` over the current connection.
    pub fn send(&mut self, msg: &OscMessage) -> Result<()> {
        if self.logging_enabled {
            info!(target: "osc", "Send OSC message to {}", msg);
        }
        let conn = self.connection.as_mut().ok_or(SoundNavError::NotConnected)?;
        let buf = codec::encode(msg)?;
        conn.link.send_datagram(&buf).map_err(|e| {
            warn!(target: "osc", "Failed to send to {}: {}", conn.endpoint, e);
            SoundNavError::from(e)
        })?;
        Ok(())
    }
}

// ─── UDP ────────────────────────────────────────────────────────────

/// Opens UDP sockets bound to an ephemeral local port.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

/// Unconnected socket plus the resolved target. Datagrams go out with
/// `send_to`, so ICMP errors from a peer that is not listening never surface
/// on later sends.
#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpLink {
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Link for UdpLink {
    fn send_datagram(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.target)
    }
}

impl Connector for UdpConnector {
    type Link = UdpLink;

    fn open(&mut self, endpoint: &Endpoint) -> Result<UdpLink> {
        let target = resolve(endpoint)?;
        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).map_err(|e| {
            SoundNavError::Connection(format!("could not create socket for {}: {}", endpoint, e))
        })?;
        Ok(UdpLink { socket, target })
    }
}

/// Resolve an endpoint, preferring IPv4 (`localhost` often lists `::1` first
/// while OSC receivers usually only listen on IPv4).
fn resolve(endpoint: &Endpoint) -> Result<SocketAddr> {
    let hostname = endpoint.hostname.trim();
    if hostname.is_empty() {
        return Err(SoundNavError::Connection("host name is empty".to_string()));
    }
    let addrs: Vec<SocketAddr> = (hostname, endpoint.port)
        .to_socket_addrs()
        .map_err(|e| SoundNavError::Connection(format!("could not resolve {}: {}", endpoint, e)))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| SoundNavError::Connection(format!("no address found for {}", endpoint)))
}

// ─── Test Connector ─────────────────────────────────────────────────

/// A datagram captured by [`TestConnector`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentDatagram {
    pub endpoint: Endpoint,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct TestConnectorState {
    sent: Vec<SentDatagram>,
    opened: Vec<Endpoint>,
    refused_hosts: Vec<String>,
}

/// A connector that records every datagram instead of touching the network.
/// Clones share the same record, so a test can keep one while the client owns
/// the other.
#[derive(Clone, Default)]
pub struct TestConnector {
    state: Arc<Mutex<TestConnectorState>>,
}

pub struct TestLink {
    endpoint: Endpoint,
    state: Arc<Mutex<TestConnectorState>>,
}

impl TestConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail for this host name, as an unresolvable host would.
    pub fn refuse(&self, hostname: &str) {
        self.state.lock().unwrap().refused_hosts.push(hostname.to_string());
    }

    /// Every endpoint a link was opened to, in order.
    pub fn opened(&self) -> Vec<Endpoint> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn datagrams(&self) -> Vec<SentDatagram> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Decoded messages sent to `endpoint`.
    pub fn messages_to(&self, endpoint: &Endpoint) -> Vec<OscMessage> {
        self.datagrams()
            .iter()
            .filter(|d| &d.endpoint == endpoint)
            .filter_map(|d| codec::decode(&d.bytes).ok())
            .collect()
    }

    /// Decoded messages to any endpoint.
    pub fn messages(&self) -> Vec<OscMessage> {
        self.datagrams()
            .iter()
            .filter_map(|d| codec::decode(&d.bytes).ok())
            .collect()
    }

}

impl Link for TestLink {
    fn send_datagram(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.lock().unwrap().sent.push(SentDatagram {
            endpoint: self.endpoint.clone(),
            bytes: buf.to_vec(),
        });
        Ok(buf.len())
    }
}

impl Connector for TestConnector {
    type Link = TestLink;

    fn open(&mut self, endpoint: &Endpoint) -> Result<TestLink> {
        let mut state = self.state.lock().unwrap();
        if endpoint.hostname.is_empty() || state.refused_hosts.contains(&endpoint.hostname) {
            return Err(SoundNavError::Connection(format!("could not resolve {}", endpoint)));
        }
        state.opened.push(endpoint.clone());
        Ok(TestLink {
            endpoint: endpoint.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (OscClient<TestConnector>, TestConnector) {
        let connector = TestConnector::new();
        (OscClient::new(connector.clone()), connector)
    }

    #[test]
    fn send_without_connection_fails() {
        let (mut client, connector) = client();
        let err = client.send(&OscMessage::float("/x", 1.0)).unwrap_err();
        assert_eq!(err, SoundNavError::NotConnected);
        assert!(connector.datagrams().is_empty());
    }

    #[test]
    fn reconnect_replaces_connection() {
        let (mut client, connector) = client();
        let a = Endpoint::new("host-a", 7400);
        let b = Endpoint::new("host-b", 7401);

        client.connect(&a).unwrap();
        client.send(&OscMessage::float("/x", 1.0)).unwrap();
        client.connect(&b).unwrap();
        client.send(&OscMessage::float("/x", 2.0)).unwrap();

        assert_eq!(client.endpoint(), Some(&b));
        assert_eq!(connector.opened(), vec![a.clone(), b.clone()]);
        assert_eq!(connector.messages_to(&a), vec![OscMessage::float("/x", 1.0)]);
        assert_eq!(connector.messages_to(&b), vec![OscMessage::float("/x", 2.0)]);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let (mut client, connector) = client();
        client.connect(&Endpoint::default()).unwrap();
        client.disconnect();
        client.disconnect();
        assert!(!client.is_connected());
        assert_eq!(
            client.send(&OscMessage::float("/x", 1.0)),
            Err(SoundNavError::NotConnected)
        );
        assert!(connector.datagrams().is_empty());
    }

    #[test]
    fn failed_connect_leaves_client_disconnected() {
        let (mut client, connector) = client();
        connector.refuse("nowhere");
        client.connect(&Endpoint::default()).unwrap();
        let err = client.connect(&Endpoint::new("nowhere", 1)).unwrap_err();
        assert!(matches!(err, SoundNavError::Connection(_)));
        assert!(!client.is_connected());
    }

    #[test]
    fn logging_does_not_affect_send_result() {
        let (mut client, connector) = client();
        client.set_logging_enabled(true);
        assert_eq!(
            client.send(&OscMessage::float("/x", 1.0)),
            Err(SoundNavError::NotConnected)
        );
        client.connect(&Endpoint::default()).unwrap();
        client.send(&OscMessage::float("/x", 1.0)).unwrap();
        assert_eq!(connector.datagrams().len(), 1);
    }

    #[test]
    fn udp_rejects_empty_host() {
        let err = UdpConnector.open(&Endpoint::new("", 7400)).unwrap_err();
        assert!(matches!(err, SoundNavError::Connection(_)));
    }
}
