//! Connection lifecycle: Disconnected → Connected → Streaming.
//!
//! The manager owns the OSC client and the dispatcher, and is the only place
//! that changes either. Every transition that would tear down the transport
//! unsubscribes first, so no observer can fire into a closed connection.

use log::{debug, info};
use soundnav_types::{ConnectionState, Endpoint, ObserverToken, OscMessage, SlotId};

use crate::dispatch::{DispatchReport, Dispatcher, ObserverHandle};
use crate::error::{Result, SoundNavError};
use crate::mapping::InstrumentTable;
use crate::osc::{Connector, OscClient, UdpConnector};
use crate::scene::SceneHost;

pub struct ConnectionManager<H: SceneHost, C: Connector = UdpConnector> {
    host: H,
    client: OscClient<C>,
    dispatcher: Dispatcher,
    state: ConnectionState,
}

impl<H: SceneHost> ConnectionManager<H, UdpConnector> {
    pub fn udp(host: H) -> Self {
        Self::new(host, UdpConnector)
    }
}

impl<H: SceneHost, C: Connector> ConnectionManager<H, C> {
    pub fn new(host: H, connector: C) -> Self {
        Self {
            host,
            client: OscClient::new(connector),
            dispatcher: Dispatcher::new(),
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.client.endpoint()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the scene. Subscriptions made by the manager must
    /// only be removed through [`stop_transmission`](Self::stop_transmission).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn client(&self) -> &OscClient<C> {
        &self.client
    }

    pub fn observers(&self) -> &[ObserverHandle] {
        self.dispatcher.handles()
    }

    pub fn set_logging_enabled(&mut self, enabled: bool) {
        self.client.set_logging_enabled(enabled);
    }

    /// Open a connection to `endpoint`, replacing any existing one.
    ///
    /// While streaming, all observers are removed before the old connection
    /// closes; the manager ends up `Connected` (or `Disconnected` on error).
    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.disconnect();
        self.client.connect(endpoint)?;
        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Idempotent.
    pub fn disconnect(&mut self) {
        self.stop_transmission();
        self.client.disconnect();
        self.state = ConnectionState::Disconnected;
    }

    /// Observe every active instrument and send on each change.
    ///
    /// Restarts observation from scratch when already streaming.
    pub fn start_transmission(&mut self, table: &InstrumentTable, address_root: &str) -> Result<()> {
        if !self.client.is_connected() {
            return Err(SoundNavError::NotConnected);
        }
        self.stop_transmission();
        self.dispatcher.subscribe_all(&mut self.host, table, address_root)?;
        self.state = ConnectionState::Streaming;
        info!(
            target: "connection",
            "transmission started: {} observers",
            self.dispatcher.handles().len()
        );
        Ok(())
    }

    /// Remove all observers. The connection stays open.
    pub fn stop_transmission(&mut self) {
        if self.state != ConnectionState::Streaming {
            return;
        }
        self.dispatcher.unsubscribe_all(&mut self.host);
        self.state = ConnectionState::Connected;
        info!(target: "connection", "transmission stopped");
    }

    /// The "transmission active" switch: connect and start, or stop.
    pub fn set_transmission_active(
        &mut self,
        active: bool,
        endpoint: &Endpoint,
        table: &InstrumentTable,
        address_root: &str,
    ) -> Result<()> {
        if !active {
            self.stop_transmission();
            return Ok(());
        }
        self.connect(endpoint)?;
        self.start_transmission(table, address_root)
    }

    /// Send one message through the current connection.
    pub fn send_message(&mut self, msg: &OscMessage) -> Result<()> {
        self.client.send(msg)
    }

    /// Entry point for host change notifications.
    pub fn handle_notification(&mut self, token: ObserverToken) -> DispatchReport {
        match self.dispatcher.slot_for_token(token) {
            Some(slot) => self.instrument_updated(slot),
            None => {
                debug!(target: "connection", "ignoring notification for unknown observer {}", token.get());
                DispatchReport::default()
            }
        }
    }

    /// Send the current values of one observed instrument.
    pub fn instrument_updated(&mut self, slot: SlotId) -> DispatchReport {
        self.dispatcher.instrument_updated(slot, &self.host, &mut self.client)
    }
}
