//! Transform-change dispatch.
//!
//! When transmission starts, every active instrument is resolved against the
//! host scene and its sources are observed. Each change notification then
//! turns into a complete, immediate set of OSC messages for that instrument.

use log::{debug, warn};
use soundnav_types::{
    ObserverToken, OscMessage, Parameter, SlotId, SourceId, SourceKind, TRANSFORM_PARAMETERS,
};

use crate::error::{Result, SoundNavError};
use crate::geometry::Pose;
use crate::mapping::{slot_address, validate_address_root, validate_instrument_name, InstrumentTable};
use crate::osc::{Connector, OscClient};
use crate::scene::SceneHost;

/// One live subscription on a host node, on behalf of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle {
    pub source: SourceId,
    pub slot: SlotId,
    pub token: ObserverToken,
}

/// An instrument slot resolved against the scene when transmission started.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedInstrument {
    slot: SlotId,
    address: String,
    kind: SourceKind,
    source: SourceId,
    reference: Option<SourceId>,
}

/// Outcome of one change notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub sent: usize,
    /// Address (or instrument address when nothing could be computed) and
    /// the error for every message that did not go out.
    pub failures: Vec<(String, SoundNavError)>,
}

impl DispatchReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    instruments: Vec<ResolvedInstrument>,
    handles: Vec<ObserverHandle>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn handles(&self) -> &[ObserverHandle] {
        &self.handles
    }

    /// Instrument address of an observed slot.
    pub fn address(&self, slot: SlotId) -> Option<&str> {
        self.instrument(slot).map(|i| i.address.as_str())
    }

    fn instrument(&self, slot: SlotId) -> Option<&ResolvedInstrument> {
        self.instruments.iter().find(|i| i.slot == slot)
    }

    /// Slot a notification token belongs to.
    pub fn slot_for_token(&self, token: ObserverToken) -> Option<SlotId> {
        self.handles.iter().find(|h| h.token == token).map(|h| h.slot)
    }

    /// Replace all subscriptions with observers for every active slot.
    ///
    /// The whole table is validated before the first observer is added, so a
    /// configuration error leaves nothing subscribed.
    pub fn subscribe_all<H: SceneHost>(
        &mut self,
        host: &mut H,
        table: &InstrumentTable,
        address_root: &str,
    ) -> Result<()> {
        self.unsubscribe_all(host);
        validate_address_root(address_root)?;

        let instruments = table
            .active_slots()
            .map(|(slot, entry)| {
                validate_instrument_name(&entry.name)?;
                let source = entry.source.ok_or_else(|| {
                    SoundNavError::Configuration(format!("instrument {:?} has no source node", entry.name))
                })?;
                let kind = host.source_kind(source).ok_or_else(|| {
                    SoundNavError::Configuration(format!(
                        "source node {} of instrument {:?} not found",
                        source, entry.name
                    ))
                })?;
                // The reference frame only matters for transforms.
                let reference = match kind {
                    SourceKind::Transform => entry.reference,
                    SourceKind::Breach => None,
                };
                if let Some(r) = reference {
                    if host.source_kind(r) != Some(SourceKind::Transform) {
                        return Err(SoundNavError::Configuration(format!(
                            "reference node {} of instrument {:?} is not a transform",
                            r, entry.name
                        )));
                    }
                }
                Ok(ResolvedInstrument {
                    slot,
                    address: slot_address(address_root, &entry.name),
                    kind,
                    source,
                    reference,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for instrument in &instruments {
            let observed = std::iter::once(instrument.source).chain(instrument.reference);
            for source in observed {
                match host.subscribe(source, instrument.slot) {
                    Ok(token) => self.handles.push(ObserverHandle {
                        source,
                        slot: instrument.slot,
                        token,
                    }),
                    Err(e) => {
                        self.unsubscribe_all(host);
                        return Err(e);
                    }
                }
            }
            debug!(target: "dispatch", "observing slot {} as {}", instrument.slot, instrument.address);
        }
        self.instruments = instruments;
        Ok(())
    }

    pub fn unsubscribe_all<H: SceneHost>(&mut self, host: &mut H) {
        for handle in self.handles.drain(..) {
            host.unsubscribe(handle.source, handle.token);
        }
        self.instruments.clear();
    }

    /// Messages describing the current state of an observed instrument.
    pub fn messages_for<H: SceneHost>(&self, slot: SlotId, host: &H) -> Result<Vec<OscMessage>> {
        let instrument = self.instrument(slot).ok_or_else(|| {
            SoundNavError::Configuration(format!("slot {} is not being observed", slot))
        })?;
        let address = &instrument.address;

        match instrument.kind {
            SourceKind::Transform => {
                let matrix = host
                    .relative_transform(instrument.source, instrument.reference)
                    .ok_or_else(|| {
                        SoundNavError::Configuration(format!(
                            "transform of {} relative to {:?} is unavailable",
                            instrument.source, instrument.reference
                        ))
                    })?;
                let pose = Pose::from_matrix(&matrix);
                let [tx, ty, tz] = pose.translation;
                let [ox, oy, oz] = pose.orientation;
                let values = [tx, ty, tz, pose.distance(), ox, oy, oz, pose.orientation_wxyz[0]];
                Ok(TRANSFORM_PARAMETERS
                    .iter()
                    .zip(values)
                    .map(|(param, value)| OscMessage::float(format!("{}{}", address, param), value as f32))
                    .collect())
            }
            SourceKind::Breach => {
                let distance = host.signed_distance(instrument.source).ok_or_else(|| {
                    SoundNavError::Configuration(format!(
                        "breach warning {} has no distance",
                        instrument.source
                    ))
                })?;
                Ok(vec![OscMessage::float(
                    format!("{}{}", address, Parameter::Distance),
                    distance as f32,
                )])
            }
        }
    }

    /// Compute and send the messages for `slot`. Every message is attempted
    /// even if an earlier one failed.
    pub fn instrument_updated<H: SceneHost, C: Connector>(
        &self,
        slot: SlotId,
        host: &H,
        client: &mut OscClient<C>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let messages = match self.messages_for(slot, host) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(target: "dispatch", "slot {}: {}", slot, e);
                let address = self.address(slot).unwrap_or_default().to_string();
                report.failures.push((address, e));
                return report;
            }
        };
        for msg in &messages {
            match client.send(msg) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(target: "dispatch", "{}: {}", msg.addr, e);
                    report.failures.push((msg.addr.clone(), e));
                }
            }
        }
        report
    }
}
