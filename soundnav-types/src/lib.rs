//! # soundnav-types
//!
//! Shared type definitions for the SoundNav crates: endpoints, OSC messages,
//! instrument slots and the opaque identifiers exchanged with the host scene.

mod endpoint;
mod instrument;
mod message;

pub use endpoint::{Endpoint, DEFAULT_HOSTNAME, DEFAULT_PORT};
pub use instrument::{ConnectionState, InstrumentSlot, Parameter, SourceKind, TRANSFORM_PARAMETERS};
pub use message::{OscArg, OscMessage};

/// Stable index of an instrument slot in the mapping table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(usize);

impl SlotId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a node owned by the host scene (a transform or a
/// breach warning source). SoundNav never owns the node itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(u32);

impl SourceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Subscription id handed out by the host when an observer is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverToken(u64);

impl ObserverToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn get(self) -> u64 {
        self.0
    }
}
