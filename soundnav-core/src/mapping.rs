//! Instrument mapping table and OSC address derivation.
//!
//! Complete address of a parameter: `/<address root>/<instrument name>/<parameter>`.

use std::sync::LazyLock;

use regex::Regex;
use soundnav_types::{InstrumentSlot, SlotId};

use crate::error::{Result, SoundNavError};

/// Number of instrument slots when nothing else is configured.
pub const DEFAULT_MAX_INSTRUMENTS: usize = 3;

/// Characters OSC reserves for pattern matching, plus whitespace.
static ADDRESS_ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s#*,?\[\]{}]*$").unwrap());
static INSTRUMENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s#*,?/\[\]{}]+$").unwrap());

/// Fixed-size table of instrument slots.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentTable {
    slots: Vec<InstrumentSlot>,
}

impl Default for InstrumentTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INSTRUMENTS)
    }
}

impl InstrumentTable {
    /// Table with `capacity` empty slots. The size never changes afterwards.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![InstrumentSlot::default(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn set_slot(&mut self, index: usize, slot: InstrumentSlot) -> Result<()> {
        let capacity = self.capacity();
        let entry = self
            .slots
            .get_mut(index)
            .ok_or_else(|| index_error(index, capacity))?;
        *entry = slot;
        Ok(())
    }

    pub fn slot(&self, index: usize) -> Result<&InstrumentSlot> {
        self.slots
            .get(index)
            .ok_or_else(|| index_error(index, self.capacity()))
    }

    /// Slots with a non-empty name, in index order.
    pub fn active_slots(&self) -> impl Iterator<Item = (SlotId, &InstrumentSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(i, slot)| (SlotId::new(i), slot))
    }
}

fn index_error(index: usize, capacity: usize) -> SoundNavError {
    SoundNavError::Configuration(format!(
        "instrument index {} out of range (0..{})",
        index, capacity
    ))
}

/// Exactly one leading and one trailing `/`. An empty root becomes `/`.
pub fn normalize_address_root(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Address prefix for an instrument; parameter names are appended to it.
pub fn slot_address(root: &str, name: &str) -> String {
    format!("{}{}/", normalize_address_root(root), name)
}

pub fn validate_address_root(root: &str) -> Result<()> {
    if ADDRESS_ROOT_RE.is_match(root) {
        Ok(())
    } else {
        Err(SoundNavError::Configuration(format!(
            "address root {:?} contains characters reserved by OSC",
            root
        )))
    }
}

pub fn validate_instrument_name(name: &str) -> Result<()> {
    if INSTRUMENT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(SoundNavError::Configuration(format!(
            "instrument name {:?} must be non-empty and free of '/', spaces and OSC pattern characters",
            name
        )))
    }
}
