use std::path::{Path, PathBuf};

use serde::Deserialize;
use soundnav_types::{Endpoint, InstrumentSlot, SourceId, DEFAULT_HOSTNAME, DEFAULT_PORT};

use crate::error::{Result, SoundNavError};
use crate::mapping::{InstrumentTable, DEFAULT_MAX_INSTRUMENTS};
use crate::paths;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Upper bound for `max_instruments`.
const MAX_INSTRUMENT_SLOTS: usize = 64;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    connection: ConnectionConfig,
    #[serde(default)]
    instruments: InstrumentsConfig,
    #[serde(default)]
    pure_data: PureDataConfig,
}

#[derive(Deserialize, Default)]
struct ConnectionConfig {
    hostname: Option<String>,
    port: Option<u16>,
    address_root: Option<String>,
    log_messages: Option<bool>,
}

#[derive(Deserialize, Default)]
struct InstrumentsConfig {
    max_instruments: Option<usize>,
    #[serde(default)]
    slot: Vec<SlotConfig>,
}

/// One `[[instruments.slot]]` entry. Sources are scene node names.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SlotConfig {
    pub index: usize,
    pub name: String,
    pub source: Option<String>,
    pub reference: Option<String>,
}

#[derive(Deserialize, Default)]
struct PureDataConfig {
    executable: Option<PathBuf>,
    patch: Option<PathBuf>,
    show_gui: Option<bool>,
}

pub struct Config {
    connection: ConnectionConfig,
    instruments: InstrumentsConfig,
    pure_data: PureDataConfig,
}

impl Config {
    /// Embedded defaults merged with `<config dir>/soundnav/config.toml`.
    pub fn load() -> Self {
        Self::load_from(&paths::config_file())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge(&mut base, user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        Config {
            connection: base.connection,
            instruments: base.instruments,
            pure_data: base.pure_data,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(
            self.connection
                .hostname
                .clone()
                .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
            self.connection.port.unwrap_or(DEFAULT_PORT),
        )
    }

    pub fn address_root(&self) -> &str {
        self.connection.address_root.as_deref().unwrap_or("SoundNav")
    }

    pub fn log_messages(&self) -> bool {
        self.connection.log_messages.unwrap_or(false)
    }

    /// Number of instrument slots (clamped to 1..64).
    pub fn max_instruments(&self) -> usize {
        self.instruments
            .max_instruments
            .unwrap_or(DEFAULT_MAX_INSTRUMENTS)
            .clamp(1, MAX_INSTRUMENT_SLOTS)
    }

    pub fn slots(&self) -> &[SlotConfig] {
        &self.instruments.slot
    }

    /// Build the instrument table, resolving source names through `lookup`.
    ///
    /// A slot whose source is not configured stays unassigned; an unknown
    /// node name is a configuration error.
    pub fn instrument_table<F>(&self, lookup: F) -> Result<InstrumentTable>
    where
        F: Fn(&str) -> Option<SourceId>,
    {
        let resolve = |node: &Option<String>| -> Result<Option<SourceId>> {
            match node {
                None => Ok(None),
                Some(name) => lookup(name).map(Some).ok_or_else(|| {
                    SoundNavError::Configuration(format!("unknown scene node {:?}", name))
                }),
            }
        };

        let mut table = InstrumentTable::new(self.max_instruments());
        for slot in &self.instruments.slot {
            let entry = InstrumentSlot {
                name: slot.name.clone(),
                source: resolve(&slot.source)?,
                reference: resolve(&slot.reference)?,
            };
            table.set_slot(slot.index, entry)?;
        }
        Ok(table)
    }

    pub fn pure_data_executable(&self) -> Option<&Path> {
        self.pure_data.executable.as_deref()
    }

    pub fn pure_data_patch(&self) -> Option<&Path> {
        self.pure_data.patch.as_deref()
    }

    pub fn pure_data_show_gui(&self) -> bool {
        self.pure_data.show_gui.unwrap_or(false)
    }
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_connection(&mut base.connection, user.connection);
    merge_instruments(&mut base.instruments, user.instruments);
    merge_pure_data(&mut base.pure_data, user.pure_data);
}

fn merge_connection(base: &mut ConnectionConfig, user: ConnectionConfig) {
    if user.hostname.is_some() {
        base.hostname = user.hostname;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.address_root.is_some() {
        base.address_root = user.address_root;
    }
    if user.log_messages.is_some() {
        base.log_messages = user.log_messages;
    }
}

/// User slots replace the default slot list as a whole.
fn merge_instruments(base: &mut InstrumentsConfig, user: InstrumentsConfig) {
    if user.max_instruments.is_some() {
        base.max_instruments = user.max_instruments;
    }
    if !user.slot.is_empty() {
        base.slot = user.slot;
    }
}

fn merge_pure_data(base: &mut PureDataConfig, user: PureDataConfig) {
    if user.executable.is_some() {
        base.executable = user.executable;
    }
    if user.patch.is_some() {
        base.patch = user.patch;
    }
    if user.show_gui.is_some() {
        base.show_gui = user.show_gui;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn load_str(contents: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        Config::load_from(&path)
    }

    #[test]
    fn test_load_embedded_config() {
        let config = Config::load_from(Path::new("/nonexistent/soundnav/config.toml"));
        assert_eq!(config.endpoint(), Endpoint::new("localhost", 7400));
        assert_eq!(config.address_root(), "SoundNav");
        assert!(!config.log_messages());
        assert_eq!(config.max_instruments(), 3);
        assert_eq!(config.slots().len(), 1);
        assert_eq!(config.slots()[0].name, "Instrument");
        assert!(!config.pure_data_show_gui());
        assert!(config.pure_data_executable().is_none());
    }

    #[test]
    fn user_values_override_defaults() {
        let config = load_str(
            r#"
            [connection]
            port = 9000

            [pure_data]
            show_gui = true
            "#,
        );
        assert_eq!(config.endpoint(), Endpoint::new("localhost", 9000));
        assert_eq!(config.address_root(), "SoundNav");
        assert!(config.pure_data_show_gui());
    }

    #[test]
    fn malformed_user_config_is_ignored() {
        let config = load_str("[connection\nport = ");
        assert_eq!(config.endpoint().port, 7400);
    }

    #[test]
    fn max_instruments_is_clamped() {
        let config = load_str("[instruments]\nmax_instruments = 0\n");
        assert_eq!(config.max_instruments(), 1);
        let config = load_str("[instruments]\nmax_instruments = 1000\n");
        assert_eq!(config.max_instruments(), 64);
    }

    #[test]
    fn instrument_table_resolves_node_names() {
        let config = load_str(
            r#"
            [[instruments.slot]]
            index = 0
            name = "Tool"
            source = "ToolTip"
            reference = "Patient"

            [[instruments.slot]]
            index = 2
            name = "Warning"
            source = "Needle"
            "#,
        );
        let lookup = |name: &str| match name {
            "ToolTip" => Some(SourceId::new(1)),
            "Patient" => Some(SourceId::new(2)),
            "Needle" => Some(SourceId::new(3)),
            _ => None,
        };
        let table = config.instrument_table(lookup).unwrap();
        assert_eq!(
            table.slot(0).unwrap(),
            &InstrumentSlot::new("Tool", SourceId::new(1)).with_reference(SourceId::new(2))
        );
        assert!(!table.slot(1).unwrap().is_active());
        assert_eq!(table.slot(2).unwrap().source, Some(SourceId::new(3)));
    }

    #[test]
    fn unknown_node_is_configuration_error() {
        let config = load_str(
            "[[instruments.slot]]\nindex = 0\nname = \"Tool\"\nsource = \"Missing\"\n",
        );
        let err = config.instrument_table(|_| None).unwrap_err();
        assert!(matches!(err, SoundNavError::Configuration(_)));
    }

    #[test]
    fn slot_index_out_of_range() {
        let config = load_str("[[instruments.slot]]\nindex = 5\nname = \"Tool\"\n");
        assert!(config.instrument_table(|_| None).is_err());
    }
}
