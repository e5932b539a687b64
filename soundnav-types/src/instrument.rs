use serde::{Deserialize, Serialize};

use crate::SourceId;

/// What kind of data a host node provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Linear transform: full position and orientation.
    Transform,
    /// Breach warning: a single signed closest distance to a model.
    Breach,
}

/// One user-configured instrument. A slot with an empty name is inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSlot {
    pub name: String,
    pub source: Option<SourceId>,
    /// Frame the instrument is measured in. `None` means world coordinates.
    pub reference: Option<SourceId>,
}

impl InstrumentSlot {
    pub fn new(name: impl Into<String>, source: SourceId) -> Self {
        Self {
            name: name.into(),
            source: Some(source),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: SourceId) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn is_active(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Parameter names appended to an instrument address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    TranslationX,
    TranslationY,
    TranslationZ,
    Distance,
    OrientationX,
    OrientationY,
    OrientationZ,
    /// Rotation angle of the axis-angle representation.
    Orientation,
}

/// Send order for transform instruments.
pub const TRANSFORM_PARAMETERS: [Parameter; 8] = [
    Parameter::TranslationX,
    Parameter::TranslationY,
    Parameter::TranslationZ,
    Parameter::Distance,
    Parameter::OrientationX,
    Parameter::OrientationY,
    Parameter::OrientationZ,
    Parameter::Orientation,
];

impl Parameter {
    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::TranslationX => "TranslationX",
            Parameter::TranslationY => "TranslationY",
            Parameter::TranslationZ => "TranslationZ",
            Parameter::Distance => "Distance",
            Parameter::OrientationX => "OrientationX",
            Parameter::OrientationY => "OrientationY",
            Parameter::OrientationZ => "OrientationZ",
            Parameter::Orientation => "Orientation",
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the OSC connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    /// Connected and observing every active instrument source.
    Streaming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_inactive() {
        assert!(!InstrumentSlot::default().is_active());
        assert!(InstrumentSlot::new("Tool", SourceId::new(1)).is_active());
    }

    #[test]
    fn transform_parameter_order() {
        let names: Vec<&str> = TRANSFORM_PARAMETERS.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            [
                "TranslationX",
                "TranslationY",
                "TranslationZ",
                "Distance",
                "OrientationX",
                "OrientationY",
                "OrientationZ",
                "Orientation",
            ]
        );
    }
}
