//! Sensor snapshot and upload record types

use chrono::{DateTime, Local};

/// Field names of the remote layout
pub mod fields {
    pub const RPI_PROCESSOR: &str = "rpiProcessor";
    pub const RPI_MODEL: &str = "rpiModel";
    pub const RPI_SERIAL: &str = "rpiSerial";
    pub const WHEN_START: &str = "when_start";
    pub const HUMIDITY: &str = "humidity";
    pub const TEMPERATURE: &str = "temperature";
    pub const PRESSURE: &str = "pressure";
    pub const WHEN: &str = "when";
}

/// Script run server-side after every new record
pub const GAP_SCRIPT: &str = "calculate_gap";

/// Host identity fields read from the board
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardIdentity {
    pub processor_name: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
}

/// Best-effort reading of the sensors and the host identity
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub identity: BoardIdentity,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Temperature in degrees Celsius
    pub temperature: Option<f64>,
    /// Pressure in hectopascal
    pub pressure: Option<f64>,
    pub captured_at: DateTime<Local>,
}

impl SensorSnapshot {
    /// Snapshot with no readings at all
    pub fn empty(captured_at: DateTime<Local>) -> Self {
        Self {
            identity: BoardIdentity::default(),
            humidity: None,
            temperature: None,
            pressure: None,
            captured_at,
        }
    }
}

/// When the server runs a script relative to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptTiming {
    /// Before the request is processed
    Prerequest,
    /// After the records are found, before sorting
    Presort,
    /// After the record is created
    #[default]
    After,
}

impl ScriptTiming {
    /// Request key carrying the script name
    pub fn key(self) -> &'static str {
        match self {
            ScriptTiming::Prerequest => "script.prerequest",
            ScriptTiming::Presort => "script.presort",
            ScriptTiming::After => "script",
        }
    }

    /// Request key carrying the script parameter
    pub fn param_key(self) -> &'static str {
        match self {
            ScriptTiming::Prerequest => "script.prerequest.param",
            ScriptTiming::Presort => "script.presort.param",
            ScriptTiming::After => "script.param",
        }
    }
}

/// A script the server runs as part of a record request
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub name: String,
    pub timing: ScriptTiming,
    pub param: Option<String>,
}

impl ScriptRequest {
    /// Script run after the record has been created
    pub fn after(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timing: ScriptTiming::After,
            param: None,
        }
    }
}

/// One record to be created on the remote layout
///
/// Fields keep their insertion order. Adding a field that already exists
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadRecord {
    fields: Vec<(String, String)>,
    script: Option<ScriptRequest>,
}

impl UploadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Add a field only when a value is present
    pub fn add_optional(&mut self, name: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.add_field(name, value.to_string());
        }
    }

    pub fn set_script(&mut self, script: ScriptRequest) {
        self.script = Some(script);
    }

    pub fn script(&self) -> Option<&ScriptRequest> {
        self.script.as_ref()
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Look up a field value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
