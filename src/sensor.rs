//! Sensor readings published by clock boards
//!
//! Boards publish each sensor as a small record of name, type, unit and a
//! value, e.g. `{"name": "ref_locked", "type": "BOOLEAN", "unit": "locked",
//! "value": "true"}`. Some firmware writes the value as a bare JSON number or
//! boolean; those are kept as their string form.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ClockError, Result};

/// Data type tag carried by a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorDataType {
    Boolean,
    Integer,
    Realnum,
    String,
}

impl SensorDataType {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorDataType::Boolean => "BOOLEAN",
            SensorDataType::Integer => "INTEGER",
            SensorDataType::Realnum => "REALNUM",
            SensorDataType::String => "STRING",
        }
    }
}

impl fmt::Display for SensorDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named sensor reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorValue {
    /// Human readable sensor name
    pub name: String,
    /// Reading, always stored as a string
    #[serde(deserialize_with = "reading_as_string")]
    pub value: String,
    /// Unit, or the state label for booleans
    #[serde(default)]
    pub unit: String,
    #[serde(rename = "type")]
    pub data_type: SensorDataType,
}

impl SensorValue {
    /// Boolean sensor; the unit reflects the state (e.g. "locked"/"unlocked")
    pub fn boolean(name: impl Into<String>, value: bool, utrue: &str, ufalse: &str) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            unit: if value { utrue } else { ufalse }.to_string(),
            data_type: SensorDataType::Boolean,
        }
    }

    pub fn integer(name: impl Into<String>, value: i64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            unit: unit.into(),
            data_type: SensorDataType::Integer,
        }
    }

    pub fn realnum(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            unit: unit.into(),
            data_type: SensorDataType::Realnum,
        }
    }

    pub fn string(
        name: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: unit.into(),
            data_type: SensorDataType::String,
        }
    }

    /// Interpret the reading as a boolean ("true"/"false")
    pub fn to_bool(&self) -> Result<bool> {
        match self.value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.conversion_error("not a boolean")),
        }
    }

    pub fn to_int(&self) -> Result<i64> {
        self.value
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| self.conversion_error(&e.to_string()))
    }

    pub fn to_real(&self) -> Result<f64> {
        self.value
            .trim()
            .parse()
            .map_err(|e: std::num::ParseFloatError| self.conversion_error(&e.to_string()))
    }

    /// One-line `name: value unit` rendering
    pub fn to_pp_string(&self) -> String {
        self.to_string()
    }

    fn conversion_error(&self, reason: &str) -> ClockError {
        ClockError::SensorConversion {
            name: self.name.clone(),
            value: self.value.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Accept string, numeric or boolean readings
fn reading_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reading {
        Text(String),
        Flag(bool),
        Signed(i64),
        Unsigned(u64),
        Real(f64),
    }

    Ok(match Reading::deserialize(deserializer)? {
        Reading::Text(s) => s,
        Reading::Flag(b) => b.to_string(),
        Reading::Signed(n) => n.to_string(),
        Reading::Unsigned(n) => n.to_string(),
        Reading::Real(f) => f.to_string(),
    })
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}: {}", self.name, self.value)
        } else {
            write!(f, "{}: {} {}", self.name, self.value, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_unit_follows_state() {
        let locked = SensorValue::boolean("ref_locked", true, "locked", "unlocked");
        assert_eq!(locked.value, "true");
        assert_eq!(locked.unit, "locked");
        assert!(locked.to_bool().unwrap());

        let unlocked = SensorValue::boolean("ref_locked", false, "locked", "unlocked");
        assert_eq!(unlocked.unit, "unlocked");
        assert!(!unlocked.to_bool().unwrap());
    }

    #[test]
    fn test_numeric_conversions() {
        let temp = SensorValue::realnum("temperature", 41.5, "C");
        assert_eq!(temp.to_real().unwrap(), 41.5);

        let fan = SensorValue::integer("cooling fan", 3, "rpm");
        assert_eq!(fan.to_int().unwrap(), 3);
        assert!(fan.to_bool().is_err());
    }

    #[test]
    fn test_conversion_error_names_sensor() {
        let sensor = SensorValue::string("using_ref", "external", "");
        let err = sensor.to_int().unwrap_err();
        match err {
            ClockError::SensorConversion { name, value, .. } => {
                assert_eq!(name, "using_ref");
                assert_eq!(value, "external");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deserialize_firmware_record() {
        let json = r#"{"name": "ref_locked", "type": "BOOLEAN", "unit": "locked", "value": "true"}"#;
        let sensor: SensorValue = serde_json::from_str(json).unwrap();

        assert_eq!(sensor.data_type, SensorDataType::Boolean);
        assert_eq!(sensor.to_pp_string(), "ref_locked: true locked");
    }

    #[test]
    fn test_deserialize_bare_readings() {
        let temp: SensorValue = serde_json::from_str(
            r#"{"name": "temperature", "type": "REALNUM", "unit": "C", "value": 38.5}"#,
        )
        .unwrap();
        assert_eq!(temp.value, "38.5");
        assert_eq!(temp.to_real().unwrap(), 38.5);

        let fan: SensorValue = serde_json::from_str(
            r#"{"name": "cooling fan", "type": "INTEGER", "unit": "rpm", "value": -2}"#,
        )
        .unwrap();
        assert_eq!(fan.to_int().unwrap(), -2);

        let lock: SensorValue = serde_json::from_str(
            r#"{"name": "gps_lock", "type": "BOOLEAN", "unit": "locked", "value": true}"#,
        )
        .unwrap();
        assert_eq!(lock.value, "true");
        assert!(lock.to_bool().unwrap());

        let nested = serde_json::from_str::<SensorValue>(
            r#"{"name": "gps_tpv", "type": "STRING", "unit": "", "value": {"mode": 3}}"#,
        );
        assert!(nested.is_err());
    }

    #[test]
    fn test_display_without_unit() {
        let sensor = SensorValue::string("using_ref", "internal", "");
        assert_eq!(sensor.to_string(), "using_ref: internal");
    }
}
