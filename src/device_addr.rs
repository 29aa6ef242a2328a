//! Device connection parameters
//!
//! A device address is an ordered set of `key=value` pairs, written as a
//! comma separated string such as `type=snapshot,file=/tmp/clock.json`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClockError, Result};

const PAIR_DELIM: char = ',';
const KEY_DELIM: char = '=';

/// Ordered connection parameters used to locate and open a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddr {
    pairs: Vec<(String, String)>,
}

impl DeviceAddr {
    /// Create an empty address (matches any device)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from the `k=v,k=v` form
    ///
    /// Bare keys (no `=`) map to an empty value. Empty tokens are skipped.
    pub fn parse(args: &str) -> Result<Self> {
        let mut addr = Self::new();

        for token in args.split(PAIR_DELIM) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            let (key, value) = match token.split_once(KEY_DELIM) {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (token, ""),
            };

            if key.is_empty() {
                return Err(ClockError::InvalidDeviceAddr(format!(
                    "missing key in {:?}",
                    token
                )));
            }

            addr.insert(key, value);
        }

        Ok(addr)
    }

    /// Set a key, replacing any previous value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Builder-style `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Multi-line listing for log output
    pub fn to_pp_string(&self) -> String {
        if self.pairs.is_empty() {
            return "Empty Device Address".to_string();
        }

        let mut buff = String::from("Device Address:\n");
        for (key, value) in &self.pairs {
            buff.push_str(&format!("    {}: {}\n", key, value));
        }
        buff
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if value.is_empty() {
                f.write_str(key)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

impl FromStr for DeviceAddr {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceAddr {
    type Error = ClockError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<DeviceAddr> for String {
    fn from(addr: DeviceAddr) -> Self {
        addr.to_string()
    }
}
