//! Board-indexed view over a clock device
//!
//! [`MultiUsrpClock`] turns the per-board subtrees under `/mboards` into a
//! small API keyed by board index. Every call resolves its path against the
//! live tree; nothing is cached, so the board count and readings may change
//! between calls if the device's tree changes underneath.
//!
//! No bounds or existence checks are made here. An out-of-range board or a
//! missing sensor surfaces as whatever error the tree returns (normally
//! [`ClockError::PathNotFound`](crate::ClockError::PathNotFound)).
//!
//! No locking is added either: a [`MultiUsrpClock`] shared between threads
//! inherits exactly the thread-safety (or lack of it) of the underlying
//! [`PropertyTree`] implementation.

use std::sync::Arc;

use tracing::debug;

use crate::device::{Device, DeviceKind, DeviceRegistry};
use crate::device_addr::DeviceAddr;
use crate::error::{ClockError, Result};
use crate::property_tree::{PropertyTree, join};
use crate::sensor::SensorValue;

/// Root of the per-board subtrees
pub const MBOARDS_PATH: &str = "/mboards";

/// Sensor reported in the status summary
pub const REF_SENSOR: &str = "using_ref";

/// Clock device handle with per-board accessors
#[derive(Debug, Clone)]
pub struct MultiUsrpClock {
    dev: Arc<dyn Device>,
    tree: Arc<dyn PropertyTree>,
}

impl MultiUsrpClock {
    /// Open a clock device through the default backends
    pub fn make(addr: &DeviceAddr) -> Result<Self> {
        Self::make_with(&DeviceRegistry::default(), addr)
    }

    /// Open a clock device through `registry`
    pub fn make_with(registry: &DeviceRegistry, addr: &DeviceAddr) -> Result<Self> {
        debug!("MultiUsrpClock::make with args {}", addr.to_pp_string());
        let dev = registry.make(addr, DeviceKind::Clock)?;
        Ok(Self::from_device(dev))
    }

    /// Wrap an already opened device
    pub fn from_device(dev: Arc<dyn Device>) -> Self {
        let tree = dev.get_tree();
        Self { dev, tree }
    }

    /// Underlying device, for lower-level access
    pub fn get_device(&self) -> Arc<dyn Device> {
        Arc::clone(&self.dev)
    }

    /// Property tree the accessors read from
    pub fn get_tree(&self) -> Arc<dyn PropertyTree> {
        Arc::clone(&self.tree)
    }

    /// Multi-line summary naming each board and its reference sensor
    ///
    /// Fails as a whole if any board lacks the `using_ref` sensor.
    pub fn get_pp_string(&self) -> Result<String> {
        let num_boards = self.get_num_boards();

        let mut buff = format!(
            "{} USRP Clock Device\n",
            if num_boards > 1 { "Multi" } else { "Single" }
        );
        for board in 0..num_boards {
            let sensor = self.get_sensor(REF_SENSOR, board)?;
            buff.push_str(&format!("  Board {}\n", board));
            buff.push_str(&format!("    Reference: {}\n", sensor.value));
        }

        Ok(buff)
    }

    /// Number of boards currently listed under `/mboards`
    pub fn get_num_boards(&self) -> usize {
        self.tree.list(MBOARDS_PATH).len()
    }

    /// Free-running time counter of `board`
    pub fn get_time(&self, board: usize) -> Result<u32> {
        self.tree
            .access::<u32>(join(&board_path(board), "time"))
            .get()
    }

    /// Current reading of sensor `name` on `board`
    ///
    /// An empty name never names a sensor and fails as not found. A name
    /// containing `/` is used as-is and addresses a node further down the
    /// sensor's subtree.
    pub fn get_sensor(&self, name: &str, board: usize) -> Result<SensorValue> {
        let path = join(&sensors_path(board), name);
        if name.trim_matches('/').is_empty() {
            return Err(ClockError::PathNotFound(path));
        }

        self.tree.access::<SensorValue>(path).get()
    }

    /// Sensor names on `board`, in tree order (not sorted)
    pub fn get_sensor_names(&self, board: usize) -> Vec<String> {
        self.tree.list(&sensors_path(board))
    }
}

fn board_path(board: usize) -> String {
    format!("{}/{}", MBOARDS_PATH, board)
}

fn sensors_path(board: usize) -> String {
    join(&board_path(board), "sensors")
}
