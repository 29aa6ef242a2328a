//! usrp-clock - board-indexed access to clock reference devices
//!
//! Clock devices expose their state through a hierarchical property tree.
//! This library opens such a device from connection parameters and offers a
//! per-board view: board count, time counter, named sensors, and a printable
//! status summary.
//!
//! # Example
//!
//! ```no_run
//! use usrp_clock::{DeviceAddr, MultiUsrpClock};
//!
//! let addr: DeviceAddr = "type=snapshot,file=octoclock.json".parse().unwrap();
//! let clock = MultiUsrpClock::make(&addr).unwrap();
//!
//! print!("{}", clock.get_pp_string().unwrap());
//! for board in 0..clock.get_num_boards() {
//!     println!("board {} time {}", board, clock.get_time(board).unwrap());
//! }
//! ```

pub mod device;
mod device_addr;
mod error;
mod multi_clock;
pub mod property_tree;
mod sensor;

pub use device::{Device, DeviceBackend, DeviceKind, DeviceRegistry, SnapshotBackend, TreeDevice};
pub use device_addr::DeviceAddr;
pub use error::{ClockError, Result};
pub use multi_clock::{MBOARDS_PATH, MultiUsrpClock, REF_SENSOR};
pub use property_tree::{JsonPropertyTree, Property, PropertyTree};
pub use sensor::{SensorDataType, SensorValue};
