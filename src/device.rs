//! Device handles and backend discovery
//!
//! A [`Device`] is anything that exposes a property tree. Devices are created
//! by a [`DeviceRegistry`], which asks each registered [`DeviceBackend`] to
//! find devices matching a [`DeviceAddr`] hint and then constructs one.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::device_addr::DeviceAddr;
use crate::error::{ClockError, Result};
use crate::property_tree::{JsonPropertyTree, PropertyTree};

/// Which family of device a backend produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Radio peripheral
    Usrp,
    /// Clock/time reference unit
    Clock,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Usrp => f.write_str("usrp"),
            DeviceKind::Clock => f.write_str("clock"),
        }
    }
}

/// An opened device
pub trait Device: Send + Sync + fmt::Debug {
    /// Root of the device's property tree
    fn get_tree(&self) -> Arc<dyn PropertyTree>;

    fn kind(&self) -> DeviceKind;
}

/// A way of finding and opening devices of one kind
pub trait DeviceBackend: Send + Sync {
    /// Short name matched against the `type` key of a hint
    fn name(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    /// Addresses of all devices matching `hint`
    fn find(&self, hint: &DeviceAddr) -> Vec<DeviceAddr>;

    /// Open the device at a fully resolved address
    fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn Device>>;
}

/// Ordered set of device backends
pub struct DeviceRegistry {
    backends: Vec<Box<dyn DeviceBackend>>,
}

impl DeviceRegistry {
    /// Registry with no backends
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn register(&mut self, backend: impl DeviceBackend + 'static) {
        self.backends.push(Box::new(backend));
    }

    /// Builder-style `register`
    pub fn with_backend(mut self, backend: impl DeviceBackend + 'static) -> Self {
        self.register(backend);
        self
    }

    /// All devices of `kind` matching `hint`, in backend registration order
    pub fn find(&self, hint: &DeviceAddr, kind: DeviceKind) -> Vec<DeviceAddr> {
        self.matches(hint, kind)
            .into_iter()
            .map(|(_, addr)| addr)
            .collect()
    }

    /// Open one device of `kind` matching `hint`
    ///
    /// When several devices match, the `which` key selects among them
    /// (zero-based, default 0).
    pub fn make(&self, hint: &DeviceAddr, kind: DeviceKind) -> Result<Arc<dyn Device>> {
        let which: usize = hint.get_or("which", "0").parse().map_err(|_| {
            ClockError::InvalidDeviceAddr(format!(
                "which={:?} is not an index",
                hint.get_or("which", "")
            ))
        })?;

        let mut matches = self.matches(hint, kind);
        if matches.is_empty() {
            return Err(ClockError::NoDeviceFound(hint.to_pp_string()));
        }
        if which >= matches.len() {
            return Err(ClockError::InvalidDeviceAddr(format!(
                "which={} but only {} device(s) found",
                which,
                matches.len()
            )));
        }

        let (backend, addr) = matches.swap_remove(which);
        debug!(backend = backend.name(), %addr, "opening {} device", kind);
        backend.make(&addr)
    }

    fn matches(
        &self,
        hint: &DeviceAddr,
        kind: DeviceKind,
    ) -> Vec<(&dyn DeviceBackend, DeviceAddr)> {
        let wanted_type = hint.get("type");

        self.backends
            .iter()
            .filter(|backend| backend.kind() == kind)
            .filter(|backend| wanted_type.is_none_or(|t| t == backend.name()))
            .flat_map(|backend| {
                backend
                    .find(hint)
                    .into_iter()
                    .map(move |addr| (&**backend, addr))
            })
            .collect()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::empty().with_backend(SnapshotBackend::new(DeviceKind::Clock))
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| (b.name(), b.kind())))
            .finish()
    }
}

/// Device wrapping an already populated property tree
#[derive(Debug, Clone)]
pub struct TreeDevice {
    kind: DeviceKind,
    tree: Arc<dyn PropertyTree>,
}

impl TreeDevice {
    pub fn new(kind: DeviceKind, tree: Arc<dyn PropertyTree>) -> Self {
        Self { kind, tree }
    }

    /// Clock device over `tree`
    pub fn clock(tree: impl PropertyTree + 'static) -> Self {
        Self::new(DeviceKind::Clock, Arc::new(tree))
    }
}

impl Device for TreeDevice {
    fn get_tree(&self) -> Arc<dyn PropertyTree> {
        Arc::clone(&self.tree)
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }
}

/// Opens devices from property tree snapshots on disk
///
/// Address form: `type=snapshot,file=<path>`. JSON by default, CBOR when the
/// file ends in `.cbor`.
#[derive(Debug, Clone)]
pub struct SnapshotBackend {
    kind: DeviceKind,
}

impl SnapshotBackend {
    pub const NAME: &'static str = "snapshot";

    pub fn new(kind: DeviceKind) -> Self {
        Self { kind }
    }
}

impl DeviceBackend for SnapshotBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn find(&self, hint: &DeviceAddr) -> Vec<DeviceAddr> {
        match hint.get("file") {
            Some(file) if Path::new(file).is_file() => {
                let mut addr = DeviceAddr::new().with("type", Self::NAME).with("file", file);
                for (key, value) in hint.iter() {
                    if key != "which" && !addr.contains(key) {
                        addr.insert(key, value);
                    }
                }
                vec![addr]
            }
            _ => Vec::new(),
        }
    }

    fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn Device>> {
        let file = addr
            .get("file")
            .ok_or_else(|| ClockError::InvalidDeviceAddr("snapshot requires file=".into()))?;

        let tree = JsonPropertyTree::load(file)?;
        Ok(Arc::new(TreeDevice::new(self.kind, Arc::new(tree))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_TREE: &str = r#"{"mboards": {"0": {"time": 12}}}"#;

    fn snapshot_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_make_snapshot_device() {
        let file = snapshot_file(SAMPLE_TREE);
        let hint = DeviceAddr::new().with("file", file.path().to_string_lossy());

        let device = DeviceRegistry::default()
            .make(&hint, DeviceKind::Clock)
            .unwrap();

        assert_eq!(device.kind(), DeviceKind::Clock);
        assert_eq!(device.get_tree().list("/mboards"), vec!["0"]);
    }

    #[test]
    fn test_no_device_found() {
        let hint = DeviceAddr::parse("file=/nonexistent/clock.json").unwrap();

        let err = DeviceRegistry::default()
            .make(&hint, DeviceKind::Clock)
            .unwrap_err();
        assert!(matches!(err, ClockError::NoDeviceFound(_)));
    }

    #[test]
    fn test_kind_filter() {
        let file = snapshot_file(SAMPLE_TREE);
        let hint = DeviceAddr::new().with("file", file.path().to_string_lossy());

        let registry = DeviceRegistry::default();
        assert_eq!(registry.find(&hint, DeviceKind::Clock).len(), 1);
        assert!(registry.find(&hint, DeviceKind::Usrp).is_empty());
    }

    #[test]
    fn test_type_filter() {
        let file = snapshot_file(SAMPLE_TREE);
        let hint = DeviceAddr::new()
            .with("type", "octoclock")
            .with("file", file.path().to_string_lossy());

        assert!(DeviceRegistry::default().find(&hint, DeviceKind::Clock).is_empty());
    }

    #[test]
    fn test_which_selects_device() {
        let first = snapshot_file(r#"{"mboards": {"0": {}}}"#);
        let second = snapshot_file(r#"{"mboards": {"0": {}, "1": {}}}"#);

        let registry = DeviceRegistry::empty()
            .with_backend(FixedBackend(first.path().to_string_lossy().into_owned()))
            .with_backend(FixedBackend(second.path().to_string_lossy().into_owned()));

        let device = registry
            .make(&DeviceAddr::parse("which=1").unwrap(), DeviceKind::Clock)
            .unwrap();
        assert_eq!(device.get_tree().list("/mboards").len(), 2);

        let err = registry
            .make(&DeviceAddr::parse("which=2").unwrap(), DeviceKind::Clock)
            .unwrap_err();
        assert!(matches!(err, ClockError::InvalidDeviceAddr(_)));

        let err = registry
            .make(&DeviceAddr::parse("which=first").unwrap(), DeviceKind::Clock)
            .unwrap_err();
        assert!(matches!(err, ClockError::InvalidDeviceAddr(_)));
    }

    /// Snapshot backend pinned to one file, whatever the hint says
    struct FixedBackend(String);

    impl DeviceBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn kind(&self) -> DeviceKind {
            DeviceKind::Clock
        }

        fn find(&self, _hint: &DeviceAddr) -> Vec<DeviceAddr> {
            vec![DeviceAddr::new().with("type", "fixed").with("file", self.0.as_str())]
        }

        fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn Device>> {
            SnapshotBackend::new(DeviceKind::Clock).make(addr)
        }
    }
}
