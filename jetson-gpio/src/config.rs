//! Filesystem locations of the kernel control surface.
//!
//! Every path the crate reads or writes is derived from a [`SysfsConfig`], so
//! a whole simulated tree can be substituted by rebasing it under another
//! root.

use std::path::{Path, PathBuf};

/// Kernel paths used for detection and line control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsConfig {
    /// Device-tree root holding `compatible` and the carrier-board ids.
    pub device_tree: PathBuf,

    /// Parent directories searched, in order, for GPIO and PWM chip devices.
    pub device_prefixes: Vec<PathBuf>,

    /// GPIO class directory holding `export`, `unexport` and `gpioN/`.
    pub gpio_class: PathBuf,

    /// Optional JSON board catalog replacing the built-in pin tables.
    pub boards_file: Option<PathBuf>,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self::with_root("/")
    }
}

impl SysfsConfig {
    /// Build a configuration with every kernel path rebased under `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            device_tree: root.join("proc/device-tree"),
            device_prefixes: vec![
                root.join("sys/devices"),
                root.join("sys/devices/platform"),
            ],
            gpio_class: root.join("sys/class/gpio"),
            boards_file: None,
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JETSON_GPIO_ROOT`: rebase all kernel paths under this directory
    /// - `JETSON_GPIO_BOARDS`: JSON board catalog to use instead of the
    ///   built-in tables
    pub fn from_env() -> Self {
        let mut config = match std::env::var_os("JETSON_GPIO_ROOT") {
            Some(root) if !root.is_empty() => Self::with_root(PathBuf::from(root)),
            _ => Self::default(),
        };

        config.boards_file = std::env::var_os("JETSON_GPIO_BOARDS")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        config
    }

    pub fn compatible_path(&self) -> PathBuf {
        self.device_tree.join("compatible")
    }

    pub fn carrier_ids_dir(&self) -> PathBuf {
        self.device_tree.join("chosen/plugin-manager/ids")
    }

    pub fn gpio_export_path(&self) -> PathBuf {
        self.gpio_class.join("export")
    }

    pub fn gpio_unexport_path(&self) -> PathBuf {
        self.gpio_class.join("unexport")
    }

    /// Directory the kernel creates for an exported line, e.g. `gpio218`.
    pub fn gpio_line_dir(&self, gpio_name: &str) -> PathBuf {
        self.gpio_class.join(gpio_name)
    }
}
