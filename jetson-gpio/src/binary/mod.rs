//! Binary (on/off) GPIO line control through the sysfs gpio class.
//!
//! A [`BinaryController`] owns one exported line for its whole lifetime:
//!
//! 1. Export: write the global line number to `/sys/class/gpio/export` unless
//!    `gpioN/` already exists, then wait for `gpioN/direction` to appear.
//! 2. Configure the direction and, for outputs, drive the initial level.
//! 3. For monitored inputs, select both-edge notifications and start an
//!    [`EdgeMonitor`].
//!
//! Dropping the controller drives outputs low, stops the monitor, closes the
//! attribute files and unexports the line. The unexport also runs when
//! construction fails part-way.

pub mod monitor;

use std::{
    path::PathBuf,
    sync::{Arc, PoisonError},
};

use crate::{
    channel::ChannelInfo,
    config::SysfsConfig,
    error::Result,
    line::{Direction, Edge, Pull, Signal},
    sysfs::{self, ControlFile},
    tracing::prelude::*,
};

use monitor::{EdgeMonitor, SharedCallbacks};

/// An exported line; unexports itself when dropped.
struct ExportedLine {
    gpio: u32,
    unexport_path: PathBuf,
}

impl ExportedLine {
    fn export(config: &SysfsConfig, info: &ChannelInfo) -> Result<Self> {
        let line_dir = config.gpio_line_dir(&info.gpio_name);
        let line = Self {
            gpio: info.gpio,
            unexport_path: config.gpio_unexport_path(),
        };

        if line_dir.exists() {
            debug!(line = %info.gpio_name, "Line already exported");
            return Ok(line);
        }

        sysfs::write_once(&config.gpio_export_path(), &info.gpio.to_string())?;
        debug!(line = %info.gpio_name, "Exported line");

        // On timeout `line` is dropped, which unexports it again
        sysfs::wait_for_files(&[&line_dir.join("direction")])?;
        Ok(line)
    }
}

impl Drop for ExportedLine {
    fn drop(&mut self) {
        match sysfs::write_once(&self.unexport_path, &self.gpio.to_string()) {
            Ok(()) => debug!(gpio = self.gpio, "Unexported line"),
            Err(e) => error!(gpio = self.gpio, error = %e, "Failed to unexport line"),
        }
    }
}

/// Controller for one GPIO line.
pub struct BinaryController {
    info: ChannelInfo,
    direction: Direction,
    pull: Pull,
    callbacks: SharedCallbacks,
    monitor: Option<EdgeMonitor>,
    direction_file: ControlFile,
    value_file: ControlFile,
    /// Held open while edge notifications are enabled
    #[expect(dead_code)]
    edge_file: Option<ControlFile>,
    // Last field: unexport happens after every handle above is closed
    _line: ExportedLine,
}

impl BinaryController {
    /// Export the line, set its direction and, for outputs, its initial level.
    pub(crate) fn new(
        config: &SysfsConfig,
        info: ChannelInfo,
        direction: Direction,
        initial: Signal,
        pull: Pull,
    ) -> Result<Self> {
        let line = ExportedLine::export(config, &info)?;
        let line_dir = config.gpio_line_dir(&info.gpio_name);

        let direction_file = ControlFile::open_write(line_dir.join("direction"))?;
        let value_file = ControlFile::open_read_write(line_dir.join("value"))?;

        let mut controller = Self {
            info,
            direction,
            pull,
            callbacks: SharedCallbacks::default(),
            monitor: None,
            direction_file,
            value_file,
            edge_file: None,
            _line: line,
        };

        controller.apply_direction()?;
        if direction == Direction::Out {
            controller.set(initial)?;
        } else if pull != Pull::Off {
            warn!(
                channel = %controller.info.channel,
                %pull,
                "Pull resistors cannot be configured through sysfs; using the pad's default"
            );
        }

        Ok(controller)
    }

    /// Export the line as an input and start dispatching edge callbacks.
    pub(crate) fn with_edge_monitor(
        config: &SysfsConfig,
        info: ChannelInfo,
        pull: Pull,
    ) -> Result<Self> {
        let mut controller = Self::new(config, info, Direction::In, Signal::Low, pull)?;
        let line_dir = config.gpio_line_dir(&controller.info.gpio_name);

        let mut edge_file = ControlFile::open_write(line_dir.join("edge"))?;
        edge_file.write_value("both")?;
        controller.edge_file = Some(edge_file);

        controller.monitor = Some(EdgeMonitor::spawn(
            &controller.info.gpio_name,
            &line_dir.join("value"),
            Arc::clone(&controller.callbacks),
        )?);

        Ok(controller)
    }

    fn apply_direction(&mut self) -> Result<()> {
        self.direction_file.write_value(self.direction.as_sysfs())?;
        debug!(line = %self.info.gpio_name, direction = %self.direction, "Set line direction");
        Ok(())
    }

    /// Drive the line from an integer level: `>= 1` is high, `0` is low and
    /// negative values are ignored. Has no effect on inputs.
    pub fn write(&mut self, level: i32) -> Result<()> {
        match Signal::from_level(level) {
            Some(signal) => self.set(signal),
            None => {
                trace!(channel = %self.info.channel, level, "Ignoring negative level");
                Ok(())
            }
        }
    }

    /// Drive the line high or low. Has no effect on inputs.
    pub fn set(&mut self, signal: Signal) -> Result<()> {
        if self.direction != Direction::Out || signal == Signal::Unknown {
            return Ok(());
        }
        self.value_file.write_value(signal.as_sysfs())
    }

    /// Sample an input line. Output lines report [`Signal::Unknown`].
    pub fn read(&mut self) -> Result<Signal> {
        if self.direction != Direction::In {
            return Ok(Signal::Unknown);
        }

        Ok(self
            .value_file
            .read_byte()?
            .map(Signal::from_sysfs_byte)
            .unwrap_or(Signal::Unknown))
    }

    /// Register `callback` for `edge`. Callbacks run on the monitor thread in
    /// registration order; registering the same callback twice runs it twice.
    pub fn register_callback<F>(&mut self, edge: Edge, callback: F)
    where
        F: Fn(Signal) + Send + 'static,
    {
        if self.monitor.is_none() {
            debug!(
                channel = %self.info.channel,
                "Callback registered on a line without edge monitoring; it will not fire"
            );
        }

        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(edge, Box::new(callback));
    }

    pub fn callback_count(&self, edge: Edge) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count(edge)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pull(&self) -> Pull {
        self.pull
    }

    pub fn channel(&self) -> &str {
        &self.info.channel
    }

    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }

    pub fn is_monitored(&self) -> bool {
        self.monitor.is_some()
    }
}

impl Drop for BinaryController {
    fn drop(&mut self) {
        if self.direction == Direction::Out {
            if let Err(e) = self.set(Signal::Low) {
                error!(channel = %self.info.channel, error = %e, "Failed to drive line low");
            }
        }

        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
        }

        debug!(channel = %self.info.channel, line = %self.info.gpio_name, "Releasing line");
    }
}
