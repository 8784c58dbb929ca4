//! The [`Gpio`] facade.
//!
//! Holds the resolved topology, the addressing scheme chosen by the caller
//! and every live controller. At most one [`BinaryController`] and at most
//! one [`PwmController`] exist per channel; creating a second binary
//! controller fails with [`Error::ChannelInUse`], while creating a second PWM
//! controller updates the live one in place.

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    binary::BinaryController,
    board::{BoardCatalog, BoardInformation, BoardType},
    channel::{AddressingScheme, ChannelInfo, ChannelMap},
    config::SysfsConfig,
    error::{Error, Result},
    line::{Direction, Pull, Signal},
    pwm::PwmController,
    resolver::{BoardTopologyResolver, Topology},
    tracing::prelude::*,
};

/// Entry point for board detection and channel control.
pub struct Gpio {
    config: SysfsConfig,
    catalog: BoardCatalog,
    topology: Option<Topology>,
    mode: Option<AddressingScheme>,
    binaries: HashMap<String, BinaryController>,
    pwms: HashMap<String, PwmController>,
}

impl Gpio {
    /// Create a facade over `config`, using the catalog named by
    /// `config.boards_file` or the built-in one.
    pub fn new(config: SysfsConfig) -> Result<Self> {
        let catalog = match &config.boards_file {
            Some(path) => {
                debug!(path = %path.display(), "Loading board catalog");
                BoardCatalog::from_json_file(path)?
            }
            None => BoardCatalog::builtin(),
        };
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: SysfsConfig, catalog: BoardCatalog) -> Self {
        Self {
            config,
            catalog,
            topology: None,
            mode: None,
            binaries: HashMap::new(),
            pwms: HashMap::new(),
        }
    }

    /// Create a facade configured from `JETSON_GPIO_ROOT` and
    /// `JETSON_GPIO_BOARDS`.
    pub fn from_env() -> Result<Self> {
        Self::new(SysfsConfig::from_env())
    }

    /// Identify the board and resolve every channel. Running it again
    /// re-resolves against the current filesystem; live controllers keep
    /// the descriptors they were created with.
    pub fn detect(&mut self) -> Result<()> {
        let topology = BoardTopologyResolver::new(&self.config, &self.catalog).resolve()?;
        info!(board = %topology.board_type, name = %topology.info.name, "Board detected");
        self.topology = Some(topology);
        Ok(())
    }

    pub fn is_detected(&self) -> bool {
        self.topology.is_some()
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Detected board type, [`BoardType::Unknown`] before detection.
    pub fn board_type(&self) -> BoardType {
        self.topology
            .as_ref()
            .map(|t| t.board_type)
            .unwrap_or_default()
    }

    pub fn board_name(&self) -> Option<&str> {
        self.board_info().map(|info| info.name.as_str())
    }

    pub fn board_info(&self) -> Option<&BoardInformation> {
        self.topology.as_ref().map(|t| &t.info)
    }

    /// Carrier-board id entry found during detection.
    pub fn carrier_board(&self) -> Option<&str> {
        self.topology.as_ref()?.carrier_board.as_deref()
    }

    /// Choose the addressing scheme used by the controller methods. Can only
    /// be done once.
    pub fn set_mode(&mut self, scheme: AddressingScheme) -> Result<()> {
        if let Some(current) = self.mode {
            return Err(Error::ModeAlreadySet(current));
        }
        debug!(%scheme, "Addressing scheme set");
        self.mode = Some(scheme);
        Ok(())
    }

    pub fn mode(&self) -> Option<AddressingScheme> {
        self.mode
    }

    /// Look up a channel under any scheme, independent of the chosen mode.
    pub fn channel_info(&self, scheme: AddressingScheme, channel: &str) -> Result<&ChannelInfo> {
        self.channels(scheme)?
            .get(channel)
            .ok_or_else(|| Error::ChannelNotFound {
                scheme,
                channel: channel.to_string(),
            })
    }

    /// Every channel of one scheme, ordered by name.
    pub fn channels(&self, scheme: AddressingScheme) -> Result<&ChannelMap> {
        let topology = self.topology.as_ref().ok_or(Error::NotDetected)?;
        topology.channels.get(&scheme).ok_or(Error::NotDetected)
    }

    /// Descriptor of `channel` under the chosen mode.
    fn resolve_channel(&self, channel: &str) -> Result<ChannelInfo> {
        if self.topology.is_none() {
            return Err(Error::NotDetected);
        }
        let scheme = self.mode.ok_or(Error::ModeNotSet)?;
        self.channel_info(scheme, channel).cloned()
    }

    /// Export `channel` as a plain input or output line.
    ///
    /// Pull resistors only apply to inputs; an output with a pull other than
    /// [`Pull::Off`] is rejected.
    pub fn create_binary(
        &mut self,
        channel: &str,
        direction: Direction,
        initial: Signal,
        pull: Pull,
    ) -> Result<&mut BinaryController> {
        let info = self.resolve_channel(channel)?;
        if direction == Direction::Out && pull != Pull::Off {
            return Err(Error::InvalidParameter(format!(
                "pull {} requested on output channel {:?}",
                pull, channel
            )));
        }

        match self.binaries.entry(channel.to_string()) {
            Entry::Occupied(_) => Err(Error::ChannelInUse {
                channel: channel.to_string(),
            }),
            Entry::Vacant(slot) => {
                let controller =
                    BinaryController::new(&self.config, info, direction, initial, pull)?;
                debug!(channel, %direction, "Binary controller created");
                Ok(slot.insert(controller))
            }
        }
    }

    /// Export `channel` as an input and start delivering edge callbacks.
    pub fn create_edge_binary(&mut self, channel: &str, pull: Pull) -> Result<&mut BinaryController> {
        let info = self.resolve_channel(channel)?;

        match self.binaries.entry(channel.to_string()) {
            Entry::Occupied(_) => Err(Error::ChannelInUse {
                channel: channel.to_string(),
            }),
            Entry::Vacant(slot) => {
                let controller = BinaryController::with_edge_monitor(&self.config, info, pull)?;
                debug!(channel, "Edge-monitored binary controller created");
                Ok(slot.insert(controller))
            }
        }
    }

    pub fn binary(&mut self, channel: &str) -> Option<&mut BinaryController> {
        self.binaries.get_mut(channel)
    }

    /// Release the binary controller on `channel`, if any.
    pub fn destroy_binary(&mut self, channel: &str) {
        if self.binaries.remove(channel).is_some() {
            debug!(channel, "Binary controller destroyed");
        }
    }

    pub fn destroy_all_binaries(&mut self) {
        for (channel, controller) in self.binaries.drain() {
            drop(controller);
            debug!(channel = %channel, "Binary controller destroyed");
        }
    }

    /// Export `channel` as a PWM output, or update the live controller's duty
    /// cycle and frequency if one already exists.
    pub fn create_pwm(
        &mut self,
        channel: &str,
        frequency_hz: f64,
        duty_cycle: f64,
    ) -> Result<&mut PwmController> {
        let info = self.resolve_channel(channel)?;

        match self.pwms.entry(channel.to_string()) {
            Entry::Occupied(slot) => {
                let pwm = slot.into_mut();
                pwm.reset_duty_cycle(duty_cycle)?;
                pwm.reset_frequency(frequency_hz)?;
                debug!(channel, frequency_hz, duty_cycle, "PWM controller updated");
                Ok(pwm)
            }
            Entry::Vacant(slot) => {
                let pwm = PwmController::new(&info, frequency_hz, duty_cycle)?;
                debug!(channel, frequency_hz, duty_cycle, "PWM controller created");
                Ok(slot.insert(pwm))
            }
        }
    }

    pub fn pwm(&mut self, channel: &str) -> Option<&mut PwmController> {
        self.pwms.get_mut(channel)
    }

    /// Stop and release the PWM controller on `channel`, if any.
    pub fn destroy_pwm(&mut self, channel: &str) {
        if let Some(pwm) = self.pwms.remove(channel) {
            release_pwm(channel, pwm);
        }
    }

    pub fn destroy_all_pwms(&mut self) {
        for (channel, pwm) in self.pwms.drain() {
            release_pwm(&channel, pwm);
        }
    }
}

fn release_pwm(channel: &str, mut pwm: PwmController) {
    if let Err(e) = pwm.stop() {
        warn!(channel, error = %e, "Failed to stop PWM before release");
    }
    drop(pwm);
    debug!(channel, "PWM controller destroyed");
}

impl Drop for Gpio {
    fn drop(&mut self) {
        self.destroy_all_pwms();
        self.destroy_all_binaries();
    }
}
