//! Resolved channel descriptors.
//!
//! A [`ChannelInfo`] binds a caller-facing channel name, under one
//! [`AddressingScheme`], to the concrete kernel identity of the pin: the GPIO
//! chip directory, the chip-relative and global line numbers, and, where the
//! pin can be muxed to a PWM output, the PWM chip and channel id.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use strum::{Display, EnumIter, EnumString};

/// Pin naming convention used to address channels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AddressingScheme {
    /// Physical 40-pin header position ("7", "12", ...)
    Board,
    /// Raspberry Pi compatible numbering
    Bcm,
    /// Connector (CVM) signal name
    Cvm,
    /// Tegra SoC pad name
    TegraSoc,
}

/// Kernel identity of one channel. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name under the scheme this descriptor was resolved for
    pub channel: String,
    /// Absolute path of the GPIO chip device directory
    pub gpio_chip_dir: PathBuf,
    /// Line number relative to the chip
    pub chip_gpio: u32,
    /// Global line number (chip base + chip-relative line)
    pub gpio: u32,
    /// Name of the line's directory under the gpio class, e.g. "gpio218"
    pub gpio_name: String,
    /// Absolute path of the `pwmchipN` directory, if the pin has PWM
    pub pwm_chip_dir: Option<PathBuf>,
    /// PWM channel id within the chip
    pub pwm_id: Option<u32>,
}

impl ChannelInfo {
    /// True when both the PWM chip and the channel id are known.
    pub fn has_pwm(&self) -> bool {
        self.pwm_chip_dir.is_some() && self.pwm_id.is_some()
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Channel Info for \"{}\"", self.channel)?;
        writeln!(f, "    GPIO chip dir: {}", self.gpio_chip_dir.display())?;
        writeln!(f, "    Chip GPIO:     {}", self.chip_gpio)?;
        writeln!(f, "    GPIO:          {}", self.gpio)?;
        writeln!(f, "    GPIO name:     {}", self.gpio_name)?;
        match &self.pwm_chip_dir {
            Some(dir) => writeln!(f, "    PWM chip dir:  {}", dir.display())?,
            None => writeln!(f, "    PWM chip dir:  N/A")?,
        }
        match self.pwm_id {
            Some(id) => write!(f, "    PWM id:        {}", id),
            None => write!(f, "    PWM id:        N/A"),
        }
    }
}

/// Channel name to descriptor, for one addressing scheme.
pub type ChannelMap = BTreeMap<String, ChannelInfo>;
