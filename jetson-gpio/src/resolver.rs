//! Board topology resolution.
//!
//! Detection runs once at startup and turns the static board tables into
//! concrete kernel paths:
//!
//! 1. Read `/proc/device-tree/compatible` (NUL-separated strings) and pick
//!    the first catalog board listing any of them.
//! 2. Check the carrier-board ids directory for an entry prefixed with the
//!    board's carrier id. A miss only produces a warning.
//! 3. Locate each GPIO chip device directory under the device prefixes and
//!    read `base`/`ngpio` from its `gpio/gpiochipN` entry.
//! 4. Locate each PWM chip and its `pwm/pwmchipN` entry. PWM chips are
//!    optional; a missing one only disables PWM on the pins using it.
//! 5. Emit one [`ChannelInfo`] per pin per addressing scheme.
//!
//! Resolution only reads from the filesystem.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::PathBuf,
};

use strum::IntoEnumIterator;

use crate::{
    board::{BoardCatalog, BoardDefinition, BoardInformation, BoardType, PinDefinition},
    channel::{AddressingScheme, ChannelInfo, ChannelMap},
    config::SysfsConfig,
    error::{Error, Result},
    sysfs,
    tracing::prelude::*,
};

const GPIO_CHIP_PREFIX: &str = "gpiochip";
const PWM_CHIP_PREFIX: &str = "pwmchip";
const GPIO_NAME_PREFIX: &str = "gpio";

/// Result of a successful detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub board_type: BoardType,
    pub info: BoardInformation,
    /// Matching carrier-board id entry, `None` on third-party carriers
    pub carrier_board: Option<String>,
    pub channels: BTreeMap<AddressingScheme, ChannelMap>,
}

impl Topology {
    pub fn channel(&self, scheme: AddressingScheme, channel: &str) -> Option<&ChannelInfo> {
        self.channels.get(&scheme).and_then(|map| map.get(channel))
    }
}

/// A GPIO controller chip as exposed by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GpioChip {
    dir: PathBuf,
    base: u32,
    ngpio: u32,
}

/// Resolves the catalog against one filesystem tree.
pub struct BoardTopologyResolver<'a> {
    config: &'a SysfsConfig,
    catalog: &'a BoardCatalog,
}

impl<'a> BoardTopologyResolver<'a> {
    pub fn new(config: &'a SysfsConfig, catalog: &'a BoardCatalog) -> Self {
        Self { config, catalog }
    }

    pub fn resolve(&self) -> Result<Topology> {
        let compatibles = self.read_compatibles()?;
        let board = self.catalog.find_compatible(&compatibles).ok_or_else(|| {
            Error::Detection(format!(
                "no known board matches compatibles {:?}",
                compatibles
            ))
        })?;

        debug!(board = %board.board_type, "Matched board from compatibles");

        let carrier_board = self.probe_carrier_board(board)?;
        let gpio_chips = self.probe_gpio_chips(&board.pins)?;
        let pwm_chips = self.probe_pwm_chips(&board.pins)?;

        let mut resolved = Vec::with_capacity(board.pins.len());
        for pin in &board.pins {
            resolved.push((pin, resolve_pin(pin, &gpio_chips, &pwm_chips)?));
        }

        let mut channels = BTreeMap::new();
        for scheme in AddressingScheme::iter() {
            let map: ChannelMap = resolved
                .iter()
                .map(|(pin, info)| {
                    let name = pin.name(scheme);
                    let info = ChannelInfo {
                        channel: name.clone(),
                        ..info.clone()
                    };
                    (name, info)
                })
                .collect();
            channels.insert(scheme, map);
        }

        info!(
            board = %board.board_type,
            carrier = ?carrier_board,
            pins = board.pins.len(),
            "Board topology resolved"
        );

        Ok(Topology {
            board_type: board.board_type,
            info: board.info.clone(),
            carrier_board,
            channels,
        })
    }

    fn read_compatibles(&self) -> Result<Vec<String>> {
        let path = self.config.compatible_path();
        let raw = fs::read(&path).map_err(|e| {
            Error::Detection(format!(
                "failed to read compatible file at {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(parse_compatibles(&raw))
    }

    fn probe_carrier_board(&self, board: &BoardDefinition) -> Result<Option<String>> {
        let ids_dir = self.config.carrier_ids_dir();
        if !ids_dir.is_dir() {
            return Err(Error::Detection(format!(
                "ids path {} does not exist",
                ids_dir.display()
            )));
        }

        let carrier_id = board.info.carrier_board.to_string();
        let matching = sysfs::entries_with_prefix(&ids_dir, &carrier_id)?
            .into_iter()
            .next();

        match &matching {
            Some(entry) => debug!(id = %entry, "Carrier board identified"),
            None => warn!(
                carrier = board.info.carrier_board,
                "Carrier board is not from a Jetson developer kit; \
                 this library has not been verified with it and is unlikely to work correctly"
            ),
        }

        Ok(matching)
    }

    /// First device prefix under which `name` exists.
    fn locate_device(&self, name: &str) -> Option<PathBuf> {
        self.config
            .device_prefixes
            .iter()
            .map(|prefix| prefix.join(name))
            .find(|dir| dir.exists())
    }

    fn probe_gpio_chips(&self, pins: &[PinDefinition]) -> Result<BTreeMap<String, GpioChip>> {
        let names: BTreeSet<&str> = pins.iter().map(|p| p.gpio_chip.as_str()).collect();
        let mut chips = BTreeMap::new();

        for name in names {
            let not_found = || Error::ChipNotFound {
                chip: name.to_string(),
            };

            let dir = self.locate_device(name).ok_or_else(not_found)?;
            let gpio_dir = dir.join("gpio");
            let entry = sysfs::entries_with_prefix(&gpio_dir, GPIO_CHIP_PREFIX)
                .map_err(|_| not_found())?
                .into_iter()
                .next()
                .ok_or_else(not_found)?;

            let chip_dir = gpio_dir.join(&entry);
            let base = sysfs::read_integer(&chip_dir.join("base"))?;
            let ngpio = sysfs::read_integer(&chip_dir.join("ngpio"))?;

            debug!(chip = name, dir = %dir.display(), base, ngpio, "Found GPIO chip");
            chips.insert(name.to_string(), GpioChip { dir, base, ngpio });
        }

        Ok(chips)
    }

    fn probe_pwm_chips(&self, pins: &[PinDefinition]) -> Result<BTreeMap<String, PathBuf>> {
        let names: BTreeSet<&str> = pins.iter().filter_map(|p| p.pwm_chip.as_deref()).collect();
        let mut chips = BTreeMap::new();

        for name in names {
            let Some(dir) = self.locate_device(name) else {
                debug!(chip = name, "PWM chip not present");
                continue;
            };

            let pwm_dir = dir.join("pwm");
            if !pwm_dir.is_dir() {
                debug!(chip = name, "PWM chip has no pwm directory");
                continue;
            }

            match sysfs::entries_with_prefix(&pwm_dir, PWM_CHIP_PREFIX)?
                .into_iter()
                .next()
            {
                Some(entry) => {
                    let path = pwm_dir.join(entry);
                    debug!(chip = name, path = %path.display(), "Found PWM chip");
                    chips.insert(name.to_string(), path);
                }
                None => debug!(chip = name, "PWM chip exposes no pwmchip entry"),
            }
        }

        Ok(chips)
    }
}

/// Split the device-tree compatible blob into its strings.
fn parse_compatibles(raw: &[u8]) -> Vec<String> {
    raw.split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Scheme-independent part of a pin's descriptor; `channel` is left empty.
fn resolve_pin(
    pin: &PinDefinition,
    gpio_chips: &BTreeMap<String, GpioChip>,
    pwm_chips: &BTreeMap<String, PathBuf>,
) -> Result<ChannelInfo> {
    let chip = gpio_chips
        .get(&pin.gpio_chip)
        .ok_or_else(|| Error::ChipNotFound {
            chip: pin.gpio_chip.clone(),
        })?;

    if pin.chip_gpio >= chip.ngpio {
        warn!(
            chip = %pin.gpio_chip,
            line = pin.chip_gpio,
            ngpio = chip.ngpio,
            "Pin line number exceeds the chip's line count"
        );
    }

    let gpio = chip.base + pin.chip_gpio;

    Ok(ChannelInfo {
        channel: String::new(),
        gpio_chip_dir: chip.dir.clone(),
        chip_gpio: pin.chip_gpio,
        gpio,
        gpio_name: format!("{}{}", GPIO_NAME_PREFIX, gpio),
        pwm_chip_dir: pin
            .pwm_chip
            .as_ref()
            .and_then(|name| pwm_chips.get(name).cloned()),
        pwm_id: pin.pwm_id,
    })
}
