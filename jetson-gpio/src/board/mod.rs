//! Board definitions.
//!
//! A [`BoardCatalog`] is the ordered list of boards the resolver can detect.
//! Each [`BoardDefinition`] carries the device-tree compatible strings that
//! identify the board, descriptive [`BoardInformation`], and one
//! [`PinDefinition`] per header pin. The built-in catalog covers the Jetson
//! Xavier, AGX Xavier and Nano developer kits; an external JSON catalog can
//! replace it.

mod tables;

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoEnumIterator};

use crate::{
    channel::AddressingScheme,
    error::{Error, Result},
};

/// Supported hardware variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardType {
    #[default]
    #[strum(serialize = "Unknown board type")]
    Unknown,
    #[strum(serialize = "Jetson Xavier")]
    JetsonXavier,
    #[strum(serialize = "Jetson AGX Xavier")]
    JetsonAgxXavier,
    #[strum(serialize = "Jetson Nano")]
    JetsonNano,
}

/// Descriptive data about a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInformation {
    pub p1_revision: i32,
    /// RAM size in megabytes
    pub ram_size: u32,
    pub revision: i32,
    /// Human-readable board name
    pub name: String,
    pub manufacturer: String,
    pub processor: String,
    /// Carrier-board id; the device tree lists an id entry prefixed with it
    /// when the module sits on the matching developer-kit carrier.
    pub carrier_board: u32,
}

/// One physical header pin of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDefinition {
    /// Line number relative to the GPIO chip
    pub chip_gpio: u32,
    /// GPIO chip device directory name, e.g. "2200000.gpio"
    pub gpio_chip: String,
    /// Physical header position
    pub board_pin: u32,
    /// Raspberry Pi compatible number
    pub bcm_pin: u32,
    /// Connector signal name
    pub cvm_name: String,
    /// SoC pad name
    pub tegra_soc_name: String,
    /// PWM chip device directory name, if the pin can output PWM
    #[serde(default)]
    pub pwm_chip: Option<String>,
    #[serde(default)]
    pub pwm_id: Option<u32>,
}

impl PinDefinition {
    /// Name of this pin under the given addressing scheme.
    pub fn name(&self, scheme: AddressingScheme) -> String {
        match scheme {
            AddressingScheme::Board => self.board_pin.to_string(),
            AddressingScheme::Bcm => self.bcm_pin.to_string(),
            AddressingScheme::Cvm => self.cvm_name.clone(),
            AddressingScheme::TegraSoc => self.tegra_soc_name.clone(),
        }
    }
}

/// Everything known about one supported board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDefinition {
    pub board_type: BoardType,
    pub info: BoardInformation,
    /// Device-tree compatible strings identifying this board
    pub compatibles: Vec<String>,
    pub pins: Vec<PinDefinition>,
}

impl BoardDefinition {
    /// Check that the definition can be resolved without losing pins.
    pub fn validate(&self) -> Result<()> {
        if self.board_type == BoardType::Unknown {
            return Err(Error::BoardDefinition(format!(
                "board {:?} has no board type",
                self.info.name
            )));
        }

        if self.compatibles.is_empty() {
            return Err(Error::BoardDefinition(format!(
                "board {:?} lists no compatible strings",
                self.info.name
            )));
        }

        for scheme in AddressingScheme::iter() {
            let mut seen = HashSet::new();
            for pin in &self.pins {
                let name = pin.name(scheme);
                if !seen.insert(name.clone()) {
                    return Err(Error::BoardDefinition(format!(
                        "board {:?} defines channel {:?} twice in {} addressing scheme",
                        self.info.name, name, scheme
                    )));
                }
            }
        }

        for pin in &self.pins {
            if pin.pwm_chip.is_some() != pin.pwm_id.is_some() {
                return Err(Error::BoardDefinition(format!(
                    "board {:?} pin {} must set both pwm_chip and pwm_id or neither",
                    self.info.name, pin.board_pin
                )));
            }
        }

        Ok(())
    }
}

/// Ordered set of boards considered during detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardCatalog {
    boards: Vec<BoardDefinition>,
}

impl BoardCatalog {
    /// Build a catalog, validating every board.
    pub fn new(boards: Vec<BoardDefinition>) -> Result<Self> {
        for board in &boards {
            board.validate()?;
        }
        Ok(Self { boards })
    }

    /// The Jetson developer kits this crate ships tables for.
    pub fn builtin() -> Self {
        Self {
            boards: tables::builtin_boards(),
        }
    }

    /// Parse a catalog from a JSON array of board definitions.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let boards: Vec<BoardDefinition> =
            serde_json::from_str(json).map_err(|e| Error::BoardDefinition(e.to_string()))?;
        Self::new(boards)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn boards(&self) -> &[BoardDefinition] {
        &self.boards
    }

    pub fn get(&self, board_type: BoardType) -> Option<&BoardDefinition> {
        self.boards.iter().find(|b| b.board_type == board_type)
    }

    /// First board, in catalog order, listing any of the detected compatible
    /// strings.
    pub fn find_compatible(&self, detected: &[String]) -> Option<&BoardDefinition> {
        self.boards.iter().find(|board| {
            board
                .compatibles
                .iter()
                .any(|compatible| detected.contains(compatible))
        })
    }
}

impl Default for BoardCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
