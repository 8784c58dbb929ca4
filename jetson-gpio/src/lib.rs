//! GPIO and PWM access for NVIDIA Jetson developer kits through sysfs.
//!
//! [`Gpio`] detects the board from the device tree, resolves every header
//! pin under four addressing schemes and hands out controllers:
//!
//! ```no_run
//! use jetson_gpio::{AddressingScheme, Direction, Gpio, Pull, Signal};
//!
//! # fn main() -> jetson_gpio::Result<()> {
//! let mut gpio = Gpio::from_env()?;
//! gpio.detect()?;
//! gpio.set_mode(AddressingScheme::Board)?;
//!
//! let led = gpio.create_binary("12", Direction::Out, Signal::Low, Pull::Off)?;
//! led.write(1)?;
//!
//! let fan = gpio.create_pwm("32", 25_000.0, 40.0)?;
//! fan.start()?;
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod board;
pub mod channel;
pub mod config;
pub mod error;
pub mod line;
pub mod pwm;
pub mod registry;
pub mod resolver;
pub mod sysfs;
pub mod tracing;

pub use binary::BinaryController;
pub use board::{BoardCatalog, BoardDefinition, BoardInformation, BoardType, PinDefinition};
pub use channel::{AddressingScheme, ChannelInfo, ChannelMap};
pub use config::SysfsConfig;
pub use error::{Error, Result};
pub use line::{Direction, Edge, Pull, Signal};
pub use pwm::PwmController;
pub use registry::Gpio;
pub use resolver::{BoardTopologyResolver, Topology};
