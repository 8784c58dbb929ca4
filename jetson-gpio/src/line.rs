//! Value types shared by the line controllers.

use strum::{Display, EnumString};

/// Logical level of a GPIO line.
///
/// `Unknown` is returned when sampling a line that is not configured as an
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Signal {
    Low,
    High,
    Unknown,
}

impl Signal {
    /// Interpret a raw integer: `>= 1` is high, `0` is low, negative values
    /// have no meaning and yield `None`.
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Signal::Low),
            l if l > 0 => Some(Signal::High),
            _ => None,
        }
    }

    /// Interpret the first byte of a sysfs `value` file.
    pub(crate) fn from_sysfs_byte(byte: u8) -> Self {
        if byte == b'0' {
            Signal::Low
        } else {
            Signal::High
        }
    }

    pub(crate) fn as_sysfs(self) -> &'static str {
        match self {
            Signal::High => "1",
            _ => "0",
        }
    }
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        if value { Signal::High } else { Signal::Low }
    }
}

/// Line direction as written to the sysfs `direction` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Direction {
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "out")]
    Out,
}

impl Direction {
    pub(crate) fn as_sysfs(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Pull resistor configuration. Only meaningful for inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum Pull {
    #[default]
    Off,
    Up,
    Down,
}

/// Signal transition a callback subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Edge {
    Both,
    Rising,
    Falling,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_interpretation() {
        assert_eq!(Signal::from_level(0), Some(Signal::Low));
        assert_eq!(Signal::from_level(1), Some(Signal::High));
        assert_eq!(Signal::from_level(5), Some(Signal::High));
        assert_eq!(Signal::from_level(-1), None);
    }

    #[test]
    fn test_sysfs_byte() {
        assert_eq!(Signal::from_sysfs_byte(b'0'), Signal::Low);
        assert_eq!(Signal::from_sysfs_byte(b'1'), Signal::High);
        // Anything other than '0' reads as high
        assert_eq!(Signal::from_sysfs_byte(b'x'), Signal::High);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Out);
        assert_eq!(Direction::Out.to_string(), "out");
    }
}
