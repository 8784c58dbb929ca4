//! Error types for board detection and line control.

use std::path::PathBuf;

use crate::channel::AddressingScheme;

/// Errors produced while resolving the board topology or driving lines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device-tree compatible data was unreadable or matched no board.
    #[error("Board detection failed: {0}")]
    Detection(String),

    /// A GPIO chip referenced by the pin table is not exposed by the kernel.
    #[error("Cannot find GPIO chip {chip}")]
    ChipNotFound { chip: String },

    /// An exported line or channel never produced its control files.
    #[error("Timed out after {attempts} attempts waiting for {}", path.display())]
    ExportTimeout { path: PathBuf, attempts: u32 },

    /// The addressing scheme can only be chosen once.
    #[error("Addressing scheme already set to {0}")]
    ModeAlreadySet(AddressingScheme),

    /// A controller was requested before an addressing scheme was chosen.
    #[error("Addressing scheme not set")]
    ModeNotSet,

    /// Channel data was requested before a successful detection.
    #[error("Board not detected")]
    NotDetected,

    #[error("Channel {channel:?} not found in {scheme} addressing scheme")]
    ChannelNotFound {
        scheme: AddressingScheme,
        channel: String,
    },

    /// A controller of the same kind is already live on this channel.
    #[error("Channel {channel:?} already has a live controller")]
    ChannelInUse { channel: String },

    /// The channel has no PWM chip or PWM id.
    #[error("Channel {channel:?} has no PWM capability")]
    PwmUnavailable { channel: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The board catalog could not be parsed or failed validation.
    #[error("Invalid board definition: {0}")]
    BoardDefinition(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
