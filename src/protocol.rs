use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// 16-bit message type carried in every header.
///
/// Unknown values are preserved verbatim so replies from newer firmware can
/// still be parsed and filtered.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, derive_more::From, derive_more::Into)]
pub struct MessageType(u16);

impl MessageType {
    pub const GET_SERVICE: Self = Self(2);
    pub const STATE_SERVICE: Self = Self(3);
    pub const GET_HOST_FIRMWARE: Self = Self(14);
    pub const STATE_HOST_FIRMWARE: Self = Self(15);
    pub const GET_POWER: Self = Self(20);
    pub const SET_POWER: Self = Self(21);
    pub const STATE_POWER: Self = Self(22);
    pub const GET_LABEL: Self = Self(23);
    pub const SET_LABEL: Self = Self(24);
    pub const STATE_LABEL: Self = Self(25);
    pub const GET_VERSION: Self = Self(32);
    pub const STATE_VERSION: Self = Self(33);
    pub const ACKNOWLEDGEMENT: Self = Self(45);
    pub const ECHO_REQUEST: Self = Self(58);
    pub const ECHO_RESPONSE: Self = Self(59);
    pub const LIGHT_GET: Self = Self(101);
    pub const LIGHT_SET_COLOR: Self = Self(102);
    pub const LIGHT_STATE: Self = Self(107);
    pub const LIGHT_SET_POWER: Self = Self(117);
    pub const SET_WAVEFORM_OPTIONAL: Self = Self(119);
    pub const STATE_UNHANDLED: Self = Self(223);
    pub const GET_DEVICE_CHAIN: Self = Self(701);
    pub const STATE_DEVICE_CHAIN: Self = Self(702);
    pub const GET_TILE_STATE_64: Self = Self(707);
    pub const STATE_TILE_STATE_64: Self = Self(711);
    pub const SET_TILE_STATE_64: Self = Self(715);
    pub const GET_RELAY_POWER: Self = Self(816);
    pub const SET_RELAY_POWER: Self = Self(817);
    pub const STATE_RELAY_POWER: Self = Self(818);

    /// Creates a message type from its raw wire value.
    ///
    /// ```
    /// use lifxlan::MessageType;
    ///
    /// assert_eq!(MessageType::ACKNOWLEDGEMENT, MessageType::new(45));
    /// ```
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw wire value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns the catalogue entry for this message type, when known.
    ///
    /// ```
    /// use lifxlan::{KnownMessage, MessageType};
    ///
    /// assert_eq!(Some(KnownMessage::StateDeviceChain), MessageType::new(702).known());
    /// assert_eq!(None, MessageType::new(9999).known());
    /// ```
    #[must_use]
    pub fn known(self) -> Option<KnownMessage> {
        MESSAGES_BY_ID.get(&self.0).copied()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known() {
            Some(known) => write!(f, "{known}({})", self.0),
            None => write!(f, "<unknown>({})", self.0),
        }
    }
}

/// Named message types understood by this crate.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
pub enum KnownMessage {
    GetService,
    StateService,
    GetHostFirmware,
    StateHostFirmware,
    GetPower,
    SetPower,
    StatePower,
    GetLabel,
    SetLabel,
    StateLabel,
    GetVersion,
    StateVersion,
    Acknowledgement,
    EchoRequest,
    EchoResponse,
    LightGet,
    LightSetColor,
    LightState,
    LightSetPower,
    SetWaveformOptional,
    StateUnhandled,
    GetDeviceChain,
    StateDeviceChain,
    GetTileState64,
    StateTileState64,
    SetTileState64,
    GetRelayPower,
    SetRelayPower,
    StateRelayPower,
}

impl KnownMessage {
    /// Returns the wire message type for this catalogue entry.
    #[must_use]
    pub const fn message_type(self) -> MessageType {
        match self {
            Self::GetService => MessageType::GET_SERVICE,
            Self::StateService => MessageType::STATE_SERVICE,
            Self::GetHostFirmware => MessageType::GET_HOST_FIRMWARE,
            Self::StateHostFirmware => MessageType::STATE_HOST_FIRMWARE,
            Self::GetPower => MessageType::GET_POWER,
            Self::SetPower => MessageType::SET_POWER,
            Self::StatePower => MessageType::STATE_POWER,
            Self::GetLabel => MessageType::GET_LABEL,
            Self::SetLabel => MessageType::SET_LABEL,
            Self::StateLabel => MessageType::STATE_LABEL,
            Self::GetVersion => MessageType::GET_VERSION,
            Self::StateVersion => MessageType::STATE_VERSION,
            Self::Acknowledgement => MessageType::ACKNOWLEDGEMENT,
            Self::EchoRequest => MessageType::ECHO_REQUEST,
            Self::EchoResponse => MessageType::ECHO_RESPONSE,
            Self::LightGet => MessageType::LIGHT_GET,
            Self::LightSetColor => MessageType::LIGHT_SET_COLOR,
            Self::LightState => MessageType::LIGHT_STATE,
            Self::LightSetPower => MessageType::LIGHT_SET_POWER,
            Self::SetWaveformOptional => MessageType::SET_WAVEFORM_OPTIONAL,
            Self::StateUnhandled => MessageType::STATE_UNHANDLED,
            Self::GetDeviceChain => MessageType::GET_DEVICE_CHAIN,
            Self::StateDeviceChain => MessageType::STATE_DEVICE_CHAIN,
            Self::GetTileState64 => MessageType::GET_TILE_STATE_64,
            Self::StateTileState64 => MessageType::STATE_TILE_STATE_64,
            Self::SetTileState64 => MessageType::SET_TILE_STATE_64,
            Self::GetRelayPower => MessageType::GET_RELAY_POWER,
            Self::SetRelayPower => MessageType::SET_RELAY_POWER,
            Self::StateRelayPower => MessageType::STATE_RELAY_POWER,
        }
    }
}

/// Catalogue entries keyed by raw wire value.
static MESSAGES_BY_ID: LazyLock<HashMap<u16, KnownMessage>> = LazyLock::new(|| {
    KnownMessage::iter()
        .map(|known| (known.message_type().value(), known))
        .collect()
});
