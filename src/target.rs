use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

const MAC_LEN: usize = 6;

/// Errors returned when parsing a [`Target`] from text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetParseError {
    #[error("target `{value}` must be six colon- or dash-separated hex octets")]
    InvalidFormat { value: String },
    #[error("target `{value}` contains invalid hex")]
    InvalidHex {
        value: String,
        #[source]
        source: hex::FromHexError,
    },
}

/// Six-byte MAC address identifying one device.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::From, derive_more::Into)]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    /// Creates a MAC address from its octets.
    #[must_use]
    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }

    /// Returns the address octets.
    #[must_use]
    pub const fn octets(self) -> [u8; MAC_LEN] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|octet| format!("{octet:02x}"))
            .collect::<Vec<_>>()
            .join(":");
        f.write_str(&rendered)
    }
}

/// Addressing key for a device.
///
/// [`Target::AllDevices`] is the wildcard: it matches every target, and
/// every target matches it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum Target {
    /// Wildcard that addresses every device on the network.
    #[default]
    AllDevices,
    /// One device, addressed by MAC address.
    Device(MacAddress),
}

impl Target {
    /// Decodes the 64-bit little-endian wire representation.
    ///
    /// Only the first six bytes are meaningful; all-zero means
    /// [`Target::AllDevices`].
    ///
    /// ```
    /// use lifxlan::Target;
    ///
    /// assert_eq!(Target::AllDevices, Target::from_wire(0));
    /// assert_eq!("01:00:00:00:00:00", Target::from_wire(1).to_string());
    /// ```
    #[must_use]
    pub fn from_wire(value: u64) -> Self {
        let bytes = value.to_le_bytes();
        let mut octets = [0_u8; MAC_LEN];
        octets.copy_from_slice(&bytes[..MAC_LEN]);
        if octets == [0; MAC_LEN] {
            Self::AllDevices
        } else {
            Self::Device(MacAddress(octets))
        }
    }

    /// Encodes the 64-bit little-endian wire representation.
    #[must_use]
    pub fn to_wire(self) -> u64 {
        match self {
            Self::AllDevices => 0,
            Self::Device(mac) => {
                let mut bytes = [0_u8; 8];
                bytes[..MAC_LEN].copy_from_slice(&mac.octets());
                u64::from_le_bytes(bytes)
            }
        }
    }

    /// Returns whether two targets address the same device.
    ///
    /// ```
    /// use lifxlan::Target;
    ///
    /// let device: Target = "d0:73:d5:01:02:03".parse()?;
    /// assert!(device.matches(Target::AllDevices));
    /// assert!(Target::AllDevices.matches(device));
    /// assert!(!device.matches("d0:73:d5:01:02:04".parse()?));
    /// # Ok::<(), lifxlan::TargetParseError>(())
    /// ```
    #[must_use]
    pub fn matches(self, other: Target) -> bool {
        match (self, other) {
            (Self::AllDevices, _) | (_, Self::AllDevices) => true,
            (Self::Device(left), Self::Device(right)) => left == right,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllDevices => MacAddress([0; MAC_LEN]).fmt(f),
            Self::Device(mac) => mac.fmt(f),
        }
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    /// Parses `01:23:45:67:89:ab` (or dash-separated) notation; the empty
    /// string and the all-zero address parse as [`Target::AllDevices`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Self::AllDevices);
        }

        let parts: Vec<&str> = trimmed.split([':', '-']).collect();
        if parts.len() != MAC_LEN || parts.iter().any(|part| part.len() != 2) {
            return Err(TargetParseError::InvalidFormat {
                value: value.to_string(),
            });
        }

        let mut octets = [0_u8; MAC_LEN];
        hex::decode_to_slice(parts.concat(), &mut octets).map_err(|source| {
            TargetParseError::InvalidHex {
                value: value.to_string(),
                source,
            }
        })?;

        if octets == [0; MAC_LEN] {
            Ok(Self::AllDevices)
        } else {
            Ok(Self::Device(MacAddress(octets)))
        }
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("01:23:45:67:89:ab", "01:23:45:67:89:ab")]
    #[case("01-23-45-67-89-AB", "01:23:45:67:89:ab")]
    #[case("", "00:00:00:00:00:00")]
    #[case("00:00:00:00:00:00", "00:00:00:00:00:00")]
    fn parse_then_display_is_canonical(#[case] input: &str, #[case] expected: &str) {
        let target: Target = input.parse().expect("valid target should parse");
        assert_eq!(expected, target.to_string());
    }

    #[rstest]
    #[case("01:23:45:67:89")]
    #[case("0123456789ab")]
    #[case("01:23:45:67:89:abc")]
    fn parse_rejects_malformed_notation(#[case] input: &str) {
        assert_matches!(
            input.parse::<Target>(),
            Err(TargetParseError::InvalidFormat { .. })
        );
    }

    #[test]
    fn parse_rejects_non_hex_octets() {
        assert_matches!(
            "01:23:45:67:89:zz".parse::<Target>(),
            Err(TargetParseError::InvalidHex { .. })
        );
    }

    #[test]
    fn wire_value_uses_little_endian_mac_bytes() {
        let target: Target = "01:23:45:67:89:ab"
            .parse()
            .expect("valid target should parse");
        assert_eq!(0x0000_ab89_6745_2301, target.to_wire());
        assert_eq!(target, Target::from_wire(target.to_wire()));
    }

    #[test]
    fn zero_wire_value_is_the_wildcard() {
        assert_eq!(Target::AllDevices, Target::from_wire(0));
        assert_eq!(0, Target::AllDevices.to_wire());
    }

    #[rstest]
    #[case("d0:73:d5:00:00:01", "d0:73:d5:00:00:01", true)]
    #[case("d0:73:d5:00:00:01", "d0:73:d5:00:00:02", false)]
    #[case("", "d0:73:d5:00:00:02", true)]
    #[case("d0:73:d5:00:00:01", "", true)]
    fn matches_treats_wildcard_symmetrically(
        #[case] left: &str,
        #[case] right: &str,
        #[case] expected: bool,
    ) {
        let left: Target = left.parse().expect("left target should parse");
        let right: Target = right.parse().expect("right target should parse");
        assert_eq!(expected, left.matches(right));
    }
}
