use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

/// Encoded length of one HSBK colour.
pub const COLOR_LENGTH: usize = 8;

/// Warmest Kelvin value assumed when a device range is unknown.
pub const KELVIN_WARM: u16 = 2500;
/// Coolest Kelvin value assumed when a device range is unknown.
pub const KELVIN_COOL: u16 = 9000;

const HUE_RATE: f64 = 65536.0 / 360.0;
const CHANNEL_MAX: f64 = u16::MAX as f64;
const RGB8_MAX: f64 = u8::MAX as f64;

/// Inclusive colour-temperature bounds in Kelvin.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "[u16; 2]", into = "[u16; 2]")]
pub struct TemperatureRange {
    min: u16,
    max: u16,
}

impl TemperatureRange {
    /// Bounds used for devices whose product is unknown.
    pub const DEFAULT: Self = Self {
        min: KELVIN_WARM,
        max: KELVIN_COOL,
    };

    /// Creates a range, swapping the bounds when given in reverse.
    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub const fn min(self) -> u16 {
        self.min
    }

    #[must_use]
    pub const fn max(self) -> u16 {
        self.max
    }
}

impl From<[u16; 2]> for TemperatureRange {
    fn from([min, max]: [u16; 2]) -> Self {
        Self::new(min, max)
    }
}

impl From<TemperatureRange> for [u16; 2] {
    fn from(range: TemperatureRange) -> Self {
        [range.min, range.max]
    }
}

/// Hue, saturation, brightness and Kelvin, each as a 16-bit wire value.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Color {
    /// Zero brightness; tiles default to this for pixels that are not painted.
    pub const BLACK: Self = Self {
        hue: 0,
        saturation: 0,
        brightness: 0,
        kelvin: 0,
    };

    /// Converts 8-bit RGB channels to HSBK at the given colour temperature.
    ///
    /// ```
    /// use lifxlan::Color;
    ///
    /// let green = Color::from_rgb8(0, 255, 0, 3500);
    /// assert_eq!(21845, green.hue);
    /// assert_eq!(u16::MAX, green.saturation);
    /// assert_eq!(u16::MAX, green.brightness);
    /// ```
    #[must_use]
    pub fn from_rgb8(red: u8, green: u8, blue: u8, kelvin: u16) -> Self {
        let (r, g, b) = (f64::from(red), f64::from(green), f64::from(blue));
        let max = r.max(g).max(b);
        let delta = max - r.min(g).min(b);

        let degrees = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta * 60.0).round()
        } else if max == g {
            (((b - r) / delta + 2.0) * 60.0).round()
        } else {
            (((r - g) / delta + 4.0) * 60.0).round()
        };
        let degrees = degrees.rem_euclid(360.0);

        let saturation = if max == 0.0 {
            0.0
        } else {
            (delta / max * CHANNEL_MAX).round()
        };

        Self {
            hue: to_channel((degrees * HUE_RATE).round()),
            saturation: to_channel(saturation),
            brightness: to_channel((max / RGB8_MAX * CHANNEL_MAX).round()),
            kelvin,
        }
    }

    /// Parses `RRGGBB` (optionally prefixed with `#`).
    ///
    /// ```
    /// use lifxlan::Color;
    ///
    /// assert_eq!(Some(Color::from_rgb8(255, 0, 0, 3500)), Color::from_hex("#ff0000", 3500));
    /// assert_eq!(None, Color::from_hex("red", 3500));
    /// ```
    #[must_use]
    pub fn from_hex(value: &str, kelvin: u16) -> Option<Self> {
        let mut rgb = [0_u8; 3];
        hex::decode_to_slice(value.trim_start_matches('#'), &mut rgb).ok()?;
        Some(Self::from_rgb8(rgb[0], rgb[1], rgb[2], kelvin))
    }

    /// Clamps the Kelvin component into `range`; other components are untouched.
    ///
    /// ```
    /// use lifxlan::{Color, TemperatureRange};
    ///
    /// let range = TemperatureRange::new(2700, 6500);
    /// assert_eq!(2700, Color::BLACK.sanitize(range).kelvin);
    /// ```
    #[must_use]
    pub fn sanitize(self, range: TemperatureRange) -> Self {
        Self {
            kelvin: self.kelvin.clamp(range.min(), range.max()),
            ..self
        }
    }

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.hue);
        buf.put_u16_le(self.saturation);
        buf.put_u16_le(self.brightness);
        buf.put_u16_le(self.kelvin);
    }

    /// Reads one colour; the caller guarantees eight bytes remain.
    pub(crate) fn decode(buf: &mut impl Buf) -> Self {
        Self {
            hue: buf.get_u16_le(),
            saturation: buf.get_u16_le(),
            brightness: buf.get_u16_le(),
            kelvin: buf.get_u16_le(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u16 {
    value.clamp(0.0, CHANNEL_MAX) as u16
}
