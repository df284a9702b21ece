use std::time::Duration;

use bon::Builder;
use bytes::{Buf, BufMut};
use serde::Serialize;
use strum_macros::{Display, EnumIter};
use tracing::instrument;

use super::{LightDevice, transition_millis};
use crate::color::{COLOR_LENGTH, Color};
use crate::context::CallContext;
use crate::error::LifxError;
use crate::message::require_len;
use crate::protocol::MessageType;
use crate::transport::Connection;

pub(crate) const SET_WAVEFORM_OPTIONAL_LENGTH: usize = 1 + 1 + COLOR_LENGTH + 4 + 4 + 2 + 1 + 4;

/// Shape a light follows between its current and target colour.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Display, EnumIter, Serialize)]
#[repr(u8)]
pub enum Waveform {
    #[default]
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    /// Square wave; the skew ratio sets how long each cycle holds the target colour.
    Pulse = 4,
}

impl Waveform {
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }
}

/// Scales a ratio in `[0, 1]` onto the signed 16-bit wire range.
///
/// Values outside the range are clamped.
///
/// ```
/// use lifxlan::convert_skew_ratio;
///
/// assert_eq!(i16::MIN, convert_skew_ratio(0.0));
/// assert_eq!(0, convert_skew_ratio(0.5));
/// assert_eq!(i16::MAX, convert_skew_ratio(1.0));
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn convert_skew_ratio(ratio: f64) -> i16 {
    let scaled = (ratio.clamp(0.0, 1.0) * f64::from(u16::MAX)).round() + f64::from(i16::MIN);
    scaled as i16
}

/// A waveform effect for [`LightDevice::set_waveform`].
///
/// The `keep_*` flags leave that colour component untouched; with all of
/// them unset every component follows the waveform.
#[derive(Debug, Clone, Builder)]
pub struct WaveformArgs {
    color: Color,
    period: Duration,
    #[builder(default)]
    waveform: Waveform,
    #[builder(default = 1.0)]
    cycles: f32,
    /// Share of each pulse cycle spent at the target colour, in `[0, 1]`.
    #[builder(default = 0.5)]
    skew_ratio: f64,
    /// Return to the original colour once the cycles end.
    #[builder(default)]
    transient: bool,
    #[builder(default)]
    keep_hue: bool,
    #[builder(default)]
    keep_saturation: bool,
    #[builder(default)]
    keep_brightness: bool,
    #[builder(default)]
    keep_kelvin: bool,
}

impl WaveformArgs {
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn cycles(&self) -> f32 {
        self.cycles
    }
}

/// SetWaveformOptional payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SetWaveformOptional {
    pub(crate) transient: bool,
    pub(crate) color: Color,
    pub(crate) period_millis: u32,
    pub(crate) cycles: f32,
    pub(crate) skew_ratio: i16,
    pub(crate) waveform: u8,
    pub(crate) set_hue: bool,
    pub(crate) set_saturation: bool,
    pub(crate) set_brightness: bool,
    pub(crate) set_kelvin: bool,
}

impl SetWaveformOptional {
    fn from_args(args: &WaveformArgs, color: Color) -> Self {
        Self {
            transient: args.transient,
            color,
            period_millis: transition_millis(args.period),
            cycles: args.cycles,
            skew_ratio: convert_skew_ratio(1.0 - args.skew_ratio),
            waveform: args.waveform.value(),
            set_hue: !args.keep_hue,
            set_saturation: !args.keep_saturation,
            set_brightness: !args.keep_brightness,
            set_kelvin: !args.keep_kelvin,
        }
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(SET_WAVEFORM_OPTIONAL_LENGTH);
        payload.put_u8(0);
        payload.put_u8(u8::from(self.transient));
        self.color.encode(&mut payload);
        payload.put_u32_le(self.period_millis);
        payload.put_f32_le(self.cycles);
        payload.put_i16_le(self.skew_ratio);
        payload.put_u8(self.waveform);
        for flag in [
            self.set_hue,
            self.set_saturation,
            self.set_brightness,
            self.set_kelvin,
        ] {
            payload.put_u8(u8::from(flag));
        }
        payload
    }

    pub(crate) fn decode(payload: &[u8]) -> Result<Self, LifxError> {
        require_len(payload, SET_WAVEFORM_OPTIONAL_LENGTH)?;
        let mut buf = &payload[1..];
        let transient = buf.get_u8() != 0;
        let color = Color::decode(&mut buf);
        Ok(Self {
            transient,
            color,
            period_millis: buf.get_u32_le(),
            cycles: buf.get_f32_le(),
            skew_ratio: buf.get_i16_le(),
            waveform: buf.get_u8(),
            set_hue: buf.get_u8() != 0,
            set_saturation: buf.get_u8() != 0,
            set_brightness: buf.get_u8() != 0,
            set_kelvin: buf.get_u8() != 0,
        })
    }

    /// Colour the light settles on when the effect is not transient.
    pub(crate) fn apply_to(&self, current: Color) -> Color {
        if self.transient {
            return current;
        }
        Color {
            hue: if self.set_hue { self.color.hue } else { current.hue },
            saturation: if self.set_saturation {
                self.color.saturation
            } else {
                current.saturation
            },
            brightness: if self.set_brightness {
                self.color.brightness
            } else {
                current.brightness
            },
            kelvin: if self.set_kelvin { self.color.kelvin } else { current.kelvin },
        }
    }
}

impl LightDevice {
    /// Runs a waveform effect towards `args.color`, after Kelvin sanitization.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target(), waveform = %args.waveform, ack))]
    pub async fn set_waveform(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        args: &WaveformArgs,
        ack: bool,
    ) -> Result<(), LifxError> {
        let color = self.device.sanitize_color(args.color);
        let payload = SetWaveformOptional::from_args(args, color).encode();

        self.device
            .send_maybe_ack(ctx, conn, ack, MessageType::SET_WAVEFORM_OPTIONAL, &payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::error::MalformedMessage;

    #[rstest]
    #[case(0.0, -32768)]
    #[case(0.25, -16384)]
    #[case(0.5, 0)]
    #[case(0.75, 16383)]
    #[case(1.0, 32767)]
    #[case(-0.5, -32768)]
    #[case(1.5, 32767)]
    fn skew_ratio_spans_the_signed_range(#[case] ratio: f64, #[case] expected: i16) {
        assert_eq!(expected, convert_skew_ratio(ratio));
    }

    #[test]
    fn payload_layout_follows_the_wire_order() {
        let args = WaveformArgs::builder()
            .color(Color {
                hue: 0x1122,
                saturation: 0x3344,
                brightness: 0x5566,
                kelvin: 3500,
            })
            .period(Duration::from_millis(1000))
            .cycles(2.5)
            .waveform(Waveform::Pulse)
            .skew_ratio(0.25)
            .transient(true)
            .keep_brightness(true)
            .build();

        let payload = SetWaveformOptional::from_args(&args, args.color()).encode();

        assert_eq!(SET_WAVEFORM_OPTIONAL_LENGTH, payload.len());
        assert_eq!(
            vec![
                0x00, 0x01, // reserved, transient
                0x22, 0x11, 0x44, 0x33, 0x66, 0x55, 0xac, 0x0d, // hsbk
                0xe8, 0x03, 0x00, 0x00, // period
                0x00, 0x00, 0x20, 0x40, // cycles
                0xff, 0x3f, // skew ratio 16383
                0x04, // waveform
                0x01, 0x01, 0x00, 0x01, // set h, s, b, k
            ],
            payload
        );
    }

    #[test]
    fn decode_reads_back_the_encoded_fields() {
        let args = WaveformArgs::builder()
            .color(Color::from_rgb8(0, 255, 0, 4000))
            .period(Duration::from_millis(250))
            .waveform(Waveform::Triangle)
            .keep_hue(true)
            .build();
        let request = SetWaveformOptional::from_args(&args, args.color());

        assert_eq!(
            request,
            SetWaveformOptional::decode(&request.encode()).expect("payload should decode")
        );
        assert_matches!(
            SetWaveformOptional::decode(&[0; 10]),
            Err(LifxError::Malformed(MalformedMessage::TooShort { expected: 25, actual: 10 }))
        );
    }

    #[test]
    fn kept_components_survive_a_lasting_waveform() {
        let current = Color {
            hue: 1,
            saturation: 2,
            brightness: 3,
            kelvin: 4000,
        };
        let target = Color {
            hue: 10,
            saturation: 20,
            brightness: 30,
            kelvin: 5000,
        };
        let args = WaveformArgs::builder()
            .color(target)
            .period(Duration::from_secs(1))
            .keep_saturation(true)
            .keep_kelvin(true)
            .build();

        let lasting = SetWaveformOptional::from_args(&args, target);
        assert_eq!(
            Color {
                hue: 10,
                saturation: 2,
                brightness: 30,
                kelvin: 4000,
            },
            lasting.apply_to(current)
        );

        let transient = SetWaveformOptional {
            transient: true,
            ..lasting
        };
        assert_eq!(current, transient.apply_to(current));
    }
}
