mod waveform;

pub use self::waveform::{Waveform, WaveformArgs, convert_skew_ratio};
pub(crate) use self::waveform::SetWaveformOptional;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BufMut};
use serde::Serialize;
use tracing::instrument;

use crate::color::{COLOR_LENGTH, Color};
use crate::context::CallContext;
use crate::device::{Device, LABEL_LENGTH, PowerLevel, decode_label};
use crate::error::LifxError;
use crate::message::require_len;
use crate::protocol::MessageType;
use crate::target::Target;
use crate::transport::Connection;

const LIGHT_STATE_LENGTH: usize = COLOR_LENGTH + 2 + 2 + LABEL_LENGTH + 8;
const LIGHT_STATE_POWER_OFFSET: usize = COLOR_LENGTH + 2;
const LIGHT_STATE_LABEL_OFFSET: usize = LIGHT_STATE_POWER_OFFSET + 2;

/// Encodes a transition as whole milliseconds, saturating at `u32::MAX`.
///
/// ```
/// use std::time::Duration;
/// use lifxlan::transition_millis;
///
/// assert_eq!(1500, transition_millis(Duration::from_millis(1500)));
/// assert_eq!(u32::MAX, transition_millis(Duration::from_secs(u64::MAX)));
/// ```
#[must_use]
pub fn transition_millis(transition: Duration) -> u32 {
    u32::try_from(transition.as_millis()).unwrap_or(u32::MAX)
}

/// Colour, power and label reported by a light.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct LightState {
    pub color: Color,
    pub power: PowerLevel,
    pub label: String,
}

impl LightState {
    pub(crate) fn decode(payload: &[u8]) -> Result<Self, LifxError> {
        require_len(payload, LIGHT_STATE_LENGTH)?;
        let mut buf = payload;
        let color = Color::decode(&mut buf);
        let mut power = &payload[LIGHT_STATE_POWER_OFFSET..LIGHT_STATE_LABEL_OFFSET];
        Ok(Self {
            color,
            power: PowerLevel::from(power.get_u16_le()),
            label: decode_label(&payload[LIGHT_STATE_LABEL_OFFSET..])?,
        })
    }
}

/// A device that answered the light probe.
#[derive(Debug, Clone)]
pub struct LightDevice {
    device: Arc<Device>,
}

impl LightDevice {
    /// Probes `device` with LightGet and wraps it when it answers LightState.
    ///
    /// The reported label is cached on the device.
    ///
    /// # Errors
    ///
    /// Returns [`LifxError::Unhandled`] when the device is not a light, plus
    /// cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %device.target()))]
    pub async fn wrap(
        ctx: &CallContext,
        conn: &dyn Connection,
        device: Arc<Device>,
    ) -> Result<Self, LifxError> {
        let light = Self { device };
        light.get_state(ctx, conn).await?;
        Ok(light)
    }

    /// The wrapped base device.
    #[must_use]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.device.target()
    }

    /// Reads colour, power and label, caching the label.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target()))]
    pub async fn get_state(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<LightState, LifxError> {
        let response = self
            .device
            .request(ctx, conn, MessageType::LIGHT_GET, &[], MessageType::LIGHT_STATE)
            .await?;
        let state = LightState::decode(response.payload())?;
        self.device.cache_label(state.label.clone());
        Ok(state)
    }

    /// Reads the current colour.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    pub async fn get_color(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<Color, LifxError> {
        Ok(self.get_state(ctx, conn).await?.color)
    }

    /// Fades to `color` over `transition` after Kelvin sanitization.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target(), ack))]
    pub async fn set_color(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        color: Color,
        transition: Duration,
        ack: bool,
    ) -> Result<(), LifxError> {
        let mut payload = Vec::with_capacity(1 + COLOR_LENGTH + 4);
        payload.put_u8(0);
        self.device.sanitize_color(color).encode(&mut payload);
        payload.put_u32_le(transition_millis(transition));

        self.device
            .send_maybe_ack(ctx, conn, ack, MessageType::LIGHT_SET_COLOR, &payload)
            .await
    }

    /// Fades the light on or off over `transition`.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target(), power = %power, ack))]
    pub async fn set_light_power(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        power: PowerLevel,
        transition: Duration,
        ack: bool,
    ) -> Result<(), LifxError> {
        let mut payload = Vec::with_capacity(6);
        payload.put_u16_le(power.value());
        payload.put_u32_le(transition_millis(transition));

        self.device
            .send_maybe_ack(ctx, conn, ack, MessageType::LIGHT_SET_POWER, &payload)
            .await
    }
}

impl fmt::Display for LightDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.device, f)
    }
}
