use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use crate::context::CallContext;
use crate::device::{Device, PowerLevel};
use crate::error::LifxError;
use crate::message::require_len;
use crate::protocol::MessageType;
use crate::target::Target;
use crate::transport::Connection;

const STATE_RELAY_POWER_LENGTH: usize = 3;

/// A switch whose relays answered the relay power probe.
#[derive(Debug, Clone)]
pub struct RelayDevice {
    device: Arc<Device>,
}

impl RelayDevice {
    /// Probes relay 0 and wraps `device` when it answers StateRPower.
    ///
    /// # Errors
    ///
    /// Returns [`LifxError::Unhandled`] when the device has no relays, plus
    /// cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %device.target()))]
    pub async fn wrap(
        ctx: &CallContext,
        conn: &dyn Connection,
        device: Arc<Device>,
    ) -> Result<Self, LifxError> {
        let relay = Self { device };
        relay.get_power(ctx, conn, 0).await?;
        Ok(relay)
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

    /// Reads the power level of one relay.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target(), relay_index))]
    pub async fn get_power(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        relay_index: u8,
    ) -> Result<PowerLevel, LifxError> {
        let response = self
            .device
            .request(
                ctx,
                conn,
                MessageType::GET_RELAY_POWER,
                &[relay_index],
                MessageType::STATE_RELAY_POWER,
            )
            .await?;
        let payload = response.payload();
        require_len(payload, STATE_RELAY_POWER_LENGTH)?;
        Ok(PowerLevel::from(u16::from_le_bytes([payload[1], payload[2]])))
    }

    /// Switches one relay.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target(), relay_index, power = %power, ack))]
    pub async fn set_power(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        relay_index: u8,
        power: PowerLevel,
        ack: bool,
    ) -> Result<(), LifxError> {
        let [low, high] = power.value().to_le_bytes();
        self.device
            .send_maybe_ack(
                ctx,
                conn,
                ack,
                MessageType::SET_RELAY_POWER,
                &[relay_index, low, high],
            )
            .await
    }
}

impl fmt::Display for RelayDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.device, f)
    }
}
