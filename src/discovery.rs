use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use bon::Builder;
use bytes::Buf;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace};

use crate::context::CallContext;
use crate::device::{DEFAULT_PORT, Device, ServiceType, random_source};
use crate::error::LifxError;
use crate::header::{AckResFlags, TaggedHeader};
use crate::message::{MessageMeta, build_message, parse_message, require_len};
use crate::product::ProductRegistry;
use crate::protocol::MessageType;
use crate::target::Target;
use crate::transport::RESPONSE_READ_BUFFER_SIZE;

/// Broadcast address GetService is sent to by default.
pub const DEFAULT_BROADCAST: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::BROADCAST), DEFAULT_PORT);

const STATE_SERVICE_LENGTH: usize = 5;

/// Where discovery broadcasts and listens.
#[derive(Debug, Clone, Builder)]
pub struct DiscoveryConfig {
    #[builder(default = DEFAULT_BROADCAST)]
    broadcast: SocketAddr,
    /// Local address to listen on; an ephemeral port on all interfaces when unset.
    bind: Option<SocketAddr>,
    /// Product table handed to every discovered device.
    registry: Option<Arc<ProductRegistry>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DiscoveryConfig {
    #[must_use]
    pub fn broadcast(&self) -> SocketAddr {
        self.broadcast
    }

    fn bind_addr(&self) -> SocketAddr {
        self.bind.unwrap_or_else(|| {
            if self.broadcast.is_ipv4() {
                SocketAddr::from(([0, 0, 0, 0], 0))
            } else {
                SocketAddr::from(([0_u16; 8], 0))
            }
        })
    }
}

/// Broadcasts one GetService and emits a [`Device`] per UDP StateService reply.
///
/// Runs until `ctx` is cancelled or its deadline passes, which ends discovery
/// with `Ok(())`. A closed `sink` also ends it.
///
/// # Errors
///
/// Returns socket errors and [`LifxError::ShortWrite`] for the broadcast.
#[instrument(skip_all, fields(broadcast = %config.broadcast))]
pub async fn discover(
    ctx: &CallContext,
    config: &DiscoveryConfig,
    sink: mpsc::Sender<Device>,
) -> Result<(), LifxError> {
    ctx.check()?;

    let socket = UdpSocket::bind(config.bind_addr()).await?;
    socket.set_broadcast(true)?;
    let datagram = build_message(
        &MessageMeta {
            tagged: TaggedHeader::TAGGED,
            source: random_source(),
            target: Target::AllDevices,
            flags: AckResFlags::NONE,
            sequence: 0,
            message_type: MessageType::GET_SERVICE,
        },
        &[],
    )?;
    let written = socket.send_to(&datagram, config.broadcast).await?;
    if written < datagram.len() {
        return Err(LifxError::ShortWrite {
            written,
            expected: datagram.len(),
        });
    }

    let mut buf = vec![0_u8; RESPONSE_READ_BUFFER_SIZE];
    loop {
        let (len, from) = tokio::select! {
            reason = ctx.done() => {
                debug!(%reason, "discovery finished");
                return Ok(());
            }
            read = tokio::time::timeout(ctx.poll_interval(), socket.recv_from(&mut buf)) => match read {
                Err(_elapsed) => continue,
                Ok(read) => read?,
            },
        };

        let Some(device) = device_from_reply(&buf[..len], from, config) else {
            continue;
        };
        info!(target = %device.target(), addr = %device.addr(), "discovered device");
        if sink.send(device).await.is_err() {
            debug!("discovery receiver closed");
            return Ok(());
        }
    }
}

fn device_from_reply(datagram: &[u8], from: SocketAddr, config: &DiscoveryConfig) -> Option<Device> {
    let response = match parse_message(datagram) {
        Ok(response) => response,
        Err(error) => {
            debug!(%error, %from, "ignoring malformed datagram");
            return None;
        }
    };
    if response.message_type() != MessageType::STATE_SERVICE {
        trace!(message_type = %response.message_type(), %from, "ignoring non-service reply");
        return None;
    }

    let payload = response.payload();
    if let Err(error) = require_len(payload, STATE_SERVICE_LENGTH) {
        debug!(%error, %from, "ignoring short StateService");
        return None;
    }
    let mut buf = &payload[..STATE_SERVICE_LENGTH];
    let service = ServiceType::from(buf.get_u8());
    if service != ServiceType::UDP {
        trace!(%service, %from, "ignoring non-UDP service");
        return None;
    }
    let port = u16::try_from(buf.get_u32_le()).ok()?;

    let device = Device::new(SocketAddr::new(from.ip(), port), service, response.target());
    Some(match &config.registry {
        Some(registry) => device.with_registry(Arc::clone(registry)),
        None => device,
    })
}

/// Runs [`discover`] and collects the devices, one per target and address.
///
/// # Errors
///
/// Returns the errors of [`discover`].
pub async fn discover_all(
    ctx: &CallContext,
    config: &DiscoveryConfig,
) -> Result<Vec<Device>, LifxError> {
    let (sender, mut receiver) = mpsc::channel::<Device>(16);
    let collect = async {
        let mut seen = HashSet::new();
        let mut devices = Vec::new();
        while let Some(device) = receiver.recv().await {
            if seen.insert((device.target(), device.addr())) {
                devices.push(device);
            }
        }
        devices
    };

    let (discovered, devices) = tokio::join!(discover(ctx, config, sender), collect);
    discovered?;
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::{MOCK_TARGET, MockConfig, MockService};

    #[test]
    fn default_config_broadcasts_to_the_lan() {
        let config = DiscoveryConfig::default();
        assert_eq!("255.255.255.255:56700", config.broadcast().to_string());
        assert_eq!("0.0.0.0:0", config.bind_addr().to_string());
    }

    #[test]
    fn non_udp_services_are_skipped() {
        let meta = MessageMeta {
            tagged: TaggedHeader::NOT_TAGGED,
            source: 1,
            target: MOCK_TARGET,
            flags: AckResFlags::NONE,
            sequence: 0,
            message_type: MessageType::STATE_SERVICE,
        };
        let from: SocketAddr = "192.0.2.1:56700".parse().expect("address parses");
        let config = DiscoveryConfig::default();

        let udp = build_message(&meta, &[1, 0x7c, 0xdd, 0, 0]).expect("message builds");
        let device = device_from_reply(&udp, from, &config).expect("UDP service is kept");
        assert_eq!("192.0.2.1:56700", device.addr().to_string());
        assert_eq!(MOCK_TARGET, device.target());

        let other = build_message(&meta, &[5, 0x7c, 0xdd, 0, 0]).expect("message builds");
        assert!(device_from_reply(&other, from, &config).is_none());
    }

    #[tokio::test]
    async fn finds_a_mock_device_until_the_deadline() {
        let service = MockService::start(MockConfig::builder().build())
            .await
            .expect("mock should start");
        let config = DiscoveryConfig::builder()
            .broadcast(service.addr())
            .build();
        let ctx = CallContext::with_timeout(Duration::from_millis(300))
            .with_poll_interval(Duration::from_millis(20));

        let devices = discover_all(&ctx, &config)
            .await
            .expect("discovery ends cleanly at the deadline");

        assert_eq!(1, devices.len());
        assert_eq!(service.target(), devices[0].target());
        assert_eq!(service.addr(), devices[0].addr());
        service.stop().await;
    }
}
