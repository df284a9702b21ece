use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::{Buf, BufMut};
use rand::Rng;
use serde::{Serialize, Serializer};
use tracing::{instrument, trace};

use crate::ack::wait_for_acks;
use crate::color::{Color, TemperatureRange};
use crate::context::CallContext;
use crate::error::LifxError;
use crate::header::{AckResFlags, TaggedHeader};
use crate::message::{MessageMeta, Response, build_message, require_len};
use crate::product::{FirmwareVersion, HardwareVersion, Product, ProductRegistry};
use crate::protocol::MessageType;
use crate::response::read_next_response;
use crate::target::Target;
use crate::transport::{Connection, UdpConnection};

/// Default UDP port devices listen on.
pub const DEFAULT_PORT: u16 = 56700;

/// Length of the NUL-padded label field.
pub const LABEL_LENGTH: usize = 32;

const ECHO_PAYLOAD_LENGTH: usize = 64;
const STATE_VERSION_LENGTH: usize = 12;
const STATE_HOST_FIRMWARE_LENGTH: usize = 20;
const STATE_HOST_FIRMWARE_VERSION_OFFSET: usize = 16;

/// Transport a device advertises in StateService replies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::From, derive_more::Into)]
pub struct ServiceType(u8);

impl ServiceType {
    /// The only service that can be dialed.
    pub const UDP: Self = Self(1);

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::UDP {
            f.write_str("UDP")
        } else {
            write!(f, "<unknown>({})", self.0)
        }
    }
}

/// Device power level; zero is off and anything else is on.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::From, derive_more::Into)]
pub struct PowerLevel(u16);

impl PowerLevel {
    pub const OFF: Self = Self(0);
    pub const ON: Self = Self(u16::MAX);

    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn is_on(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_on() { "on" } else { "off" })
    }
}

impl Serialize for PowerLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Returns a uniformly random, non-zero client source value.
#[must_use]
pub fn random_source() -> u32 {
    loop {
        let source: u32 = rand::random();
        if source != 0 {
            return source;
        }
    }
}

#[derive(Debug, Default)]
struct DeviceCache {
    label: Option<String>,
    hardware: Option<HardwareVersion>,
    firmware: Option<FirmwareVersion>,
}

/// One addressable device and its session state.
///
/// The session source is chosen once per `Device`; the sequence counter is
/// shared by every task sending through the same `Device`.
pub struct Device {
    addr: SocketAddr,
    service: ServiceType,
    target: Target,
    source: u32,
    sequence: AtomicU32,
    cache: RwLock<DeviceCache>,
    registry: Arc<ProductRegistry>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("addr", &self.addr)
            .field("service", &self.service)
            .field("target", &self.target)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Creates a device with a fresh random source and the built-in product table.
    ///
    /// ```
    /// use lifxlan::{Device, ServiceType, Target};
    ///
    /// let device = Device::new("192.0.2.10:56700".parse()?, ServiceType::UDP, Target::AllDevices);
    /// assert_ne!(0, device.source());
    /// assert_eq!(1, device.next_sequence());
    /// # Ok::<(), std::net::AddrParseError>(())
    /// ```
    #[must_use]
    pub fn new(addr: SocketAddr, service: ServiceType, target: Target) -> Self {
        Self {
            addr,
            service,
            target,
            source: random_source(),
            sequence: AtomicU32::new(0),
            cache: RwLock::new(DeviceCache::default()),
            registry: ProductRegistry::builtin(),
        }
    }

    /// Replaces the product table used for feature and Kelvin resolution.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ProductRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the session source; zero is replaced with a random value.
    #[must_use]
    pub fn with_source(mut self, source: u32) -> Self {
        self.source = if source == 0 { random_source() } else { source };
        self
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn service(&self) -> ServiceType {
        self.service
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    #[must_use]
    pub fn source(&self) -> u32 {
        self.source
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ProductRegistry> {
        &self.registry
    }

    /// Advances the sequence counter; the first value is 1 and it wraps at 256.
    #[must_use]
    pub fn next_sequence(&self) -> u8 {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        (next & 0xff) as u8
    }

    /// Opens a connection to the device's advertised service.
    ///
    /// # Errors
    ///
    /// Returns [`LifxError::UnsupportedService`] for services other than UDP
    /// and socket errors from connecting.
    pub async fn dial(&self) -> Result<UdpConnection, LifxError> {
        if self.service != ServiceType::UDP {
            return Err(LifxError::UnsupportedService {
                service: self.service.value(),
            });
        }
        Ok(UdpConnection::connect(self.addr).await?)
    }

    /// Last label read from the device, if any.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.read_cache().label.clone()
    }

    /// Last hardware version read from the device, if any.
    #[must_use]
    pub fn hardware_version(&self) -> Option<HardwareVersion> {
        self.read_cache().hardware
    }

    /// Last firmware version read from the device, if any.
    #[must_use]
    pub fn firmware(&self) -> Option<FirmwareVersion> {
        self.read_cache().firmware
    }

    /// Product for the cached hardware version.
    #[must_use]
    pub fn product(&self) -> Option<Product> {
        let hardware = self.hardware_version()?;
        self.registry.lookup_hardware(&hardware).cloned()
    }

    pub(crate) fn cache_label(&self, label: String) {
        self.write_cache().label = Some(label);
    }

    pub(crate) fn cache_hardware_version_if_unset(&self, hardware: HardwareVersion) {
        self.write_cache().hardware.get_or_insert(hardware);
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, DeviceCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, DeviceCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Kelvin bounds used to sanitize colours sent to this device.
    ///
    /// Unknown hardware uses the default range. Known products use their
    /// range at the cached firmware, or their base range before the firmware
    /// has been read.
    #[must_use]
    pub fn temperature_range(&self) -> TemperatureRange {
        let cache = self.read_cache();
        let Some(product) = cache
            .hardware
            .as_ref()
            .and_then(|hardware| self.registry.lookup_hardware(hardware))
        else {
            return TemperatureRange::DEFAULT;
        };
        product
            .features_at(cache.firmware.unwrap_or_default())
            .temperature_range
            .unwrap_or(TemperatureRange::DEFAULT)
    }

    /// Clamps `color` into [`Device::temperature_range`].
    #[must_use]
    pub fn sanitize_color(&self, color: Color) -> Color {
        color.sanitize(self.temperature_range())
    }

    /// Sends one untagged message and returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`LifxError::Cancelled`] when `ctx` ends before or during the
    /// write and [`LifxError::ShortWrite`] when the datagram was truncated.
    #[instrument(
        skip(self, ctx, conn, payload),
        fields(target = %self.target, message_type = %message_type, sequence = tracing::field::Empty)
    )]
    pub async fn send(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        flags: AckResFlags,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<u8, LifxError> {
        ctx.check()?;

        let sequence = self.next_sequence();
        tracing::Span::current().record("sequence", sequence);
        let datagram = build_message(
            &MessageMeta {
                tagged: TaggedHeader::NOT_TAGGED,
                source: self.source,
                target: self.target,
                flags,
                sequence,
                message_type,
            },
            payload,
        )?;

        let written = tokio::select! {
            reason = ctx.done() => return Err(LifxError::Cancelled(reason)),
            written = conn.send(&datagram) => written?,
        };
        if written < datagram.len() {
            return Err(LifxError::ShortWrite {
                written,
                expected: datagram.len(),
            });
        }

        trace!(len = datagram.len(), "sent");
        Ok(sequence)
    }

    /// Sends a request and waits for the matching reply of type `expected`.
    pub(crate) async fn request(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        message_type: MessageType,
        payload: &[u8],
        expected: MessageType,
    ) -> Result<Response, LifxError> {
        let sequence = self
            .send(ctx, conn, AckResFlags::NONE, message_type, payload)
            .await?;
        self.read_reply(ctx, conn, sequence, expected).await
    }

    /// Reads until a reply to `sequence` of type `expected` arrives.
    ///
    /// A StateUnhandled reply to `sequence` fails with [`LifxError::Unhandled`].
    pub(crate) async fn read_reply(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        sequence: u8,
        expected: MessageType,
    ) -> Result<Response, LifxError> {
        loop {
            let response = read_next_response(ctx, conn).await?;
            if !response.correlates_with(self.source, sequence) {
                trace!(
                    sequence = response.sequence(),
                    source = response.source(),
                    "dropping uncorrelated reply"
                );
                continue;
            }
            if response.message_type() == MessageType::STATE_UNHANDLED {
                return Err(unhandled_error(&response)?);
            }
            if response.message_type() != expected {
                trace!(message_type = %response.message_type(), "dropping reply of another type");
                continue;
            }
            return Ok(response);
        }
    }

    /// Sends a message and, when `ack` is set, waits for its acknowledgement.
    pub(crate) async fn send_maybe_ack(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        ack: bool,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<(), LifxError> {
        let sequence = self
            .send(ctx, conn, AckResFlags::ack_if(ack), message_type, payload)
            .await?;
        if ack {
            wait_for_acks(ctx, conn, self.source, &[sequence]).await?;
        }
        Ok(())
    }

    /// Reads and caches the device label.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target))]
    pub async fn get_label(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<String, LifxError> {
        let response = self
            .request(ctx, conn, MessageType::GET_LABEL, &[], MessageType::STATE_LABEL)
            .await?;
        let label = decode_label(response.payload())?;
        self.cache_label(label.clone());
        Ok(label)
    }

    /// Renames the device; labels longer than 32 bytes are truncated.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target, ack))]
    pub async fn set_label(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        label: &str,
        ack: bool,
    ) -> Result<(), LifxError> {
        let encoded = encode_label(label);
        self.send_maybe_ack(ctx, conn, ack, MessageType::SET_LABEL, &encoded)
            .await
    }

    /// Reads and caches the vendor, product and hardware revision.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target))]
    pub async fn get_hardware_version(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<HardwareVersion, LifxError> {
        let response = self
            .request(ctx, conn, MessageType::GET_VERSION, &[], MessageType::STATE_VERSION)
            .await?;
        let payload = response.payload();
        require_len(payload, STATE_VERSION_LENGTH)?;
        let mut buf = &payload[..STATE_VERSION_LENGTH];
        let hardware = HardwareVersion {
            vendor_id: buf.get_u32_le(),
            product_id: buf.get_u32_le(),
            version: buf.get_u32_le(),
        };
        self.write_cache().hardware = Some(hardware);
        Ok(hardware)
    }

    /// Reads and caches the host firmware version.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target))]
    pub async fn get_firmware(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<FirmwareVersion, LifxError> {
        let response = self
            .request(
                ctx,
                conn,
                MessageType::GET_HOST_FIRMWARE,
                &[],
                MessageType::STATE_HOST_FIRMWARE,
            )
            .await?;
        let payload = response.payload();
        require_len(payload, STATE_HOST_FIRMWARE_LENGTH)?;
        let mut buf = &payload[STATE_HOST_FIRMWARE_VERSION_OFFSET..STATE_HOST_FIRMWARE_LENGTH];
        let minor = buf.get_u16_le();
        let major = buf.get_u16_le();
        let firmware = FirmwareVersion::new(major, minor);
        self.write_cache().firmware = Some(firmware);
        Ok(firmware)
    }

    /// Reads the device power level.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target))]
    pub async fn get_power(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<PowerLevel, LifxError> {
        let response = self
            .request(ctx, conn, MessageType::GET_POWER, &[], MessageType::STATE_POWER)
            .await?;
        decode_power(response.payload())
    }

    /// Sets the device power level.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target, power = %power, ack))]
    pub async fn set_power(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        power: PowerLevel,
        ack: bool,
    ) -> Result<(), LifxError> {
        self.send_maybe_ack(
            ctx,
            conn,
            ack,
            MessageType::SET_POWER,
            &power.value().to_le_bytes(),
        )
        .await
    }

    /// Sends 64 random bytes and checks that the device echoes them back.
    ///
    /// # Errors
    ///
    /// Returns [`LifxError::EchoMismatch`] when the reply differs, plus
    /// cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target))]
    pub async fn echo(&self, ctx: &CallContext, conn: &dyn Connection) -> Result<(), LifxError> {
        let mut payload = [0_u8; ECHO_PAYLOAD_LENGTH];
        rand::rng().fill(&mut payload[..]);
        let response = self
            .request(
                ctx,
                conn,
                MessageType::ECHO_REQUEST,
                &payload,
                MessageType::ECHO_RESPONSE,
            )
            .await?;
        require_len(response.payload(), ECHO_PAYLOAD_LENGTH)?;
        if response.payload()[..ECHO_PAYLOAD_LENGTH] != payload {
            return Err(LifxError::EchoMismatch);
        }
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.label().filter(|label| !label.is_empty()) {
            return write!(f, "{label}({})", self.target);
        }
        if let Some(product) = self.product() {
            return write!(f, "{}({})", product.name, self.target);
        }
        write!(f, "Device({})", self.target)
    }
}

fn unhandled_error(response: &Response) -> Result<LifxError, LifxError> {
    let payload = response.payload();
    require_len(payload, 2)?;
    let message_type = MessageType::new(u16::from_le_bytes([payload[0], payload[1]]));
    Ok(LifxError::Unhandled { message_type })
}

/// Encodes a label into its 32-byte NUL-padded field, truncating on a
/// character boundary.
pub(crate) fn encode_label(label: &str) -> [u8; LABEL_LENGTH] {
    let mut end = label.len().min(LABEL_LENGTH);
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    let mut field = [0_u8; LABEL_LENGTH];
    let mut buf = &mut field[..];
    buf.put_slice(&label.as_bytes()[..end]);
    field
}

/// Decodes a NUL-padded label field from the start of `payload`.
pub(crate) fn decode_label(payload: &[u8]) -> Result<String, LifxError> {
    require_len(payload, LABEL_LENGTH)?;
    let field = &payload[..LABEL_LENGTH];
    let end = field.iter().position(|byte| *byte == 0).unwrap_or(LABEL_LENGTH);
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

pub(crate) fn decode_power(payload: &[u8]) -> Result<PowerLevel, LifxError> {
    require_len(payload, 2)?;
    Ok(PowerLevel(u16::from_le_bytes([payload[0], payload[1]])))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::product::{Features, FirmwareUpgrade};

    fn device() -> Device {
        Device::new(
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            ServiceType::UDP,
            "d0:73:d5:00:00:01".parse().expect("target should parse"),
        )
    }

    #[test]
    fn sequences_start_at_one_and_wrap() {
        let device = device();
        let sequences: Vec<u8> = (0..300).map(|_| device.next_sequence()).collect();

        assert_eq!(1, sequences[0]);
        assert_eq!(255, sequences[254]);
        assert_eq!(0, sequences[255]);
        assert_eq!(1, sequences[256]);
        let distinct: HashSet<u8> = sequences[..256].iter().copied().collect();
        assert_eq!(256, distinct.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sequences_are_distinct() {
        let device = Arc::new(device());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let device = Arc::clone(&device);
                tokio::spawn(async move { (0..32).map(|_| device.next_sequence()).collect::<Vec<_>>() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for sequence in handle.await.expect("task should finish") {
                assert!(seen.insert(sequence), "sequence {sequence} was issued twice");
            }
        }
        assert_eq!(256, seen.len());
    }

    #[tokio::test]
    async fn only_udp_services_can_be_dialed() {
        let device = Device::new(
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            ServiceType::from(5),
            "d0:73:d5:00:00:01".parse().expect("target should parse"),
        );

        let error = device.dial().await.expect_err("service 5 is not UDP");

        assert!(
            matches!(error, LifxError::UnsupportedService { service: 5 }),
            "unexpected error {error:?}"
        );
    }

    #[test]
    fn source_is_never_zero() {
        assert_ne!(0, device().with_source(0).source());
        assert_eq!(7, device().with_source(7).source());
    }

    #[rstest]
    #[case("kitchen", "kitchen")]
    #[case("", "")]
    #[case("0123456789abcdef0123456789abcdefXYZ", "0123456789abcdef0123456789abcdef")]
    fn label_field_is_nul_padded(#[case] label: &str, #[case] expected: &str) {
        let field = encode_label(label);
        assert_eq!(expected, decode_label(&field).expect("label should decode"));
    }

    #[test]
    fn label_truncation_respects_char_boundaries() {
        let label = format!("{}é", "a".repeat(31));
        let field = encode_label(&label);
        assert_eq!("a".repeat(31), decode_label(&field).expect("label should decode"));
    }

    #[test]
    fn unknown_hardware_uses_default_kelvin_range() {
        let color = Color {
            kelvin: 1000,
            ..Color::BLACK
        };
        assert_eq!(2500, device().sanitize_color(color).kelvin);
    }

    #[rstest]
    #[case(None, 1500, 2700)]
    #[case(None, 7000, 6500)]
    #[case(Some(FirmwareVersion::new(3, 0)), 1500, 2700)]
    #[case(Some(FirmwareVersion::new(3, 50)), 1500, 1500)]
    #[case(Some(FirmwareVersion::new(3, 50)), 9500, 9000)]
    #[case(Some(FirmwareVersion::new(3, 50)), 4000, 4000)]
    fn known_product_uses_firmware_kelvin_range(
        #[case] firmware: Option<FirmwareVersion>,
        #[case] kelvin: u16,
        #[case] expected: u16,
    ) {
        let registry = ProductRegistry::from_products([Product {
            vendor_id: 1,
            vendor_name: "LIFX".to_string(),
            product_id: 500,
            name: "Test".to_string(),
            features: Features {
                temperature_range: Some(TemperatureRange::new(2700, 6500)),
                ..Features::default()
            },
            upgrades: vec![FirmwareUpgrade {
                major: 3,
                minor: 50,
                features: Features {
                    temperature_range: Some(TemperatureRange::new(1500, 9000)),
                    ..Features::default()
                },
            }],
        }]);
        let device = device().with_registry(Arc::new(registry));
        {
            let mut cache = device.write_cache();
            cache.hardware = Some(HardwareVersion {
                vendor_id: 1,
                product_id: 500,
                version: 0,
            });
            cache.firmware = firmware;
        }

        let color = Color {
            kelvin,
            ..Color::BLACK
        };
        assert_eq!(expected, device.sanitize_color(color).kelvin);
    }

    #[test]
    fn display_prefers_label_then_product() {
        let device = device();
        assert_eq!("Device(d0:73:d5:00:00:01)", device.to_string());

        device.cache_hardware_version_if_unset(HardwareVersion {
            vendor_id: 1,
            product_id: 55,
            version: 0,
        });
        assert_eq!("LIFX Tile(d0:73:d5:00:00:01)", device.to_string());

        device.cache_label("Desk".to_string());
        assert_eq!("Desk(d0:73:d5:00:00:01)", device.to_string());
    }

    #[test]
    fn service_type_display() {
        assert_eq!("UDP", ServiceType::UDP.to_string());
        assert_eq!("<unknown>(5)", ServiceType::from(5).to_string());
    }
}
