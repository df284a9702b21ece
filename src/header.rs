use std::ops::BitOr;

use bytes::{Buf, BufMut};

use crate::error::MalformedMessage;
use crate::protocol::MessageType;
use crate::target::Target;

/// Length of the fixed header that precedes every payload.
pub const HEADER_LENGTH: usize = 36;

const PROTOCOL_VERSION: u16 = 1024;
const ADDRESSABLE_BIT: u16 = 1 << 12;
const TAGGED_BIT: u16 = 1 << 13;
const RESERVED_AFTER_TARGET: usize = 6;
const RESERVED_AFTER_SEQUENCE: usize = 8;
const RESERVED_AFTER_TYPE: usize = 2;

/// Addressing-mode field: protocol version, addressable bit and tagged bit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::From, derive_more::Into)]
pub struct TaggedHeader(u16);

impl TaggedHeader {
    /// Message addressed to the target in the header.
    pub const NOT_TAGGED: Self = Self(ADDRESSABLE_BIT + PROTOCOL_VERSION);
    /// Message addressed to every device (broadcast discovery).
    pub const TAGGED: Self = Self(TAGGED_BIT + ADDRESSABLE_BIT + PROTOCOL_VERSION);

    /// Returns the raw field value.
    ///
    /// ```
    /// use lifxlan::TaggedHeader;
    ///
    /// assert_eq!(5120, TaggedHeader::NOT_TAGGED.value());
    /// assert_eq!(13312, TaggedHeader::TAGGED.value());
    /// ```
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns whether the tagged bit is set.
    #[must_use]
    pub const fn is_tagged(self) -> bool {
        self.0 & TAGGED_BIT != 0
    }
}

/// Ack-required / response-required flag byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, derive_more::From, derive_more::Into)]
pub struct AckResFlags(u8);

impl AckResFlags {
    pub const NONE: Self = Self(0);
    /// Ask the device for a state reply.
    pub const RES_REQUIRED: Self = Self(1 << 0);
    /// Ask the device for an acknowledgement.
    pub const ACK_REQUIRED: Self = Self(1 << 1);

    /// Returns the raw flag byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns whether every bit in `other` is set.
    ///
    /// ```
    /// use lifxlan::AckResFlags;
    ///
    /// let flags = AckResFlags::ACK_REQUIRED | AckResFlags::RES_REQUIRED;
    /// assert!(flags.contains(AckResFlags::ACK_REQUIRED));
    /// assert!(!AckResFlags::RES_REQUIRED.contains(AckResFlags::ACK_REQUIRED));
    /// ```
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags for a request that may ask for an acknowledgement.
    #[must_use]
    pub const fn ack_if(ack: bool) -> Self {
        if ack { Self::ACK_REQUIRED } else { Self::NONE }
    }
}

impl BitOr for AckResFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Decoded fixed-layout message header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Header {
    size: u16,
    tagged: TaggedHeader,
    source: u32,
    target: Target,
    flags: AckResFlags,
    sequence: u8,
    message_type: MessageType,
}

impl Header {
    /// Creates a header for a message of `size` total bytes.
    #[must_use]
    pub const fn new(
        size: u16,
        tagged: TaggedHeader,
        source: u32,
        target: Target,
        flags: AckResFlags,
        sequence: u8,
        message_type: MessageType,
    ) -> Self {
        Self {
            size,
            tagged,
            source,
            target,
            flags,
            sequence,
            message_type,
        }
    }

    /// Encodes the header as 36 little-endian bytes with zeroed reserved regions.
    ///
    /// ```
    /// use lifxlan::{AckResFlags, Header, MessageType, TaggedHeader, Target};
    ///
    /// let header = Header::new(
    ///     36,
    ///     TaggedHeader::TAGGED,
    ///     7,
    ///     Target::AllDevices,
    ///     AckResFlags::NONE,
    ///     0,
    ///     MessageType::GET_SERVICE,
    /// );
    /// let bytes = header.encode();
    /// assert_eq!([0x24, 0x00, 0x00, 0x34], bytes[..4]);
    /// assert_eq!([0x02, 0x00], bytes[32..34]);
    /// ```
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LENGTH] {
        let mut out = [0_u8; HEADER_LENGTH];
        let mut buf = &mut out[..];
        buf.put_u16_le(self.size);
        buf.put_u16_le(self.tagged.value());
        buf.put_u32_le(self.source);
        buf.put_u64_le(self.target.to_wire());
        buf.put_bytes(0, RESERVED_AFTER_TARGET);
        buf.put_u8(self.flags.bits());
        buf.put_u8(self.sequence);
        buf.put_bytes(0, RESERVED_AFTER_SEQUENCE);
        buf.put_u16_le(self.message_type.value());
        buf.put_bytes(0, RESERVED_AFTER_TYPE);
        out
    }

    /// Decodes the first 36 bytes of `bytes`, ignoring reserved regions.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedMessage::TooShort`] when fewer than 36 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, MalformedMessage> {
        if bytes.len() < HEADER_LENGTH {
            return Err(MalformedMessage::TooShort {
                expected: HEADER_LENGTH,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_LENGTH];
        let size = buf.get_u16_le();
        let tagged = TaggedHeader(buf.get_u16_le());
        let source = buf.get_u32_le();
        let target = Target::from_wire(buf.get_u64_le());
        buf.advance(RESERVED_AFTER_TARGET);
        let flags = AckResFlags(buf.get_u8());
        let sequence = buf.get_u8();
        buf.advance(RESERVED_AFTER_SEQUENCE);
        let message_type = MessageType::new(buf.get_u16_le());

        Ok(Self {
            size,
            tagged,
            source,
            target,
            flags,
            sequence,
            message_type,
        })
    }

    #[must_use]
    pub const fn size(&self) -> u16 {
        self.size
    }

    #[must_use]
    pub const fn tagged(&self) -> TaggedHeader {
        self.tagged
    }

    #[must_use]
    pub const fn source(&self) -> u32 {
        self.source
    }

    #[must_use]
    pub const fn target(&self) -> Target {
        self.target
    }

    #[must_use]
    pub const fn flags(&self) -> AckResFlags {
        self.flags
    }

    #[must_use]
    pub const fn sequence(&self) -> u8 {
        self.sequence
    }

    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn sample_header() -> Header {
        Header::new(
            40,
            TaggedHeader::NOT_TAGGED,
            0xdead_beef,
            "d0:73:d5:01:02:03".parse().expect("target should parse"),
            AckResFlags::ACK_REQUIRED | AckResFlags::RES_REQUIRED,
            9,
            MessageType::LIGHT_SET_COLOR,
        )
    }

    #[test]
    fn encode_writes_fields_at_fixed_offsets() {
        let bytes = sample_header().encode();

        assert_eq!([0x28, 0x00], bytes[0..2]);
        assert_eq!([0x00, 0x14], bytes[2..4]);
        assert_eq!([0xef, 0xbe, 0xad, 0xde], bytes[4..8]);
        assert_eq!([0xd0, 0x73, 0xd5, 0x01, 0x02, 0x03, 0x00, 0x00], bytes[8..16]);
        assert_eq!([0; 6], bytes[16..22]);
        assert_eq!(0x03, bytes[22]);
        assert_eq!(9, bytes[23]);
        assert_eq!([0; 8], bytes[24..32]);
        assert_eq!([102, 0], bytes[32..34]);
        assert_eq!([0; 2], bytes[34..36]);
    }

    #[test]
    fn decode_reads_back_every_field() {
        let header = sample_header();
        let decoded = Header::decode(&header.encode()).expect("header should decode");
        assert_eq!(header, decoded);
        assert!(!decoded.tagged().is_tagged());
    }

    #[test]
    fn decode_ignores_reserved_bytes() {
        let mut bytes = sample_header().encode();
        bytes[16..22].fill(0xff);
        bytes[24..32].fill(0xff);
        bytes[34..36].fill(0xff);

        let decoded = Header::decode(&bytes).expect("header should decode");
        assert_eq!(sample_header(), decoded);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(35)]
    fn decode_rejects_short_buffers(#[case] len: usize) {
        let bytes = vec![0_u8; len];
        assert_matches!(
            Header::decode(&bytes),
            Err(MalformedMessage::TooShort { expected: 36, actual }) if actual == len
        );
    }

    #[test]
    fn tagged_constant_sets_tagged_bit() {
        assert!(TaggedHeader::TAGGED.is_tagged());
        assert_eq!(TaggedHeader::TAGGED.value() - TaggedHeader::NOT_TAGGED.value(), 1 << 13);
    }
}
