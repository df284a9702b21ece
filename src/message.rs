use bytes::Bytes;

use crate::error::MalformedMessage;
use crate::header::{AckResFlags, HEADER_LENGTH, Header, TaggedHeader};
use crate::protocol::MessageType;
use crate::target::Target;

const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - HEADER_LENGTH;

/// Addressing and correlation fields for one outgoing message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MessageMeta {
    pub tagged: TaggedHeader,
    pub source: u32,
    pub target: Target,
    pub flags: AckResFlags,
    pub sequence: u8,
    pub message_type: MessageType,
}

/// Builds one datagram: the header followed by `payload` verbatim.
///
/// # Errors
///
/// Returns [`MalformedMessage::PayloadTooLarge`] when the total size does not
/// fit the 16-bit size field.
///
/// ```
/// use lifxlan::{AckResFlags, MessageMeta, MessageType, TaggedHeader, Target, build_message};
///
/// let meta = MessageMeta {
///     tagged: TaggedHeader::NOT_TAGGED,
///     source: 42,
///     target: Target::AllDevices,
///     flags: AckResFlags::NONE,
///     sequence: 1,
///     message_type: MessageType::SET_POWER,
/// };
/// let datagram = build_message(&meta, &[0xff, 0xff])?;
/// assert_eq!(38, datagram.len());
/// assert_eq!([38, 0], datagram[..2]);
/// # Ok::<(), lifxlan::MalformedMessage>(())
/// ```
pub fn build_message(meta: &MessageMeta, payload: &[u8]) -> Result<Vec<u8>, MalformedMessage> {
    let size = u16::try_from(HEADER_LENGTH + payload.len()).map_err(|_| {
        MalformedMessage::PayloadTooLarge {
            payload_len: payload.len(),
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    })?;

    let header = Header::new(
        size,
        meta.tagged,
        meta.source,
        meta.target,
        meta.flags,
        meta.sequence,
        meta.message_type,
    );

    let mut datagram = Vec::with_capacity(usize::from(size));
    datagram.extend_from_slice(&header.encode());
    datagram.extend_from_slice(payload);
    Ok(datagram)
}

/// Parses one received datagram into header fields and raw payload.
///
/// # Errors
///
/// Returns [`MalformedMessage::TooShort`] for buffers under 36 bytes and
/// [`MalformedMessage::SizeMismatch`] when the declared size differs from the
/// buffer length.
pub fn parse_message(bytes: &[u8]) -> Result<Response, MalformedMessage> {
    let header = Header::decode(bytes)?;
    let declared = usize::from(header.size());
    if declared != bytes.len() {
        return Err(MalformedMessage::SizeMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    Ok(Response {
        message_type: header.message_type(),
        flags: header.flags(),
        source: header.source(),
        target: header.target(),
        sequence: header.sequence(),
        payload: Bytes::copy_from_slice(&bytes[HEADER_LENGTH..]),
    })
}

/// Fails unless `payload` holds at least `expected` bytes.
pub(crate) fn require_len(payload: &[u8], expected: usize) -> Result<(), MalformedMessage> {
    if payload.len() < expected {
        return Err(MalformedMessage::TooShort {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// A parsed inbound message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Response {
    message_type: MessageType,
    flags: AckResFlags,
    source: u32,
    target: Target,
    sequence: u8,
    payload: Bytes,
}

impl Response {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    #[must_use]
    pub fn flags(&self) -> AckResFlags {
        self.flags
    }

    #[must_use]
    pub fn source(&self) -> u32 {
        self.source
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Returns the undecoded payload bytes.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns whether this message answers the request with `source` and `sequence`.
    #[must_use]
    pub fn correlates_with(&self, source: u32, sequence: u8) -> bool {
        self.source == source && self.sequence == sequence
    }
}
