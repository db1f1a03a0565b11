//! Datagram header.

use crate::crc32::{crc32, crc32_incremental};
use crate::{MessageType, ELEMENT_SIZE};
use bytemuck::{Pod, Zeroable};

/// Datagram header size in bytes.
pub const HEADER_SIZE: usize = 24;

/// Datagram header (24 bytes).
///
/// Layout:
/// ```text
/// Offset  Size  Field
/// 0       4     source
/// 4       8     sequence
/// 12      4     tag
/// 16      1     msg_type
/// 17      1     flags
/// 18      2     count
/// 20      4     checksum
/// ```
///
/// The checksum covers the entire header (with checksum field zeroed) plus payload.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PacketHeader {
    /// Rank of the sending endpoint
    pub source: u32,
    /// Per (source, destination) sequence number, starts at 0
    pub sequence: u64,
    /// Message tag chosen by the sender
    pub tag: i32,
    /// Message type (see [`MessageType`])
    pub msg_type: u8,
    /// Reserved, always 0
    pub flags: u8,
    /// Payload length in `i32` elements
    pub count: u16,
    /// CRC32 checksum of header + payload
    pub checksum: u32,
}

impl PacketHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    /// Largest payload a header can describe, in elements.
    pub const MAX_COUNT: usize = u16::MAX as usize;

    /// Create a new packet header.
    #[inline]
    pub fn new(source: u32, sequence: u64, tag: i32, msg_type: MessageType, count: usize) -> Self {
        Self {
            source,
            sequence,
            tag,
            msg_type: msg_type as u8,
            flags: 0,
            count: count as u16,
            checksum: 0,
        }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        let count = self.count;
        count as usize * ELEMENT_SIZE
    }

    /// Serialize header to bytes.
    #[inline]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.source.to_le_bytes());
        buf[4..12].copy_from_slice(&self.sequence.to_le_bytes());
        buf[12..16].copy_from_slice(&self.tag.to_le_bytes());
        buf[16] = self.msg_type;
        buf[17] = self.flags;
        buf[18..20].copy_from_slice(&self.count.to_le_bytes());
        buf[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Parse header from bytes.
    ///
    /// Returns `None` if buffer is too small.
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            source: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            sequence: u64::from_le_bytes([
                buf[4], buf[5], buf[6], buf[7], buf[8], buf[9], buf[10], buf[11],
            ]),
            tag: i32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            msg_type: buf[16],
            flags: buf[17],
            count: u16::from_le_bytes([buf[18], buf[19]]),
            checksum: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }

    /// Parse header from a datagram, also returning the payload slice.
    ///
    /// Returns `None` if the datagram is too small for the advertised count.
    #[inline]
    pub fn from_packet(buf: &[u8]) -> Option<(Self, &[u8])> {
        let header = Self::from_bytes(buf)?;
        let payload_len = header.payload_len();

        if buf.len() < HEADER_SIZE + payload_len {
            return None;
        }

        Some((header, &buf[HEADER_SIZE..HEADER_SIZE + payload_len]))
    }

    /// Calculate and set the CRC32 checksum.
    ///
    /// Checksum covers header (with checksum field zeroed) + payload.
    pub fn calculate_checksum(&mut self, payload: &[u8]) {
        self.checksum = 0;
        let header_bytes = self.to_bytes();
        let header_crc = crc32(&header_bytes);
        self.checksum = crc32_incremental(header_crc, payload);
    }

    /// Verify the checksum against the payload.
    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        let stored_checksum = { self.checksum };

        let mut header_copy = *self;
        header_copy.checksum = 0;
        let header_bytes = header_copy.to_bytes();
        let header_crc = crc32(&header_bytes);
        let computed = crc32_incremental(header_crc, payload);

        stored_checksum == computed
    }

    /// Get the message type as enum, `None` if the byte is unknown.
    #[inline]
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.msg_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<PacketHeader>(), HEADER_SIZE);
    }

    #[test]
    fn test_header_fields_survive_serialization() {
        let mut header = PacketHeader::new(3, 42, -7, MessageType::Data, 8);
        header.calculate_checksum(&payload::encode(&[0; 8]));

        let bytes = header.to_bytes();
        let parsed = PacketHeader::from_bytes(&bytes).unwrap();

        assert_eq!({ parsed.source }, 3);
        assert_eq!({ parsed.sequence }, 42);
        assert_eq!({ parsed.tag }, -7);
        assert_eq!(parsed.message_type(), Some(MessageType::Data));
        assert_eq!({ parsed.count }, 8);
        assert_eq!({ parsed.checksum }, { header.checksum });
    }

    #[test]
    fn test_checksum_verification() {
        let body = payload::encode(&[1001]);
        let mut header = PacketHeader::new(1, 0, 1, MessageType::Data, 1);
        header.calculate_checksum(&body);

        assert!(header.verify_checksum(&body));
        assert!(!header.verify_checksum(&payload::encode(&[1000])));
    }

    #[test]
    fn test_from_packet() {
        let body = payload::encode(&[10, 11, 12, 13]);
        let mut header = PacketHeader::new(0, 5, 0, MessageType::Data, 4);
        header.calculate_checksum(&body);

        let mut packet = Vec::with_capacity(HEADER_SIZE + body.len());
        packet.extend_from_slice(&header.to_bytes());
        packet.extend_from_slice(&body);

        let (parsed_header, parsed_payload) = PacketHeader::from_packet(&packet).unwrap();
        assert_eq!({ parsed_header.sequence }, 5);
        assert_eq!(parsed_payload, body.as_slice());
    }

    #[test]
    fn test_from_packet_rejects_short_payload() {
        let header = PacketHeader::new(0, 0, 0, MessageType::Data, 4);
        let mut packet = header.to_bytes().to_vec();
        packet.extend_from_slice(&[0u8; 8]);
        assert!(PacketHeader::from_packet(&packet).is_none());
    }

    #[test]
    fn test_barrier_header_has_no_payload() {
        let header = PacketHeader::new(2, 0, 0, MessageType::Barrier, 0);
        assert_eq!(header.payload_len(), 0);
        assert_eq!(header.message_type(), Some(MessageType::Barrier));
    }
}
