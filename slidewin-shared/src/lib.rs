//! # slidewin-shared
//!
//! Wire types for the slidewin frame-transfer protocol.
//!
//! This crate provides the low-level types used by every transport and by
//! both protocol roles:
//!
//! - [`ControlSignal`]: the CONNECT/DISCONNECT markers exchanged once per session
//! - [`MessageType`]: datagram discriminator (protocol data vs. transport barrier)
//! - [`PacketHeader`]: 24-byte datagram header
//! - CRC32 checksum utilities and `i32` payload codecs
//!
//! ## Layer Diagram
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ slidewin (Protocol Layer)               │
//! │ - Sender, Receiver, ThroughputMeter     │
//! └────────────────────┬────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────┐
//! │ slidewin-shared (Wire Layer)            │
//! │ - ControlSignal, PacketHeader (Binary)  │  ← This crate
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use slidewin_shared::{MessageType, PacketHeader, HEADER_SIZE};
//!
//! // Header for an 8-element frame from rank 0
//! let payload = slidewin_shared::payload::encode(&[0, 1, 2, 3, 4, 5, 6, 7]);
//! let mut header = PacketHeader::new(0, 0, 0, MessageType::Data, 8);
//! header.calculate_checksum(&payload);
//!
//! let bytes = header.to_bytes();
//! assert_eq!(bytes.len(), HEADER_SIZE);
//! ```

mod control;
mod header;
mod message_type;
pub mod payload;

pub use control::ControlSignal;
pub use header::{PacketHeader, HEADER_SIZE};
pub use message_type::MessageType;

/// Size of one protocol element on the wire (`i32`).
pub const ELEMENT_SIZE: usize = std::mem::size_of::<i32>();

/// Re-export CRC32 utilities
pub mod crc32 {
    pub use crc32fast::Hasher;

    /// Calculate CRC32 checksum for data
    #[inline]
    pub fn crc32(data: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Calculate CRC32 incrementally (continue from previous checksum)
    #[inline]
    pub fn crc32_incremental(initial_crc: u32, data: &[u8]) -> u32 {
        let mut hasher = Hasher::new_with_initial(initial_crc);
        hasher.update(data);
        hasher.finalize()
    }
}
