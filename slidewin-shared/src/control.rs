//! Out-of-band session markers.

/// Control signals exchanged once each per session.
///
/// Sent as a single-integer message, never interleaved with frame payloads.
/// The values are fixed by the protocol.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// Receiver is done with the session
    Disconnect = 1000,
    /// Receiver requests a frame stream
    Connect = 1001,
}

impl ControlSignal {
    /// Convert from the raw wire value.
    ///
    /// Returns `None` for anything other than the two protocol values.
    #[inline]
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1000 => Some(Self::Disconnect),
            1001 => Some(Self::Connect),
            _ => None,
        }
    }

    /// Raw wire value.
    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for ControlSignal {
    type Error = i32;

    #[inline]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_i32(value).ok_or(value)
    }
}
