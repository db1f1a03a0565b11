//! Datagram type discriminator.

/// Datagram types for the packet transport.
///
/// - `Data`: protocol message (control signal or frame payload)
/// - `Barrier`: a rank has entered the shutdown barrier
/// - `Release`: the barrier root lets a waiting rank leave
/// - `Hello`: a rank announces its bound socket to the root at startup
/// - `Welcome`: the root confirms every rank is bound
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Protocol message payload
    Data = 0,
    /// Barrier arrival, sent to the barrier root
    Barrier = 1,
    /// Barrier release, sent by the barrier root
    Release = 2,
    /// Startup announcement, resent until welcomed
    Hello = 3,
    /// Startup acknowledgement from the root
    Welcome = 4,
}

impl MessageType {
    /// Convert from raw byte value.
    ///
    /// Returns `None` for invalid values.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Data),
            1 => Some(Self::Barrier),
            2 => Some(Self::Release),
            3 => Some(Self::Hello),
            4 => Some(Self::Welcome),
            _ => None,
        }
    }

    /// Whether the datagram takes a slot in the per-pair sequence.
    ///
    /// Startup datagrams may be resent or duplicated, so they stay outside it.
    #[inline]
    pub fn is_sequenced(self) -> bool {
        !matches!(self, Self::Hello | Self::Welcome)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_values() {
        assert_eq!(MessageType::Data as u8, 0);
        assert_eq!(MessageType::Barrier as u8, 1);
        assert_eq!(MessageType::Release as u8, 2);
        assert_eq!(MessageType::Hello as u8, 3);
        assert_eq!(MessageType::Welcome as u8, 4);
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(MessageType::from_u8(0), Some(MessageType::Data));
        assert_eq!(MessageType::from_u8(2), Some(MessageType::Release));
        assert_eq!(MessageType::from_u8(4), Some(MessageType::Welcome));
        assert_eq!(MessageType::from_u8(5), None);
        assert_eq!(MessageType::try_from(255u8), Err(()));
    }

    #[test]
    fn test_startup_types_unsequenced() {
        assert!(MessageType::Data.is_sequenced());
        assert!(MessageType::Release.is_sequenced());
        assert!(!MessageType::Hello.is_sequenced());
        assert!(!MessageType::Welcome.is_sequenced());
    }
}
