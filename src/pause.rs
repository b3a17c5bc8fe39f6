//! Pause and resume directions for a running transfer.

use std::ops::BitOr;

/// Bitmask for [`Handle::pause`](crate::Handle::pause) (`CURLPAUSE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pause(pub i32);

impl Pause {
    /// Pause receiving
    pub const RECV: Self = Self(1);
    /// Resume receiving
    pub const RECV_CONT: Self = Self(0);
    /// Pause sending
    pub const SEND: Self = Self(1 << 2);
    /// Resume sending
    pub const SEND_CONT: Self = Self(0);
    /// Pause both directions
    pub const ALL: Self = Self(Self::RECV.0 | Self::SEND.0);
    /// Resume both directions
    pub const CONT: Self = Self(Self::RECV_CONT.0 | Self::SEND_CONT.0);

    /// Raw bitmask.
    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }
}

impl BitOr for Pause {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_combine() {
        assert_eq!(Pause::RECV | Pause::SEND, Pause::ALL);
        assert_eq!(Pause::RECV_CONT | Pause::SEND_CONT, Pause::CONT);
        assert_eq!(Pause::ALL.bits(), 5);
        assert_eq!(Pause::default(), Pause::CONT);
    }
}
