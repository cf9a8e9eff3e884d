//! Entitlement check vote outcomes
//!
//! Off-chain nodes answer an entitlement check request by posting one of the
//! `IEntitlementGatedBase.NodeVoteStatus` values back to the gateway. The
//! value is a `uint8` in calldata and in the `EntitlementCheckResultPosted`
//! event.

use std::fmt;

/// Vote a node casts for an entitlement check
///
/// # Example
///
/// ```rust
/// use towns_bindings::NodeVoteStatus;
///
/// assert_eq!(NodeVoteStatus::Passed.as_u8(), 1);
/// assert!(NodeVoteStatus::Failed.is_final());
/// assert!(!NodeVoteStatus::NotVoted.is_final());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeVoteStatus {
    /// The node has not voted yet
    NotVoted = 0,
    /// The wallet satisfies the entitlement
    Passed = 1,
    /// The wallet does not satisfy the entitlement
    Failed = 2,
}

impl NodeVoteStatus {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotVoted),
            1 => Some(Self::Passed),
            2 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true for the two outcomes a node can post.
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::NotVoted => "NotVoted",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }
}

impl From<NodeVoteStatus> for u8 {
    fn from(value: NodeVoteStatus) -> Self {
        value.as_u8()
    }
}

impl From<bool> for NodeVoteStatus {
    fn from(passed: bool) -> Self {
        if passed {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid node vote status: {0}")]
pub struct InvalidVoteStatus(pub u8);

impl TryFrom<u8> for NodeVoteStatus {
    type Error = InvalidVoteStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(InvalidVoteStatus(value))
    }
}

impl fmt::Display for NodeVoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(NodeVoteStatus::NotVoted))]
    #[case(1, Some(NodeVoteStatus::Passed))]
    #[case(2, Some(NodeVoteStatus::Failed))]
    #[case(3, None)]
    #[case(200, None)]
    fn test_from_u8(#[case] raw: u8, #[case] expected: Option<NodeVoteStatus>) {
        assert_eq!(NodeVoteStatus::from_u8(raw), expected);
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(NodeVoteStatus::from(true), NodeVoteStatus::Passed);
        assert_eq!(NodeVoteStatus::from(false), NodeVoteStatus::Failed);
    }

    #[test]
    fn test_try_from_error_carries_value() {
        let err = NodeVoteStatus::try_from(9).unwrap_err();
        assert_eq!(err, InvalidVoteStatus(9));
        assert_eq!(err.to_string(), "invalid node vote status: 9");
    }
}
