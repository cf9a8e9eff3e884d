//! Delegation scopes of the delegate registry
//!
//! The registry stores a `DelegationType` enum for every delegation record.
//! It is a `uint8` on the wire; this module gives it a typed Rust shape.
//!
//! Reference: <https://docs.delegate.xyz/technical-documentation/delegate-registry/v1>

use std::fmt;

/// Scope of a delegation record
///
/// # Example
///
/// ```rust
/// use towns_bindings::DelegationType;
///
/// assert_eq!(DelegationType::from_u8(1), Some(DelegationType::All));
/// assert_eq!(DelegationType::Token.as_u8(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DelegationType {
    /// Empty slot, never returned for a live delegation
    None = 0,
    /// Delegate may act for the vault on every contract
    All = 1,
    /// Delegate may act for the vault on one contract
    Contract = 2,
    /// Delegate may act for the vault on one token of one contract
    Token = 3,
}

impl DelegationType {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::All),
            2 => Some(Self::Contract),
            3 => Some(Self::Token),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::All => "All",
            Self::Contract => "Contract",
            Self::Token => "Token",
        }
    }
}

impl From<DelegationType> for u8 {
    fn from(value: DelegationType) -> Self {
        value.as_u8()
    }
}

/// Error returned when a `uint8` is not a known delegation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid delegation type: {0}")]
pub struct InvalidDelegationType(pub u8);

impl TryFrom<u8> for DelegationType {
    type Error = InvalidDelegationType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(InvalidDelegationType(value))
    }
}

impl fmt::Display for DelegationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
