//! Virtual machine tags for non-EVM linked wallets

use std::fmt;

/// `WalletLib.VirtualMachineType`, carried as `uint8` in `Wallet.vmType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VirtualMachineType {
    /// Unset or unsupported VM
    Unknown = 0,
    /// Solana VM
    Svm = 1,
}

impl VirtualMachineType {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Svm),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Svm => "SVM",
        }
    }
}

impl From<VirtualMachineType> for u8 {
    fn from(value: VirtualMachineType) -> Self {
        value.as_u8()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid virtual machine type: {0}")]
pub struct InvalidVmType(pub u8);

impl TryFrom<u8> for VirtualMachineType {
    type Error = InvalidVmType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(InvalidVmType(value))
    }
}

impl fmt::Display for VirtualMachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(VirtualMachineType::from_u8(1), Some(VirtualMachineType::Svm));
        assert_eq!(VirtualMachineType::from_u8(2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualMachineType::Svm.to_string(), "SVM (1)");
    }
}
