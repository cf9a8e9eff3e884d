//! Towns protocol enum types
//!
//! Solidity enums are `uint8` on the wire. The generated bindings keep them as
//! raw integers so selectors stay identical to the ABI; these types give them
//! a checked Rust representation.

mod delegation_type;
mod vm_type;
mod vote_status;

pub use delegation_type::{DelegationType, InvalidDelegationType};
pub use vm_type::{InvalidVmType, VirtualMachineType};
pub use vote_status::{InvalidVoteStatus, NodeVoteStatus};
