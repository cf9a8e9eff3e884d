//! Production implementations of the trait abstractions.
//!
//! This module provides the "real" implementations of the traits defined in
//! [`crate::traits`] that talk to an actual node and the system clock.
//!
//! Applications will typically use these providers, while test code uses the
//! fakes in [`crate::testing`].

mod alloy;
mod tokio_clock;

pub use self::alloy::AlloyLogSource;
pub use self::tokio_clock::TokioClock;
