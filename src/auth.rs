//! Bearer token model and payload decoding.

pub mod claims;
pub mod secret;

pub use claims::*;
pub use secret::*;
