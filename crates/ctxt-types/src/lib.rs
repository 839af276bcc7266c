//! Shared value types for the ctxt crates.

pub mod phone;
pub mod record;
pub mod share;

pub use phone::{NumberError, PhoneNumber};
pub use record::KeyRecord;
pub use share::ShareError;
