pub mod accounting;
pub mod data;
pub mod gate;
pub mod lock;
pub mod settings;
pub mod tilt;
pub mod transaction;

mod access;
// As a safety measure, we want to know explicitly where we have access to the engine operations.
mod executable;

pub use access::{GovernorAccess, StrategistAccess, VaultAccess};
pub use executable::AmoStrategy;
