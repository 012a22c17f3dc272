pub mod config;
pub mod constants;
pub mod journal;
pub mod pool;
pub mod solvency;
pub mod strategy;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use strategy::AmoStrategy;
