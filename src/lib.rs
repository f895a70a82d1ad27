pub mod api;
pub mod brain;
pub mod config;
pub mod memory;
pub mod metrics;
pub mod world;
