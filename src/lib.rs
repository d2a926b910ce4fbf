pub mod core;
pub mod models;
pub mod stores;
pub mod registry;
pub mod metrics;
pub mod utils;
pub mod handlers;
