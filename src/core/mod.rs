pub mod config;
pub mod context;
pub mod error;
pub mod state;
pub mod routes;
pub mod startup;
pub mod tracing_init;
