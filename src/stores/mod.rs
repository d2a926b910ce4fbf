pub mod user_store;
pub mod search;
pub mod mem_store;
pub mod pg_store;
