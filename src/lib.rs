// src/lib.rs

pub mod client;
pub mod config;
pub mod error;
pub mod exam;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
