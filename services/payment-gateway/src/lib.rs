// Payment Gateway Service Library
// Exposes modules for testing and integration

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod negotiation;
pub mod server;
pub mod telemetry;
