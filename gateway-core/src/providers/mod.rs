//! Payment provider implementations

pub mod http;
pub mod simulated;

pub use http::{HttpProvider, HttpProviderConfig};
pub use simulated::SimulatedProvider;
