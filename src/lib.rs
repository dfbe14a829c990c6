//! AgriDatum harvest attestation service library

pub mod address;
pub mod attestation;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod record;
pub mod resilience;
pub mod store;

pub use attestation::AttestationService;
pub use config::schema::AgriConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
