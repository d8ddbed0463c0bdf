//! MedPortal: patient/doctor portal backend and its HTTP client.

pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod schema;
pub mod storage;
pub mod telemetry;
pub mod validation;
