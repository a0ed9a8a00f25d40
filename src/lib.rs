//! Library crate for crossroads-bot, exposing modules to the binaries and tests.

pub mod clients;
pub mod config;
/// Persisted score ledger.
pub mod dao;
pub mod dto;
/// Service and HTTP error types.
pub mod error;
pub mod platform;
/// HTTP routes and the router builder.
pub mod routes;
/// Business logic behind commands, buttons and the HTTP API.
pub mod services;
/// In-memory runtime state shared by every service.
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
