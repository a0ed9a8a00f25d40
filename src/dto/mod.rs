//! Wire shapes for the gateway bridge and the HTTP API.

/// Frames exchanged with the platform gateway over `/bridge`.
pub mod bridge;
/// Health check payload.
pub mod health;
/// Guild playback queue snapshot.
pub mod queue;
/// Score ledger payloads.
pub mod scores;
/// Server-sent activity events.
pub mod sse;
