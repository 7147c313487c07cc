//! Per-request context for an axum web service.
//!
//! Middleware resolves the caller's identity and session token once per
//! request; handlers then take a [`context::ReqContext`] and use it to check
//! roles and help flags, render error pages and emit JSON envelopes.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod templates;

pub use context::ReqContext;
pub use state::AppState;
