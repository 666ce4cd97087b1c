//! Correlog: structured JSON logging with request correlation IDs.
//!
//! An identifier set when a request enters the service becomes visible,
//! without parameter passing, to every log call and outbound HTTP call
//! made while handling that request, and stays isolated from requests
//! handled concurrently.
//!
//! # Architecture
//!
//! - [`context`] -- Task-local request context (correlation ID, path, method).
//! - [`formatter`] -- `tracing-subscriber` event formatter producing one JSON
//!   document per line.
//! - [`middleware`] -- Tower layer that seeds the context, logs request
//!   outcomes, and normalizes error responses to JSON.
//! - [`client`] -- Outbound hyper client that forwards `x-correlation-id`.
//! - [`logging`] -- Subscriber setup and the [`configure`](logging::configure)
//!   entrypoint for axum applications.
//! - [`error`] -- Unified error type using `thiserror`.
//! - [`cli`], [`cmd`], [`server`], [`health`], [`proxy`] -- The `correlog`
//!   demo binary: a small service that relays to an optional upstream.
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Router};
//!
//! # fn main() -> Result<(), correlog::error::CorrelogError> {
//! let app: Router = Router::new().route("/orders", get(|| async { "[]" }));
//! let app = correlog::logging::configure(app, "orders")?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

// Errors are documented once on `CorrelogError`.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod client;
pub mod cmd;
pub mod context;
pub mod error;
pub mod formatter;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
