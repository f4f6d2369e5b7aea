//! Server-driven Stripe Terminal sample backend.
//!
//! A thin HTTP layer in front of the Stripe Terminal API. A point-of-sale
//! page can list readers, create a card-present payment intent, hand it to a
//! reader, simulate a card tap on a simulated reader, and capture or cancel.
//!
//! # Flow
//!
//! ```text
//! POST /create-payment-intent   {amount}                      -> {payment_intent_id}
//! POST /process-payment-intent  {reader_id, payment_intent_id} -> {reader_state}
//! POST /simulate-payment        {reader_id}                    -> {reader_state}
//! POST /capture-payment-intent  {payment_intent_id}            -> {payment_intent}
//! ```
//!
//! Each endpoint makes exactly one upstream call. Stripe errors come back as
//! `400 {"error": {"message": ...}}`, anything else as a generic 500.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`stripe`]: Upstream provider trait, Stripe client and mock
//! - [`api`]: HTTP handlers and router
//! - [`metrics`]: Upstream latency and outcome metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod stripe;
pub mod utils;

pub use config::Config;
pub use error::{ServiceError, UpstreamError};
