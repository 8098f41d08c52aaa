//! Mosaico: a batch widget delivery service.
//!
//! Server-rendered pages defer small fragments ("widgets") to an
//! asynchronous fetch. Clients submit an ordered batch of widget
//! invocations; Mosaico resolves each to a registered handler, executes it
//! with per-widget fault isolation, and returns one JSON result per request.
//! Handlers split their work into a cacheable phase shared across requests
//! and an uncacheable phase recomputed per call.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod registry;
pub mod router;
pub mod widget;
