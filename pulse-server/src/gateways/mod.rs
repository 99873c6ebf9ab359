//! Gateway orchestration: one module per endpoint, wiring the model, store,
//! and chat pipelines together. Gateways take concrete clients; credential
//! presence is the HTTP layer's concern.

pub mod analyze;
pub mod chat;
pub mod library;
