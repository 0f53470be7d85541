//! services/api/src/lib.rs
//!
//! The study companion service: adapters for the remote model and durable storage,
//! the application state owners, and the HTTP/WebSocket surface.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod web;
