//! HTTP API handlers for the pipeline service

pub mod batches;
pub mod health;
pub mod webhook;

pub use batches::batch_routes;
pub use health::health_routes;
pub use webhook::webhook_routes;
