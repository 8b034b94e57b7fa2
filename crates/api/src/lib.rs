//! HTTP surface, configuration and background workers for the equipment
//! tracker.

pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
