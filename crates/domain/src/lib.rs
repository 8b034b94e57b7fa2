//! Domain layer for the equipment tracker backend.
//!
//! This crate contains:
//! - Domain models (Equipment, Room, MovementRecord, LocationChangeRequest)
//! - Store traits implemented by the persistence layer, plus an in-memory store
//! - Core services (movement engine, location-change workflow, detection ingestion)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{DomainError, NotFoundKind, StoreError};
