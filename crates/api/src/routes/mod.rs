//! HTTP route handlers.

pub mod equipment;
pub mod health;
pub mod location_change;
pub mod movements;
pub mod rooms;
