//! Domain model for the Market context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod notifications;
