//! Strata Core — commit and rehydration protocol for event-sourced aggregates.
//!
//! This crate defines the aggregate contract, the storage traits for the
//! event log and snapshot collections, and the [`repository::Repository`]
//! that commits aggregates into those stores and rebuilds them from the
//! cheapest combination of latest snapshot plus the events recorded after it.
//! It contains no storage driver code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod observer;
pub mod options;
pub mod planner;
pub mod rehydrate;
pub mod repository;
pub mod store;
