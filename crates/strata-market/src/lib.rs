//! Strata — Market bounded context.
//!
//! A market tracks the orders placed on it and their running average price.
//! It is persisted through the snapshotting repository and indexed by
//! exchange.

pub mod application;
pub mod domain;
