//! Application services for the Market context.

pub mod command_handlers;
pub mod query_handlers;
