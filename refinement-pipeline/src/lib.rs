#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod chunking;
pub mod commands;
pub mod domain;
pub mod events;
pub mod handlers;
pub mod services;
pub mod tally;
pub mod wiring;

pub use services::RefinementServices;
pub use wiring::{build_command_bus, wire_saga};
