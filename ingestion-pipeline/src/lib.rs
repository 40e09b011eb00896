#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod asset_tagging;
pub mod commands;
pub mod concurrency;
pub mod dedup;
pub mod domain;
pub mod events;
pub mod handlers;
pub mod normalization;
pub mod services;
pub mod wiring;

pub use services::PipelineServices;
pub use wiring::{build_command_bus, wire_saga};
