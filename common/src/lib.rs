pub mod concurrency;
pub mod domain;
pub mod error;
pub mod ports;
pub mod storage;
pub mod utils;
