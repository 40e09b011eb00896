//! Re-exported from `common` so every pipeline shares one retry policy
//! (§4.6, §5). Kept as its own module here so existing call sites
//! (`crate::concurrency::retry_on_concurrency`) don't need to change.

pub use common::concurrency::retry_on_concurrency;
