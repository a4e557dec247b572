//! Periodic background jobs

pub mod cache_warmer;

pub use cache_warmer::{CacheWarmer, CACHE_WARMER_PERIOD, CACHE_WARMER_PROCESS};
