pub mod summary_cache;

pub use summary_cache::SummaryCache;
