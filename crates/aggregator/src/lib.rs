pub mod aggregate;

pub use aggregate::{Aggregator, SummarySource};
