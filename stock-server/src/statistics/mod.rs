//! Sales statistics
//!
//! Combines completed orders from the web and POS channels:
//! - buckets by granularity (hour / day / month)
//! - cross-channel top products (top 10)
//!
//! Read-only; every query runs in one read transaction.

pub mod aggregation;
pub mod time_range;

pub use aggregation::SalesAggregator;
pub use time_range::TimeWindow;
