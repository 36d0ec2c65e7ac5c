//! Date range partitioning
//!
//! The export endpoint rejects or truncates very long ranges, so a request is
//! split into consecutive windows that are fetched one after another.
//! Windows are inclusive on both ends and never overlap or leave gaps.

mod routers;

pub use routers::DateRangeRouter;
