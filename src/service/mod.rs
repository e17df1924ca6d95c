// Private module declaration
mod order_lookup;

// Re-export for public API
pub use order_lookup::{Lookup, LookupError, LookupSource, OrderLookupService};
