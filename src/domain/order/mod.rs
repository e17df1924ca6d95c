// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Delivery, Payment, Item)
// - Aggregate (Order with decoding and validation)
// - Errors (OrderError)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
