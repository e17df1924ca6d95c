// ============================================================================
// Domain Layer
// ============================================================================
//
// Order aggregate and its validation rules. Nothing in here knows about the
// broker, the database or the cache beyond the `CacheValue` marker.
//
// ============================================================================

pub mod order;
