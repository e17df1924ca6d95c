// Private module declarations
mod handlers;
mod server;

// Re-exports for public API
pub use handlers::configure;
pub use server::run_http_server;
