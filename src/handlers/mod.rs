// Handler modules
pub mod ingest;
pub mod serve;

// Re-export all handler functions
pub use ingest::{IngestOptions, handle_ingest};
pub use serve::handle_serve;
