pub mod ingest;
pub mod query;

pub use ingest::IngestArgs;
pub use query::QueryArgs;
