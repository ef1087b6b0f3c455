pub mod cache;
pub mod ingest;
pub mod prompts;
pub mod resolver;
pub mod store;

pub use cache::ClassifierCache;
pub use ingest::{TableIngestor, TableLayout};
pub use resolver::{synthesize_property, EntityResolution, Resolver};
pub use store::{CanonicalStore, WriteTarget};
