mod curation;
mod store;

pub use curation::{CurationManager, LoadOutcome, CURATED_KEY};
pub use store::{FileStore, MemoryStore, PersistenceStore, StoreError};
