// Entity store backends.

mod in_memory;
mod sqlite_store;

pub use in_memory::InMemoryEntityStore;
pub use sqlite_store::SqliteEntityStore;
