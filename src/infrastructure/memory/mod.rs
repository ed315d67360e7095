mod sqlite;

pub use sqlite::SqliteMemoryStore;
