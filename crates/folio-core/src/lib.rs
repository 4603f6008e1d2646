pub mod document;
pub mod query;
mod sql;
pub mod sqlite;
pub mod store;

pub use document::*;
pub use query::*;
pub use store::*;

pub use sqlite::SqliteStore;
