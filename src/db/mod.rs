pub mod store;

pub use store::{DedupStore, SqliteDedupStore};
