// hashkv/src/lib.rs

//! An embeddable, log-structured key-value store.
//!
//! Keys are `i32`, values are arbitrary non-empty byte strings. Data lives
//! in a directory of append-only segment files (`1.dat`, `2.dat`, ...),
//! each paired with an in-memory hash index that is rebuilt by replaying
//! the file on open. Deletes write tombstone records; space held by
//! obsolete records is reclaimed by compacting and merging segments when
//! the head segment rolls over.
//!
//! ```no_run
//! use hashkv::KVStore;
//!
//! # fn main() -> hashkv::Result<()> {
//! let mut store = KVStore::open("db")?;
//! store.put(1, b"one")?;
//! assert_eq!(store.get(1)?, Some(b"one".to_vec()));
//! store.delete(1)?;
//! assert_eq!(store.get(1)?, None);
//! store.close();
//! # Ok(())
//! # }
//! ```

pub mod store;

pub use store::{KVStore, Result, StoreConfig, StoreError, StoreStats};
