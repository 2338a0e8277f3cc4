//! Storage layer: the hosted `dni_data` / `users` tables behind one trait.
//!
//! [`MemoryStore`] keeps rows in-process; [`RestStore`] (feature `http`)
//! talks to the hosted tables over their REST interface.

use dniscan_core::{PersistableRecord, StoredRecord, User};

mod error;
mod memory;
pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "http")]
mod rest;
#[cfg(feature = "http")]
pub use rest::RestStore;

/// Insert/select/delete over scanned rows, plus the username lookup used for login.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a user by exact username.
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Insert one row and return it with its assigned id.
    async fn insert(&self, record: &PersistableRecord) -> Result<StoredRecord, StoreError>;

    /// All rows owned by `user_id`, oldest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<StoredRecord>, StoreError>;

    /// Delete one row by id. Missing rows are [`StoreError::NotFound`].
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}
