//! In-process store. Rows live as long as the value does.

use dniscan_core::{PersistableRecord, StoredRecord, User};
use tokio::sync::Mutex;
use tracing::info;

use crate::{RecordStore, StoreError};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    rows: Vec<StoredRecord>,
    next_id: i64,
}

/// A [`RecordStore`] held in memory, with ids assigned from 1.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the `users` table.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                users: users.into_iter().collect(),
                ..Tables::default()
            }),
        }
    }

    pub async fn row_count(&self) -> usize {
        self.tables.lock().await.rows.len()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, record: &PersistableRecord) -> Result<StoredRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.next_id += 1;
        let row = StoredRecord {
            id: tables.next_id,
            record: record.clone(),
        };
        tables.rows.push(row.clone());
        info!(id = row.id, "inserted row in memory store");
        Ok(row)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<StoredRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rows
            .iter()
            .filter(|row| row.record.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.rows.len();
        tables.rows.retain(|row| row.id != id);
        if tables.rows.len() == before {
            return Err(StoreError::NotFound(id));
        }
        info!(id, "deleted row from memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dniscan_core::{parse, to_persistable};

    fn row(raw: &str, owner: i64) -> PersistableRecord {
        to_persistable(&parse(raw).unwrap()).with_owner(owner)
    }

    #[tokio::test]
    async fn find_user_by_exact_name() {
        let store = MemoryStore::with_users([User {
            id: 3,
            username: "recepcion".into(),
        }]);
        assert_eq!(store.find_user("recepcion").await.unwrap().map(|u| u.id), Some(3));
        assert!(store.find_user("Recepcion").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store
            .insert(&row("1@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015", 1))
            .await
            .unwrap();
        let b = store
            .insert(&row("2@GOMEZ@ANA@F@28456789@B@10/10/1980@01/06/2019", 1))
            .await
            .unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(b.record.dni_number, "28456789");
        assert_eq!(store.row_count().await, 2);
    }

    #[tokio::test]
    async fn list_filters_by_owner() {
        let store = MemoryStore::new();
        store
            .insert(&row("1@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015", 1))
            .await
            .unwrap();
        store
            .insert(&row("2@GOMEZ@ANA@F@28456789@B@10/10/1980@01/06/2019", 2))
            .await
            .unwrap();
        let mine = store.list_for_user(2).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].record.last_name, "GOMEZ");
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let store = MemoryStore::new();
        let stored = store
            .insert(&row("1@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015", 1))
            .await
            .unwrap();
        store.delete(stored.id).await.unwrap();
        assert_eq!(store.row_count().await, 0);
        assert!(matches!(
            store.delete(stored.id).await,
            Err(StoreError::NotFound(1))
        ));
    }
}
