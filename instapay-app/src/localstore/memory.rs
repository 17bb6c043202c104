use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use async_trait::async_trait;

use crate::error::InstapayError;

use super::SnapshotStorage;

/// In-memory snapshot storage. Clones share the same underlying map, so a clone stands in for
/// the same medium opened by a later session.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStorage {
    values: Rc<RefCell<HashMap<String, String>>>,
    /// maximum stored value size in bytes
    quota: Option<usize>,
    rejected: Rc<Cell<u32>>,
}

impl MemorySnapshotStorage {
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    pub fn rejected_writes(&self) -> u32 {
        self.rejected.get()
    }
}

#[async_trait(?Send)]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, InstapayError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InstapayError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                self.rejected.set(self.rejected.get() + 1);
                return Err(InstapayError::StorageUnavailable(format!(
                    "quota of {quota} bytes exceeded"
                )));
            }
        }
        self.values
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), InstapayError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}
