use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use polars::prelude::DataFrame;

use super::{Warehouse, WarehouseError};

/// Process-local warehouse used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    tables: Mutex<HashMap<String, DataFrame>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables().keys().cloned().collect();
        names.sort();
        names
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, DataFrame>> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn write(&self, table: &DataFrame, destination: &str) -> Result<u64, WarehouseError> {
        let mut tables = self.tables();
        match tables.get_mut(destination) {
            Some(existing) => {
                existing
                    .vstack_mut(table)
                    .map_err(|source| WarehouseError::SchemaMismatch {
                        destination: destination.to_string(),
                        source,
                    })?;
            }
            None => {
                tables.insert(destination.to_string(), table.clone());
            }
        }
        Ok(table.height() as u64)
    }

    async fn read(&self, destination: &str) -> Result<DataFrame, WarehouseError> {
        self.tables()
            .get(destination)
            .cloned()
            .ok_or_else(|| WarehouseError::NotFound(destination.to_string()))
    }

    async fn query(&self, _sql: &str) -> Result<DataFrame, WarehouseError> {
        Err(WarehouseError::Unsupported(
            "ad-hoc SQL requires a database-backed warehouse",
        ))
    }
}
