
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::RecordSource;
use crate::SyncError;
use crate::records::Record;

/// Record source backed by fixed, in-process tables
#[derive(Debug, Default)]
pub struct StaticRecordSource {
    tables: HashMap<String, Vec<Record>>,
    failing: Mutex<HashMap<String, String>>,
}

impl StaticRecordSource {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_table(mut self, table: impl Into<String>, records: Vec<Record>) -> Self {
        self.tables.insert(table.into(), records);
        self
    }

    /// Make every read of `table` fail with `message`
    #[inline]
    pub fn fail_reads(&self, table: &str, message: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), message.to_string());
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    #[inline]
    async fn fetch_all(&self, table: &str) -> crate::Result<Vec<Record>> {
        let failure = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned();
        if let Some(message) = failure {
            return Err(SyncError::Source {
                table: table.to_string(),
                message,
            });
        }

        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| SyncError::Source {
                table: table.to_string(),
                message: format!("relation \"{}\" does not exist", table),
            })
    }
}
