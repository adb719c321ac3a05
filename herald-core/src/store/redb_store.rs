#![forbid(unsafe_code)]

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use super::{merge_fields, Document, DocumentPath, DocumentStore};
use crate::{Error, Result};

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

#[derive(Clone)]
pub struct RedbDocumentStore {
    db: Arc<Database>,
}

impl RedbDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(|e| Error::Storage(e.to_string()))?;

        {
            let wtxn = db
                .begin_write()
                .map_err(|e| Error::Storage(e.to_string()))?;
            wtxn.open_table(DOCUMENTS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;
            wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    fn read(&self, key: &str) -> Result<Option<Document>> {
        let rtxn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(e.to_string()))?;
        let table = rtxn
            .open_table(DOCUMENTS_TABLE)
            .map_err(|e| Error::Storage(e.to_string()))?;

        match table.get(key).map_err(|e| Error::Storage(e.to_string()))? {
            Some(value) => {
                let document: Document = serde_json::from_slice(value.value())?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, document: &Document) -> Result<()> {
        let value = serde_json::to_vec(document)?;
        let wtxn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        {
            let mut table = wtxn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;
            table
                .insert(key, value.as_slice())
                .map_err(|e| Error::Storage(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RedbDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        self.read(&path.to_string())
    }

    async fn set(&self, path: &DocumentPath, document: Document) -> Result<()> {
        self.write(&path.to_string(), &document)
    }

    async fn update(&self, path: &DocumentPath, fields: Document) -> Result<()> {
        let key = path.to_string();
        let wtxn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        {
            let mut table = wtxn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;

            let existing = table
                .get(key.as_str())
                .map_err(|e| Error::Storage(e.to_string()))?
                .map(|value| value.value().to_vec())
                .ok_or_else(|| Error::NotFound(key.clone()))?;

            let mut document: Document = serde_json::from_slice(&existing)?;
            merge_fields(&mut document, fields);
            let value = serde_json::to_vec(&document)?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(|e| Error::Storage(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }
}
