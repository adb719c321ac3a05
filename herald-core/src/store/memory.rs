#![forbid(unsafe_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{merge_fields, Document, DocumentPath, DocumentStore};
use crate::{Error, Result};

pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentPath, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        let documents = self.documents.read();
        Ok(documents.get(path).cloned())
    }

    async fn set(&self, path: &DocumentPath, document: Document) -> Result<()> {
        let mut documents = self.documents.write();
        documents.insert(path.clone(), document);
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Document) -> Result<()> {
        let mut documents = self.documents.write();
        let document = documents
            .get_mut(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        merge_fields(document, fields);
        Ok(())
    }
}
