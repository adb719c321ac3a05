use clap::Subcommand;
use std::path::PathBuf;

use herald_core::{Document, DocumentPath, Error};

use crate::Stores;

#[derive(Subcommand)]
pub enum DocsAction {
    /// Write a JSON object to a document path, replacing any existing document.
    Put {
        path: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    Get {
        path: String,
    },
}

pub async fn handle_docs_action(
    stores: &Stores,
    action: DocsAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DocsAction::Put { path, file } => {
            let path = DocumentPath::parse(&path)?;
            let content = std::fs::read_to_string(&file)?;
            let document = parse_document(&path, &content)?;
            stores.documents.set(&path, document).await?;
            println!("Wrote {}", path);
        }
        DocsAction::Get { path } => {
            let path = DocumentPath::parse(&path)?;
            match stores.documents.get(&path).await? {
                Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
                None => eprintln!("Document not found: {}", path),
            }
        }
    }
    Ok(())
}

fn parse_document(path: &DocumentPath, content: &str) -> Result<Document, Error> {
    match serde_json::from_str::<serde_json::Value>(content)? {
        serde_json::Value::Object(document) => Ok(document),
        _ => Err(Error::InvalidDocument {
            path: path.to_string(),
            reason: "expected a JSON object".into(),
        }),
    }
}
