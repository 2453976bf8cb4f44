//! Reading and writing project documents.
//!
//! The reference encoding is pretty-printed UTF-8 JSON with two-space
//! indentation. Reads accept any schema whose major version matches the
//! baseline and ignore unknown fields.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::document::schema::ProjectDocument;
use crate::error::{LumenError, Result};

/// Maximum allowed document file size (20 MB).
///
/// Keeps a corrupt or hostile file from ballooning memory during load.
pub const MAX_DOCUMENT_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Serializes a document to the reference pretty-printed JSON encoding.
pub fn to_json(document: &ProjectDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parses a document from JSON text.
pub fn from_json(raw: &str) -> Result<ProjectDocument> {
    let document: ProjectDocument = serde_json::from_str(raw)?;
    Ok(document)
}

/// Loads a document from a file, enforcing [`MAX_DOCUMENT_FILE_SIZE`].
pub fn load_from_file(path: &Path) -> Result<ProjectDocument> {
    load_with_limit(path, MAX_DOCUMENT_FILE_SIZE)
}

fn load_with_limit(path: &Path, limit: u64) -> Result<ProjectDocument> {
    let size = std::fs::metadata(path)?.len();
    if size > limit {
        return Err(LumenError::FileTooLarge { size, limit });
    }

    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;
    from_json(&content)
}

/// Saves a document to a file in the reference encoding.
pub fn save_to_file(document: &ProjectDocument, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, document)?;
    Ok(())
}
