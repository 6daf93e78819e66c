use std::path::PathBuf;

use folio_logging::folio_info;
use sha2::{Digest, Sha256};

use crate::persist::{AtomicFileWriter, PersistError};
use crate::types::LocalDocument;

const HASH_CHARS: usize = 16;

/// Local copies of fetched documents. The viewer is handed a file path
/// rather than the remote URL.
pub struct LocalDocumentStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl LocalDocumentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    pub fn store(&self, document_id: &str, bytes: &[u8]) -> Result<LocalDocument, PersistError> {
        let path = self.writer.write(&cache_filename(document_id), bytes)?;
        folio_info!(
            "Cached document {} ({} bytes) at {:?}",
            document_id,
            bytes.len(),
            path
        );
        Ok(LocalDocument {
            document_id: document_id.to_string(),
            path,
        })
    }

    /// Path of a previously cached copy, if present.
    pub fn cached(&self, document_id: &str) -> Option<LocalDocument> {
        let path = self.dir.join(cache_filename(document_id));
        path.is_file().then(|| LocalDocument {
            document_id: document_id.to_string(),
            path,
        })
    }
}

/// Stable file name for a document id; ids may hold characters that are not
/// valid in file names.
pub fn cache_filename(document_id: &str) -> String {
    let digest = Sha256::digest(document_id.as_bytes());
    let hex: String = digest
        .iter()
        .take(HASH_CHARS / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("{hex}.pdf")
}
