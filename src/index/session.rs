//! Scoped index writer sessions.

use crate::error::{Error, Result};
use tantivy::{Index, IndexWriter, TantivyDocument};
use tracing::{debug, warn};

/// Memory budget for the single indexing thread
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// One writer per ingestion batch.
///
/// Every document is committed on its own, so a failure rolls back only
/// the document being written. Dropping a session with an uncommitted
/// document rolls it back; the index lock is released either way.
pub struct WriterSession {
    writer: Option<IndexWriter>,
    dirty: bool,
}

impl WriterSession {
    /// Take the index writer lock. Fails if another session holds it.
    pub fn open(index: &Index) -> Result<Self> {
        let writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| Error::IndexWrite(format!("cannot open writer: {}", e)))?;
        Ok(Self {
            writer: Some(writer),
            dirty: false,
        })
    }

    fn writer(&mut self) -> Result<&mut IndexWriter> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::IndexWrite("writer session already closed".to_string()))
    }

    /// Add and commit one document
    pub fn write(&mut self, doc: TantivyDocument) -> Result<()> {
        self.dirty = true;
        let writer = self.writer()?;
        let outcome = writer.add_document(doc).and_then(|_| writer.commit());
        match outcome {
            Ok(opstamp) => {
                debug!("Committed document at opstamp {}", opstamp);
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.abort();
                Err(Error::IndexWrite(e.to_string()))
            }
        }
    }

    /// Discard anything written since the last commit
    pub fn abort(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.rollback() {
                warn!("Index rollback failed: {}", e);
            }
        }
        self.dirty = false;
    }

    /// Close the session, letting background merges finish
    pub fn finish(mut self) -> Result<()> {
        if self.dirty {
            self.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.wait_merging_threads()?;
        }
        Ok(())
    }
}

impl Drop for WriterSession {
    fn drop(&mut self) {
        if self.dirty {
            self.abort();
        }
    }
}
