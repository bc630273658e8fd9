//! Abstracción mínima sobre un object store de blobs con metadata.
//!
//! `InMemoryBlobStore` es la implementación de referencia para tests; admite
//! inyección de fallos para ejercitar los reintentos del storage.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use crate::error::FileStorageError;

pub trait BlobStore {
    fn put(&self,
           key: &str,
           payload: &[u8],
           metadata: &BTreeMap<String, String>)
           -> Result<(), FileStorageError>;

    /// `Ok(None)` cuando el blob no existe; `Err` sólo ante fallo del store.
    fn open(&self, key: &str) -> Result<Option<Box<dyn Read + Send>>, FileStorageError>;

    fn metadata(&self, key: &str)
                -> Result<Option<BTreeMap<String, String>>, FileStorageError>;

    /// Devuelve `true` si el blob existía.
    fn delete(&self, key: &str) -> Result<bool, FileStorageError>;

    fn keys(&self) -> Result<Vec<String>, FileStorageError>;
}

#[derive(Debug)]
struct StoredBlob {
    payload: Vec<u8>,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Faults {
    failing_reads: u32,
    failing_writes: u32,
}

/// Object store en memoria. Los contadores de fallo consumen una unidad por
/// operación y luego el store vuelve a comportarse con normalidad.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
    faults: Mutex<Faults>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hace fallar las próximas `n` lecturas (open/metadata).
    pub fn fail_next_reads(&self, n: u32) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).failing_reads = n;
    }

    /// Hace fallar las próximas `n` escrituras (put/delete).
    pub fn fail_next_writes(&self, n: u32) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).failing_writes = n;
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Inserta un blob sin pasar por los contadores de fallo.
    pub fn seed(&self, key: &str, payload: Vec<u8>, metadata: BTreeMap<String, String>) {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), StoredBlob { payload, metadata });
    }

    fn consume_read_fault(&self) -> Result<(), FileStorageError> {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        if faults.failing_reads > 0 {
            faults.failing_reads -= 1;
            return Err(FileStorageError::Storage("injected read failure".into()));
        }
        Ok(())
    }

    fn consume_write_fault(&self) -> Result<(), FileStorageError> {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        if faults.failing_writes > 0 {
            faults.failing_writes -= 1;
            return Err(FileStorageError::Storage("injected write failure".into()));
        }
        Ok(())
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self,
           key: &str,
           payload: &[u8],
           metadata: &BTreeMap<String, String>)
           -> Result<(), FileStorageError> {
        self.consume_write_fault()?;
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(),
                    StoredBlob { payload: payload.to_vec(),
                                 metadata: metadata.clone() });
        Ok(())
    }

    fn open(&self, key: &str) -> Result<Option<Box<dyn Read + Send>>, FileStorageError> {
        self.consume_read_fault()?;
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key)
                .map(|b| Box::new(Cursor::new(b.payload.clone())) as Box<dyn Read + Send>))
    }

    fn metadata(&self, key: &str)
                -> Result<Option<BTreeMap<String, String>>, FileStorageError> {
        self.consume_read_fault()?;
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key).map(|b| b.metadata.clone()))
    }

    fn delete(&self, key: &str) -> Result<bool, FileStorageError> {
        self.consume_write_fault()?;
        Ok(self.blobs
               .lock()
               .unwrap_or_else(|e| e.into_inner())
               .remove(key)
               .is_some())
    }

    fn keys(&self) -> Result<Vec<String>, FileStorageError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_counters_are_consumed() {
        let store = InMemoryBlobStore::new();
        store.put("k", b"v", &BTreeMap::new()).unwrap();
        store.fail_next_reads(1);
        assert!(store.open("k").is_err());
        assert!(store.open("k").unwrap().is_some());
    }

    #[test]
    fn open_missing_blob_is_none_not_error() {
        let store = InMemoryBlobStore::new();
        assert!(store.open("missing").unwrap().is_none());
    }
}
