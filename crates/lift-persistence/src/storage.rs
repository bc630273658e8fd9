//! Storage de archivos sobre un `BlobStore`, con reintentos acotados.
//!
//! Los object stores comerciales exhiben fallos transitorios y consistencia
//! eventual; toda lectura y escritura se reintenta hasta `max_attempts` veces
//! con espera lineal (`attempt * base_wait`). Una lectura que agota sus
//! intentos sin ver el blob se reporta como `NotFound`.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Read;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::entry::FileEntry;
use crate::error::FileStorageError;

/// Servicio de archivos que consumen los steps de despliegue.
pub trait FileService {
    fn add_file(&self,
                space: &str,
                namespace: Option<&str>,
                name: &str,
                content: &mut dyn Read)
                -> Result<FileEntry, FileStorageError>;

    fn entry(&self, space: &str, id: Uuid) -> Result<Option<FileEntry>, FileStorageError>;

    /// Abre el contenido del archivo y se lo entrega al consumidor sin
    /// materializarlo entero en memoria del llamador.
    fn process_content<T>(&self,
                          space: &str,
                          id: Uuid,
                          consumer: impl FnOnce(&mut dyn Read) -> Result<T, FileStorageError>)
                          -> Result<T, FileStorageError>;

    fn delete_file(&self, space: &str, id: Uuid) -> Result<bool, FileStorageError>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3,
               base_wait: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    fn wait_for(&self, attempt: u32) -> Duration {
        self.base_wait * attempt
    }
}

pub struct ObjectStoreFileStorage<B: BlobStore> {
    store: B,
    retry: RetryPolicy,
}

impl<B: BlobStore> ObjectStoreFileStorage<B> {
    pub fn new(store: B, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    /// Barre todos los archivos que pertenecen a los spaces indicados. Es la
    /// purga que acompaña al borrado de un space completo.
    pub fn delete_files_by_space_ids(&self,
                                     space_ids: &[&str])
                                     -> Result<usize, FileStorageError> {
        self.sweep(|entry| space_ids.contains(&entry.space.as_str()), false)
    }

    /// Borra todos los archivos de un space con el namespace dado.
    pub fn delete_files_by_space_and_namespace(&self,
                                               space: &str,
                                               namespace: &str)
                                               -> Result<usize, FileStorageError> {
        self.sweep(|entry| {
                entry.space == space && entry.namespace.as_deref() == Some(namespace)
            },
            false)
    }

    /// Borra todo archivo modificado antes del corte. Un blob cuya metadata
    /// no parsea es un huérfano irrecuperable y se barre también.
    pub fn delete_files_modified_before(&self,
                                        cutoff: DateTime<Utc>)
                                        -> Result<usize, FileStorageError> {
        self.sweep(|entry| entry.modified < cutoff, true)
    }

    fn sweep(&self,
             matches: impl Fn(&FileEntry) -> bool,
             reap_bad_metadata: bool)
             -> Result<usize, FileStorageError> {
        let mut deleted = 0;
        for key in self.store.keys()? {
            let meta = match self.store.metadata(&key) {
                Ok(Some(meta)) => meta,
                Ok(None) => continue, // borrado de forma concurrente
                Err(err) => {
                    log::warn!("skipping blob {key} during sweep: {err}");
                    continue;
                }
            };
            let delete = match FileEntry::from_metadata(&key, &meta) {
                Ok(entry) => matches(&entry),
                Err(err) if reap_bad_metadata => {
                    log::warn!("reaping blob {key} with corrupt metadata: {err}");
                    true
                }
                Err(err) => {
                    log::warn!("skipping blob {key} with corrupt metadata: {err}");
                    false
                }
            };
            if delete && self.delete_with_retries(&key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn matches_space(&self, id: Uuid, space: &str) -> Result<bool, FileStorageError> {
        let key = id.to_string();
        let meta = self.metadata_with_retries(&key)?;
        match meta {
            Some(meta) => match FileEntry::from_metadata(&key, &meta) {
                Ok(entry) => Ok(entry.space == space),
                Err(err) => {
                    log::warn!("blob {key} has corrupt metadata: {err}");
                    Ok(false)
                }
            },
            None => Ok(false),
        }
    }

    /// La metadata de un blob recién escrito puede tardar en hacerse visible;
    /// un `Ok(None)` se reintenta igual que un fallo transitorio y sólo tras
    /// agotar los intentos se da el blob por inexistente.
    fn metadata_with_retries(&self,
                             key: &str)
                             -> Result<Option<BTreeMap<String, String>>, FileStorageError> {
        let mut attempt = 1;
        loop {
            match self.store.metadata(key) {
                Ok(Some(meta)) => return Ok(Some(meta)),
                Ok(None) if attempt < self.retry.max_attempts => {
                    log::warn!("metadata of blob {key} not visible yet on attempt {attempt}; retrying");
                }
                Ok(None) => return Ok(None),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    log::warn!("metadata read of blob {key} failed on attempt {attempt}: {err}; retrying");
                }
                Err(err) => return Err(err),
            }
            thread::sleep(self.retry.wait_for(attempt));
            attempt += 1;
        }
    }

    fn open_with_retries(&self, key: &str) -> Result<Box<dyn Read + Send>, FileStorageError> {
        let mut attempt = 1;
        loop {
            match self.store.open(key) {
                Ok(Some(reader)) => return Ok(reader),
                Ok(None) if attempt < self.retry.max_attempts => {
                    log::warn!("blob {key} not visible yet on attempt {attempt}; retrying");
                }
                Ok(None) => return Err(FileStorageError::NotFound),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    log::warn!("read of blob {key} failed on attempt {attempt}: {err}; retrying");
                }
                Err(err) => return Err(err),
            }
            thread::sleep(self.retry.wait_for(attempt));
            attempt += 1;
        }
    }

    fn delete_with_retries(&self, key: &str) -> Result<bool, FileStorageError> {
        self.with_retry("delete blob", || self.store.delete(key))
    }

    fn with_retry<T>(&self,
                     operation: &str,
                     mut f: impl FnMut() -> Result<T, FileStorageError>)
                     -> Result<T, FileStorageError> {
        let mut attempt = 1;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    log::warn!("{operation} failed on attempt {attempt}: {err}; retrying");
                    thread::sleep(self.retry.wait_for(attempt));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<B: BlobStore> FileService for ObjectStoreFileStorage<B> {
    fn add_file(&self,
                space: &str,
                namespace: Option<&str>,
                name: &str,
                content: &mut dyn Read)
                -> Result<FileEntry, FileStorageError> {
        let mut payload = Vec::new();
        content.read_to_end(&mut payload)?;
        let entry = FileEntry { id: Uuid::new_v4(),
                                space: space.to_owned(),
                                namespace: namespace.map(str::to_owned),
                                name: name.to_owned(),
                                modified: Utc::now(),
                                size: payload.len() as u64 };
        let meta = entry.to_metadata();
        self.with_retry("store blob", || self.store.put(&entry.blob_key(), &payload, &meta))?;
        log::debug!("stored file {} ({} bytes) as blob {}", name, entry.size, entry.blob_key());
        Ok(entry)
    }

    fn entry(&self, space: &str, id: Uuid) -> Result<Option<FileEntry>, FileStorageError> {
        let key = id.to_string();
        let meta = self.metadata_with_retries(&key)?;
        match meta {
            Some(meta) => {
                let entry = FileEntry::from_metadata(&key, &meta)?;
                Ok((entry.space == space).then_some(entry))
            }
            None => Ok(None),
        }
    }

    fn process_content<T>(&self,
                          space: &str,
                          id: Uuid,
                          consumer: impl FnOnce(&mut dyn Read) -> Result<T, FileStorageError>)
                          -> Result<T, FileStorageError> {
        if self.entry(space, id)?.is_none() {
            return Err(FileStorageError::NotFound);
        }
        let mut reader = self.open_with_retries(&id.to_string())?;
        consumer(&mut reader)
    }

    fn delete_file(&self, space: &str, id: Uuid) -> Result<bool, FileStorageError> {
        if !self.matches_space(id, space)? {
            return Ok(false);
        }
        self.delete_with_retries(&id.to_string())
    }
}
