//! Tests de integración del storage sobre el store en memoria.

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::time::Duration;
use uuid::Uuid;

use std::sync::Mutex;

use lift_persistence::{BlobStore, FileEntry, FileService, FileStorageError, InMemoryBlobStore,
                       ObjectStoreFileStorage, RetryPolicy};

fn storage() -> ObjectStoreFileStorage<InMemoryBlobStore> {
    // sin espera real entre reintentos
    let retry = RetryPolicy { max_attempts: 3,
                              base_wait: Duration::ZERO };
    ObjectStoreFileStorage::new(InMemoryBlobStore::new(), retry)
}

fn add(storage: &ObjectStoreFileStorage<InMemoryBlobStore>,
       space: &str,
       namespace: Option<&str>,
       name: &str,
       payload: &[u8])
       -> FileEntry {
    storage.add_file(space, namespace, name, &mut Cursor::new(payload.to_vec()))
           .unwrap()
}

#[test]
fn add_then_read_back() {
    let storage = storage();
    let entry = add(&storage, "space-1", Some("mta/shop"), "shop.tar", b"payload");
    assert_eq!(entry.size, 7);

    let content = storage.process_content("space-1", entry.id, |reader| {
                             let mut buf = Vec::new();
                             reader.read_to_end(&mut buf)?;
                             Ok(buf)
                         })
                         .unwrap();
    assert_eq!(content, b"payload");
}

#[test]
fn reads_survive_transient_failures() {
    let storage = storage();
    let entry = add(&storage, "space-1", None, "a.tar", b"x");

    // dos fallos transitorios, el tercer intento lee
    storage.store().fail_next_reads(2);
    let found = storage.entry("space-1", entry.id).unwrap();
    assert_eq!(found.unwrap().id, entry.id);
}

#[test]
fn read_exhaustion_of_missing_blob_is_not_found() {
    let storage = storage();
    let err = storage.process_content("space-1", Uuid::new_v4(), |_| Ok(()))
                     .unwrap_err();
    assert!(matches!(err, FileStorageError::NotFound));
}

/// Store cuya metadata tarda `lag` lecturas en hacerse visible, como un
/// object store eventualmente consistente tras una escritura.
struct LaggingMetadataStore {
    inner:          InMemoryBlobStore,
    lag:            Mutex<u32>,
    metadata_calls: Mutex<u32>,
}

impl LaggingMetadataStore {
    fn new(lag: u32) -> Self {
        Self { inner:          InMemoryBlobStore::new(),
               lag:            Mutex::new(lag),
               metadata_calls: Mutex::new(0) }
    }

    fn metadata_calls(&self) -> u32 {
        *self.metadata_calls.lock().unwrap()
    }
}

impl BlobStore for LaggingMetadataStore {
    fn put(&self,
           key: &str,
           payload: &[u8],
           metadata: &BTreeMap<String, String>)
           -> Result<(), FileStorageError> {
        self.inner.put(key, payload, metadata)
    }

    fn open(&self, key: &str) -> Result<Option<Box<dyn Read + Send>>, FileStorageError> {
        self.inner.open(key)
    }

    fn metadata(&self,
                key: &str)
                -> Result<Option<BTreeMap<String, String>>, FileStorageError> {
        *self.metadata_calls.lock().unwrap() += 1;
        let mut lag = self.lag.lock().unwrap();
        if *lag > 0 {
            *lag -= 1;
            return Ok(None);
        }
        self.inner.metadata(key)
    }

    fn delete(&self, key: &str) -> Result<bool, FileStorageError> {
        self.inner.delete(key)
    }

    fn keys(&self) -> Result<Vec<String>, FileStorageError> {
        self.inner.keys()
    }
}

#[test]
fn metadata_lag_is_retried_before_reporting_not_found() {
    let retry = RetryPolicy { max_attempts: 3,
                              base_wait: Duration::ZERO };
    let storage = ObjectStoreFileStorage::new(LaggingMetadataStore::new(2), retry);
    let entry = storage.add_file("space-1", None, "a.tar", &mut Cursor::new(b"payload".to_vec()))
                       .unwrap();

    // dos lecturas ven Ok(None); la tercera encuentra la metadata
    let content = storage.process_content("space-1", entry.id, |reader| {
                             let mut buf = Vec::new();
                             reader.read_to_end(&mut buf)?;
                             Ok(buf)
                         })
                         .unwrap();
    assert_eq!(content, b"payload");
    assert_eq!(storage.store().metadata_calls(), 3);
}

#[test]
fn write_exhaustion_propagates_the_error() {
    let storage = storage();
    storage.store().fail_next_writes(3);
    let err = storage.add_file("space-1", None, "a.tar", &mut Cursor::new(b"x".to_vec()))
                     .unwrap_err();
    assert!(matches!(err, FileStorageError::Storage(_)));
    assert_eq!(storage.store().blob_count(), 0);
}

#[test]
fn file_is_invisible_outside_its_space() {
    let storage = storage();
    let entry = add(&storage, "space-1", None, "a.tar", b"x");

    assert!(storage.entry("space-2", entry.id).unwrap().is_none());
    assert!(!storage.delete_file("space-2", entry.id).unwrap());
    assert!(storage.delete_file("space-1", entry.id).unwrap());
}

#[test]
fn space_sweep_deletes_every_file_of_the_listed_spaces() {
    let storage = storage();
    add(&storage, "space-1", None, "a.tar", b"x");
    add(&storage, "space-1", Some("mta/shop"), "b.tar", b"y");
    add(&storage, "space-2", None, "c.tar", b"z");
    let kept = add(&storage, "space-3", None, "d.tar", b"w");

    let deleted = storage.delete_files_by_space_ids(&["space-1", "space-2"]).unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(storage.store().blob_count(), 1);
    assert!(storage.entry("space-3", kept.id).unwrap().is_some());
}

#[test]
fn delete_by_namespace_leaves_other_namespaces() {
    let storage = storage();
    add(&storage, "space-1", Some("mta/shop"), "a.tar", b"x");
    add(&storage, "space-1", Some("mta/crm"), "b.tar", b"y");
    add(&storage, "space-1", None, "c.tar", b"z");

    let deleted = storage.delete_files_by_space_and_namespace("space-1", "mta/shop")
                         .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(storage.store().blob_count(), 2);
}

#[test]
fn age_sweep_deletes_old_files_and_reaps_corrupt_metadata() {
    let storage = storage();
    let fresh = add(&storage, "space-1", None, "fresh.tar", b"x");

    // blob antiguo sembrado directamente
    let old = FileEntry { id: Uuid::new_v4(),
                          space: "space-1".into(),
                          namespace: None,
                          name: "old.tar".into(),
                          modified: Utc::now() - ChronoDuration::days(30),
                          size: 1 };
    storage.store().seed(&old.blob_key(), b"y".to_vec(), old.to_metadata());

    // blob huérfano con metadata irrecuperable
    storage.store()
           .seed(&Uuid::new_v4().to_string(), b"z".to_vec(), BTreeMap::new());

    let cutoff = Utc::now() - ChronoDuration::days(7);
    let deleted = storage.delete_files_modified_before(cutoff).unwrap();
    assert_eq!(deleted, 2);
    assert!(storage.entry("space-1", fresh.id).unwrap().is_some());
}
