//! Entrada lógica de archivo y su codificación como metadata de blob.
//!
//! El object store sólo conoce pares clave/valor de texto; `FileEntry` se
//! reconstruye desde esa metadata al listar o borrar en bloque.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::FileStorageError;

const META_SPACE: &str = "space";
const META_NAMESPACE: &str = "namespace";
const META_NAME: &str = "name";
const META_MODIFIED: &str = "modified";
const META_SIZE: &str = "size";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: Uuid,
    pub space: String,
    pub namespace: Option<String>,
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl FileEntry {
    /// Clave del blob bajo el que se guarda el contenido de esta entrada.
    pub fn blob_key(&self) -> String {
        self.id.to_string()
    }

    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert(META_SPACE.into(), self.space.clone());
        if let Some(ns) = &self.namespace {
            meta.insert(META_NAMESPACE.into(), ns.clone());
        }
        meta.insert(META_NAME.into(), self.name.clone());
        meta.insert(META_MODIFIED.into(), self.modified.to_rfc3339());
        meta.insert(META_SIZE.into(), self.size.to_string());
        meta
    }

    /// Reconstruye la entrada desde la metadata de un blob. Falla con
    /// `Metadata` si faltan campos obligatorios o no parsean; el llamador
    /// decide si eso convierte al blob en huérfano.
    pub fn from_metadata(key: &str,
                         meta: &BTreeMap<String, String>)
                         -> Result<Self, FileStorageError> {
        let id = Uuid::parse_str(key)
            .map_err(|e| FileStorageError::Metadata(format!("key {key}: {e}")))?;
        let space = meta.get(META_SPACE)
                        .ok_or_else(|| missing(key, META_SPACE))?
                        .clone();
        let name = meta.get(META_NAME)
                       .ok_or_else(|| missing(key, META_NAME))?
                       .clone();
        let modified = meta.get(META_MODIFIED)
                           .ok_or_else(|| missing(key, META_MODIFIED))?;
        let modified = DateTime::parse_from_rfc3339(modified)
            .map_err(|e| FileStorageError::Metadata(format!("key {key}: {e}")))?
            .with_timezone(&Utc);
        let size = meta.get(META_SIZE)
                       .and_then(|v| v.parse().ok())
                       .ok_or_else(|| missing(key, META_SIZE))?;
        Ok(FileEntry { id,
                       space,
                       namespace: meta.get(META_NAMESPACE).cloned(),
                       name,
                       modified,
                       size })
    }
}

fn missing(key: &str, field: &str) -> FileStorageError {
    FileStorageError::Metadata(format!("key {key}: missing {field}"))
}
