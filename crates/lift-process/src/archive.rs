//! Manifiesto del archivo MTA y acceso a sus entradas.
//!
//! El archivo es un tar cuyo manifiesto (`META-INF/manifest.json`) declara
//! qué entrada aporta el binario de cada módulo y qué entradas suministran
//! contenido de configuración a recursos (`resources`) o a dependencias
//! requeridas (`requires`, pares `modulo/dependencia`).

use serde::{Deserialize, Serialize};
use std::io::Read;
use uuid::Uuid;

use lift_core::StepError;
use lift_persistence::{FileService, FileStorageError};

pub const MANIFEST_ENTRY: &str = "META-INF/manifest.json";
/// Separador de los pares `modulo/dependencia` en `requires`.
pub const REQUIRES_SEPARATOR: char = '/';

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
}

/// Vista parseada del manifiesto. Los pares `requires` se validan en la
/// construcción; un par sin separador es un error de contenido.
#[derive(Debug)]
pub struct MtaArchiveHelper {
    resource_files: Vec<(String, Vec<String>)>,
    requires_files: Vec<(String, Vec<(String, String)>)>,
    module_files: Vec<(String, String)>,
    content_entries: Vec<String>,
}

impl MtaArchiveHelper {
    pub fn from_manifest(manifest: &ArchiveManifest) -> Result<Self, StepError> {
        let mut resource_files = Vec::new();
        let mut requires_files = Vec::new();
        let mut module_files = Vec::new();
        let mut content_entries: Vec<String> = Vec::new();
        for entry in &manifest.entries {
            if let Some(module) = &entry.module {
                module_files.push((module.clone(), entry.name.clone()));
            }
            if !entry.resources.is_empty() {
                resource_files.push((entry.name.clone(), entry.resources.clone()));
            }
            if !entry.requires.is_empty() {
                let pairs = entry.requires
                                 .iter()
                                 .map(|raw| parse_requires_pair(&entry.name, raw))
                                 .collect::<Result<Vec<_>, _>>()?;
                requires_files.push((entry.name.clone(), pairs));
            }
            let has_content = !entry.resources.is_empty() || !entry.requires.is_empty();
            if has_content && !content_entries.contains(&entry.name) {
                content_entries.push(entry.name.clone());
            }
        }
        Ok(Self { resource_files, requires_files, module_files, content_entries })
    }

    /// Entradas que suministran contenido a recursos, en orden de manifiesto.
    pub fn resource_file_attributes(&self) -> &[(String, Vec<String>)] {
        &self.resource_files
    }

    /// Entradas que suministran contenido a dependencias requeridas.
    pub fn requires_file_attributes(&self) -> &[(String, Vec<(String, String)>)] {
        &self.requires_files
    }

    pub fn module_file_name(&self, module: &str) -> Option<&str> {
        self.module_files
            .iter()
            .find(|(m, _)| m == module)
            .map(|(_, file)| file.as_str())
    }

    /// Nombres de todas las entradas de contenido, en orden de manifiesto y
    /// sin duplicados.
    pub fn content_entry_names(&self) -> impl Iterator<Item = &str> {
        self.content_entries.iter().map(String::as_str)
    }

    pub fn resources_of(&self, entry: &str) -> &[String] {
        self.resource_files
            .iter()
            .find(|(name, _)| name == entry)
            .map(|(_, r)| r.as_slice())
            .unwrap_or(&[])
    }

    pub fn requires_of(&self, entry: &str) -> &[(String, String)] {
        self.requires_files
            .iter()
            .find(|(name, _)| name == entry)
            .map(|(_, r)| r.as_slice())
            .unwrap_or(&[])
    }
}

fn parse_requires_pair(entry: &str, raw: &str) -> Result<(String, String), StepError> {
    match raw.split_once(REQUIRES_SEPARATOR) {
        Some((module, dependency)) if !module.is_empty() && !dependency.is_empty() => {
            Ok((module.to_owned(), dependency.to_owned()))
        }
        _ => Err(StepError::Content(format!(
            "entry {entry}: malformed requires pair {raw:?}, expected \"module{REQUIRES_SEPARATOR}dependency\""))),
    }
}

/// Lee el manifiesto desde el archivo almacenado.
pub fn read_manifest<F: FileService>(files: &F,
                                     space: &str,
                                     archive_id: Uuid)
                                     -> Result<ArchiveManifest, StepError> {
    with_archive_entry(files, space, archive_id, MANIFEST_ENTRY, |reader| {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)
              .map_err(|e| StepError::Content(format!("reading manifest: {e}")))?;
        serde_json::from_slice(&raw)
            .map_err(|e| StepError::Content(format!("malformed manifest: {e}")))
    })
}

/// Abre el archivo tar y entrega al consumidor el reader de una entrada.
pub fn with_archive_entry<F: FileService, T>(
    files: &F,
    space: &str,
    archive_id: Uuid,
    entry_name: &str,
    consumer: impl FnOnce(&mut dyn Read) -> Result<T, StepError>)
    -> Result<T, StepError> {
    files.process_content(space, archive_id, |reader| {
             Ok(process_tar_entry(reader, entry_name, consumer))
         })
         .map_err(storage_error)?
}

fn process_tar_entry<T>(reader: &mut dyn Read,
                        entry_name: &str,
                        consumer: impl FnOnce(&mut dyn Read) -> Result<T, StepError>)
                        -> Result<T, StepError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries()
                         .map_err(|e| StepError::Content(format!("reading archive: {e}")))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| StepError::Content(format!("reading archive: {e}")))?;
        let matches = entry.path()
                           .map(|p| p.to_string_lossy() == entry_name)
                           .unwrap_or(false);
        if matches {
            return consumer(&mut entry);
        }
    }
    Err(StepError::Content(format!("entry {entry_name} not found in archive")))
}

/// Clasifica errores del storage hacia la taxonomía de step.
pub fn storage_error(err: FileStorageError) -> StepError {
    match err {
        FileStorageError::NotFound => StepError::Content("archive content not found".into()),
        FileStorageError::Metadata(m) => StepError::Content(m),
        FileStorageError::Storage(m) => StepError::Transient(m),
        FileStorageError::Io(e) => StepError::Transient(e.to_string()),
    }
}
