//! Resolución del contenido externo del archivo hacia el descriptor.
//!
//! Dos pasadas: la primera parsea todas las entradas declaradas y acumula su
//! tamaño total; superar el tope aborta antes de aplicar merge alguno. La
//! segunda produce un descriptor NUEVO con cada mapa fusionado
//! insert-if-absent en el `config` de los recursos y dependencias que la
//! entrada declara; los parámetros explícitos del descriptor siempre ganan y
//! la primera escritura gana entre entradas, en orden de procesamiento.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Read;
use uuid::Uuid;

use lift_core::{ProcessContext, StepError};
use lift_domain::descriptor::CONFIG_PARAMETER;
use lift_domain::DeploymentDescriptor;
use lift_persistence::FileService;

use crate::archive::{self, MtaArchiveHelper};
use crate::variables;

#[derive(Debug)]
pub struct ResolvedArchiveContent {
    /// Mapa lateral entrada → contenido parseado, para steps posteriores.
    pub files: BTreeMap<String, Map<String, Value>>,
    pub descriptor: DeploymentDescriptor,
}

/// Acumulador del tamaño total resuelto, con tope duro.
pub struct ContentLengthTracker {
    max_total: u64,
    total: u64,
}

impl ContentLengthTracker {
    pub fn new(max_total: u64) -> Self {
        Self { max_total, total: 0 }
    }

    pub fn add(&mut self, entry_name: &str, len: u64) -> Result<(), StepError> {
        self.total += len;
        if self.total > self.max_total {
            return Err(StepError::Content(format!(
                "resolved content exceeds the maximum of {} bytes at entry {entry_name}",
                self.max_total)));
        }
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Lee y parsea una entrada de contenido del archivo.
pub struct ExternalFileProcessor<'a, F> {
    files: &'a F,
    max_file_size: u64,
}

impl<'a, F: FileService> ExternalFileProcessor<'a, F> {
    pub fn new(files: &'a F, max_file_size: u64) -> Self {
        Self { files, max_file_size }
    }

    /// Devuelve el objeto JSON parseado y su tamaño en bytes.
    pub fn parse_entry(&self,
                       space: &str,
                       archive_id: Uuid,
                       entry_name: &str)
                       -> Result<(Map<String, Value>, u64), StepError> {
        archive::with_archive_entry(self.files, space, archive_id, entry_name, |reader| {
            let mut raw = Vec::new();
            reader.take(self.max_file_size + 1)
                  .read_to_end(&mut raw)
                  .map_err(|e| StepError::Transient(format!("reading {entry_name}: {e}")))?;
            if raw.len() as u64 > self.max_file_size {
                return Err(StepError::Content(format!(
                    "entry {entry_name} exceeds the maximum file size of {} bytes",
                    self.max_file_size)));
            }
            let parsed: Value = serde_json::from_slice(&raw)
                .map_err(|e| StepError::Content(format!("entry {entry_name}: {e}")))?;
            match parsed {
                Value::Object(map) => Ok((map, raw.len() as u64)),
                _ => Err(StepError::Content(format!(
                    "entry {entry_name} must contain a JSON object"))),
            }
        })
    }
}

pub struct ArchiveContentResolver {
    max_file_size: u64,
    max_total_size: u64,
}

impl ArchiveContentResolver {
    pub fn new(max_file_size: u64, max_total_size: u64) -> Self {
        Self { max_file_size, max_total_size }
    }

    pub fn resolve<F: FileService>(&self,
                                   files: &F,
                                   space: &str,
                                   archive_id: Uuid,
                                   helper: &MtaArchiveHelper,
                                   descriptor: &DeploymentDescriptor)
                                   -> Result<ResolvedArchiveContent, StepError> {
        // pasada 1: parsear todo y validar el tamaño total antes de tocar
        // el descriptor
        let processor = ExternalFileProcessor::new(files, self.max_file_size);
        let mut tracker = ContentLengthTracker::new(self.max_total_size);
        let mut parsed: Vec<(String, Map<String, Value>)> = Vec::new();
        for entry_name in helper.content_entry_names() {
            let (content, len) = processor.parse_entry(space, archive_id, entry_name)?;
            tracker.add(entry_name, len)?;
            parsed.push((entry_name.to_owned(), content));
        }
        log::debug!("resolved {} external entries, {} bytes total",
                    parsed.len(),
                    tracker.total());

        // pasada 2: merge sobre una copia; el descriptor de entrada no se
        // muta nunca
        let mut resolved = descriptor.clone();
        for (entry_name, content) in &parsed {
            for resource_name in helper.resources_of(entry_name) {
                let target = resolved.resources
                                     .iter_mut()
                                     .find(|r| &r.name == resource_name);
                match target {
                    Some(resource) => merge_into_config(&mut resource.parameters, content),
                    None => log::debug!("entry {entry_name}: resource {resource_name} \
                                         not declared, skipping"),
                }
            }
            for (module_name, dependency_name) in helper.requires_of(entry_name) {
                let target = resolved.modules
                                     .iter_mut()
                                     .find(|m| &m.name == module_name)
                                     .and_then(|m| {
                                         m.required_dependencies
                                          .iter_mut()
                                          .find(|d| &d.name == dependency_name)
                                     });
                match target {
                    Some(dependency) => merge_into_config(&mut dependency.parameters, content),
                    None => log::debug!("entry {entry_name}: dependency \
                                         {module_name}/{dependency_name} not declared, \
                                         skipping"),
                }
            }
        }

        let files_map = parsed.into_iter().collect();
        Ok(ResolvedArchiveContent { files: files_map, descriptor: resolved })
    }

    /// Resuelve y deja el resultado en el contexto: descriptor transformado
    /// y mapa lateral para steps posteriores.
    pub fn resolve_into_context<F: FileService>(
        &self,
        files: &F,
        ctx: &mut ProcessContext,
        helper: &MtaArchiveHelper)
        -> Result<(), StepError> {
        let space = require(ctx, &variables::SPACE_ID)?;
        let archive_id = require(ctx, &variables::APP_ARCHIVE_ID)?;
        let descriptor = require(ctx, &variables::DEPLOYMENT_DESCRIPTOR)?;
        let resolved = self.resolve(files, &space, archive_id, helper, &descriptor)?;
        ctx.set(&variables::DEPLOYMENT_DESCRIPTOR, &resolved.descriptor);
        ctx.set(&variables::RESOLVED_EXTERNAL_FILES, &resolved.files);
        Ok(())
    }
}

fn require<T: serde::de::DeserializeOwned>(ctx: &ProcessContext,
                                           variable: &lift_core::Variable<T>)
                                           -> Result<T, StepError> {
    ctx.require(variable)
       .map_err(|e| StepError::Operation(e.to_string()))
}

/// Inserta en `parameters.config` las claves ausentes; lo explícito gana.
fn merge_into_config(parameters: &mut Map<String, Value>, content: &Map<String, Value>) {
    let config = parameters.entry(CONFIG_PARAMETER.to_owned())
                           .or_insert_with(|| Value::Object(Map::new()));
    let Some(config) = config.as_object_mut() else {
        // un config escalar explícito no se pisa
        return;
    };
    for (key, value) in content {
        config.entry(key.clone()).or_insert_with(|| value.clone());
    }
}
