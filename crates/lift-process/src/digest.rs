//! Digest de contenido de una entrada del archivo.
//!
//! SHA-256 en streaming, chunks de 8 KiB, acotado por el tamaño máximo de
//! archivo de recurso. Determinista y sensible a cada byte.

use sha2::{Digest, Sha256};
use std::io::Read;
use uuid::Uuid;

use lift_core::StepError;
use lift_persistence::FileService;

use crate::archive;

const CHUNK_SIZE: usize = 8 * 1024;

pub struct ArchiveDigestCalculator {
    max_entry_size: u64,
}

impl ArchiveDigestCalculator {
    pub fn new(max_entry_size: u64) -> Self {
        Self { max_entry_size }
    }

    /// Digest hex de la entrada `entry_name` del archivo almacenado.
    pub fn digest_entry<F: FileService>(&self,
                                        files: &F,
                                        space: &str,
                                        archive_id: Uuid,
                                        entry_name: &str)
                                        -> Result<String, StepError> {
        archive::with_archive_entry(files, space, archive_id, entry_name, |reader| {
            self.digest_stream(reader, entry_name)
        })
    }

    fn digest_stream(&self,
                     reader: &mut dyn Read,
                     entry_name: &str)
                     -> Result<String, StepError> {
        let mut hasher = Sha256::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            let read = reader.read(&mut chunk)
                             .map_err(|e| StepError::Transient(format!(
                                 "reading entry {entry_name}: {e}")))?;
            if read == 0 {
                break;
            }
            total += read as u64;
            if total > self.max_entry_size {
                return Err(StepError::Content(format!(
                    "entry {entry_name} exceeds the maximum size of {} bytes",
                    self.max_entry_size)));
            }
            hasher.update(&chunk[..read]);
        }
        Ok(hex(&hasher.finalize()))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
