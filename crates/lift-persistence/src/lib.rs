//! Persistencia de binarios de despliegue sobre object storage.
//!
//! El crate separa el protocolo del store (`BlobStore`) de la política de
//! acceso (`ObjectStoreFileStorage`: reintentos, metadata, barridos). Los
//! steps consumen la fachada `FileService`.

pub mod blob;
pub mod entry;
pub mod error;
pub mod storage;

pub use blob::{BlobStore, InMemoryBlobStore};
pub use entry::FileEntry;
pub use error::FileStorageError;
pub use storage::{FileService, ObjectStoreFileStorage, RetryPolicy};
