//! Soporte compartido de los tests de integración.
#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;
use uuid::Uuid;

use lift_domain::{ApplicationToDeploy, CloudApplication, CloudRoute};
use lift_persistence::{FileService, InMemoryBlobStore, ObjectStoreFileStorage, RetryPolicy};
use lift_process::variables;
use lift_process::{ArchiveManifest, ManifestEntry};

use lift_core::{ProcessContext, ProcessLogger};

pub const SPACE: &str = "space-1";

pub fn storage() -> ObjectStoreFileStorage<InMemoryBlobStore> {
    let retry = RetryPolicy { max_attempts: 3,
                              base_wait: Duration::ZERO };
    ObjectStoreFileStorage::new(InMemoryBlobStore::new(), retry)
}

/// Construye un tar en memoria con las entradas dadas.
pub fn tar_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

pub fn store_archive(storage: &ObjectStoreFileStorage<InMemoryBlobStore>,
                     entries: &[(&str, &[u8])])
                     -> Uuid {
    let archive = tar_archive(entries);
    storage.add_file(SPACE, Some("mta"), "app.tar", &mut Cursor::new(archive))
           .unwrap()
           .id
}

pub fn manifest_for_module(module: &str, file: &str) -> ArchiveManifest {
    ArchiveManifest { entries: vec![ManifestEntry { name: file.into(),
                                                    module: Some(module.into()),
                                                    ..Default::default() }] }
}

pub fn route(host: &str) -> CloudRoute {
    CloudRoute { host: host.into(),
                 domain: "example.com".into(),
                 path: None }
}

pub fn application(name: &str) -> CloudApplication {
    CloudApplication { guid: Uuid::new_v4(),
                       name: name.into(),
                       env: serde_json::Map::new(),
                       staged_package_guid: None,
                       routes: vec![] }
}

pub fn upload_context(archive_id: Uuid,
                      app_name: &str,
                      manifest: &ArchiveManifest)
                      -> (ProcessContext, ProcessLogger) {
    let mut ctx = ProcessContext::new(Uuid::new_v4());
    ctx.set(&variables::SPACE_ID, &SPACE.to_string());
    ctx.set(&variables::APP_ARCHIVE_ID, &archive_id);
    ctx.set(&variables::APP_TO_DEPLOY,
            &ApplicationToDeploy { name: app_name.into(),
                                   module_name: "web".into(),
                                   routes: vec![] });
    ctx.set(&variables::ARCHIVE_MANIFEST, manifest);
    let logger = ProcessLogger::new(ctx.instance_id());
    (ctx, logger)
}
