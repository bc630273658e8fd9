//! Decisión de subida idempotente y sondeo del paquete.

mod common;

use std::sync::Arc;
use uuid::Uuid;

use chrono::Utc;
use lift_core::{Step, StepError, StepPhase};
use lift_domain::{CloudPackage, PackageStatus};
use lift_persistence::{InMemoryBlobStore, ObjectStoreFileStorage};
use lift_process::variables;
use lift_process::{ApplicationConfiguration, ArchiveDigestCalculator, ControllerClient,
                   MockClient, UploadAppStep};

use common::*;

const MODULE_FILE: &str = "web.bin";
const CONTENT: &[u8] = b"application binary";

struct Fixture {
    client: Arc<MockClient>,
    step: UploadAppStep<MockClient, ObjectStoreFileStorage<InMemoryBlobStore>>,
    archive_id: Uuid,
    files: Arc<ObjectStoreFileStorage<InMemoryBlobStore>>,
}

fn fixture() -> Fixture {
    let files = Arc::new(storage());
    let archive_id = store_archive(&files, &[(MODULE_FILE, CONTENT)]);
    let client = Arc::new(MockClient::new());
    let step = UploadAppStep::new(Arc::clone(&client),
                                  Arc::clone(&files),
                                  ApplicationConfiguration::default());
    Fixture { client, step, archive_id, files }
}

fn content_digest(fixture: &Fixture) -> String {
    ArchiveDigestCalculator::new(1024 * 1024)
        .digest_entry(&*fixture.files, SPACE, fixture.archive_id, MODULE_FILE)
        .unwrap()
}

fn app_with_digest(name: &str, digest: &str) -> lift_domain::CloudApplication {
    let mut app = application(name);
    app.env.insert("DEPLOY_ATTRIBUTES".into(),
                   serde_json::json!(format!("{{\"app-content-digest\":\"{digest}\"}}")));
    app
}

fn ready_package() -> CloudPackage {
    CloudPackage { guid: Uuid::new_v4(),
                   status: PackageStatus::Ready,
                   content_digest: None,
                   created_at: Utc::now() }
}

#[test]
fn changed_content_starts_an_upload() {
    let f = fixture();
    f.client.add_application(application("shop"));
    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);

    let phase = f.step.execute(&mut ctx, &logger).unwrap();

    assert_eq!(phase, StepPhase::Poll);
    assert_eq!(f.client.calls_matching("async_upload_application").len(), 1);
    assert_eq!(ctx.get(&variables::APP_CONTENT_CHANGED), Some(true));
    assert!(ctx.get(&variables::CLOUD_PACKAGE).is_some());
}

#[test]
fn unchanged_content_with_current_package_is_a_noop() {
    let f = fixture();
    let digest = content_digest(&f);
    let app = app_with_digest("shop", &digest);
    let package = ready_package();
    f.client.add_package(package.clone());
    f.client.set_most_recent_package(app.guid, package.guid);
    f.client.set_current_package(app.guid, package.guid);
    f.client.add_application(app);

    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);
    let phase = f.step.execute(&mut ctx, &logger).unwrap();

    assert_eq!(phase, StepPhase::Done);
    assert!(f.client.calls_matching("async_upload_application").is_empty());
    assert_eq!(ctx.get(&variables::APP_CONTENT_CHANGED), Some(false));
}

#[test]
fn non_reusable_latest_package_forces_a_reupload() {
    let f = fixture();
    let digest = content_digest(&f);
    let app = app_with_digest("shop", &digest);
    let mut package = ready_package();
    package.status = PackageStatus::Expired;
    f.client.add_package(package.clone());
    f.client.set_most_recent_package(app.guid, package.guid);
    f.client.add_application(app);

    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);
    let phase = f.step.execute(&mut ctx, &logger).unwrap();

    assert_eq!(phase, StepPhase::Poll);
    assert_eq!(f.client.calls_matching("async_upload_application").len(), 1);
}

#[test]
fn missing_binding_reuses_the_latest_package_without_uploading() {
    let f = fixture();
    let digest = content_digest(&f);
    let app = app_with_digest("shop", &digest);
    let package = ready_package();
    f.client.add_package(package.clone());
    f.client.set_most_recent_package(app.guid, package.guid);
    // sin paquete actual asociado
    f.client.add_application(app);

    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);
    let phase = f.step.execute(&mut ctx, &logger).unwrap();

    assert_eq!(phase, StepPhase::Poll);
    assert!(f.client.calls_matching("async_upload_application").is_empty());
    assert_eq!(ctx.get(&variables::CLOUD_PACKAGE).unwrap().guid, package.guid);
    assert_eq!(ctx.get(&variables::APP_CONTENT_CHANGED), Some(false));
}

#[test]
fn restage_requirement_rebinds_even_when_bound() {
    let f = fixture();
    let digest = content_digest(&f);
    let app = app_with_digest("shop", &digest);
    let package = ready_package();
    f.client.add_package(package.clone());
    f.client.set_most_recent_package(app.guid, package.guid);
    f.client.set_current_package(app.guid, package.guid);
    f.client.add_application(app);

    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);
    ctx.set(&variables::APP_NEEDS_RESTAGE, &true);
    let phase = f.step.execute(&mut ctx, &logger).unwrap();

    assert_eq!(phase, StepPhase::Poll);
    assert!(f.client.calls_matching("async_upload_application").is_empty());
}

#[test]
fn poll_runs_until_ready_and_persists_the_digest() {
    let f = fixture();
    f.client.add_application(application("shop"));
    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);

    assert_eq!(f.step.execute(&mut ctx, &logger).unwrap(), StepPhase::Poll);
    let package = ctx.get(&variables::CLOUD_PACKAGE).unwrap();

    // el paquete sigue procesándose
    assert_eq!(f.step.poll(&mut ctx, &logger).unwrap(), StepPhase::Poll);

    f.client.set_package_status(package.guid, PackageStatus::Ready);
    assert_eq!(f.step.poll(&mut ctx, &logger).unwrap(), StepPhase::Done);

    let app = f.client.get_application("shop").unwrap().unwrap();
    assert_eq!(app.deployed_content_digest(), Some(content_digest(&f)));
    assert!(!ctx.contains(&variables::NEW_CONTENT_DIGEST));
}

#[test]
fn failed_package_fails_the_step() {
    let f = fixture();
    f.client.add_application(application("shop"));
    let manifest = manifest_for_module("web", MODULE_FILE);
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);

    f.step.execute(&mut ctx, &logger).unwrap();
    let package = ctx.get(&variables::CLOUD_PACKAGE).unwrap();
    f.client.set_package_status(package.guid, PackageStatus::Failed);

    let err = f.step.poll(&mut ctx, &logger).unwrap_err();
    assert!(matches!(err, StepError::Operation(_)));
}

#[test]
fn missing_module_entry_is_a_content_error() {
    let f = fixture();
    f.client.add_application(application("shop"));
    let manifest = manifest_for_module("worker", "other.bin");
    let (mut ctx, logger) = upload_context(f.archive_id, "shop", &manifest);

    let err = f.step.execute(&mut ctx, &logger).unwrap_err();
    assert!(matches!(err, StepError::Content(_)));
    assert!(f.client.calls_matching("async_upload_application").is_empty());
}
