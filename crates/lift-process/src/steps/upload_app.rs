//! Subida del binario del módulo, con reutilización de paquetes.

use std::sync::Arc;

use lift_core::{AsyncExecution, ExecutionStatus, Poller, ProcessContext, ProcessLogger, Step,
                StepError, StepMetadata, StepPhase};
use lift_domain::PackageStatus;
use lift_persistence::FileService;

use crate::archive::MtaArchiveHelper;
use crate::client::ControllerClient;
use crate::config::ApplicationConfiguration;
use crate::digest::ArchiveDigestCalculator;
use crate::packages::{self, PackageReuseResolver, UploadDecision};
use crate::steps::{require, UPLOAD_APP_STEP_ID};
use crate::variables;

pub struct UploadAppStep<C, F> {
    client: Arc<C>,
    files: Arc<F>,
    config: ApplicationConfiguration,
    metadata: StepMetadata,
}

impl<C: ControllerClient, F: FileService> UploadAppStep<C, F> {
    pub fn new(client: Arc<C>, files: Arc<F>, config: ApplicationConfiguration) -> Self {
        Self { client,
               files,
               config,
               metadata: StepMetadata::new(UPLOAD_APP_STEP_ID,
                                           "Upload application",
                                           "Sube el binario del módulo o reutiliza un \
                                            paquete remoto existente") }
    }

    /// Persiste el digest calculado en el env de la aplicación una vez que
    /// el paquete quedó disponible.
    fn store_new_digest(&self,
                        ctx: &mut ProcessContext,
                        logger: &ProcessLogger)
                        -> Result<(), StepError> {
        let content_changed = ctx.get(&variables::APP_CONTENT_CHANGED).unwrap_or(false);
        let Some(digest) = ctx.get(&variables::NEW_CONTENT_DIGEST) else {
            return Ok(());
        };
        if content_changed {
            let app_to_deploy = require(ctx, &variables::APP_TO_DEPLOY)?;
            let app = self.client
                          .get_application(&app_to_deploy.name)
                          .map_err(StepError::from)?
                          .ok_or_else(|| StepError::Content(format!(
                              "application {} disappeared during upload", app_to_deploy.name)))?;
            let env = packages::env_with_content_digest(&app.env, &digest)?;
            self.client.update_application_env(app.guid, env).map_err(StepError::from)?;
            logger.debug(&format!("stored content digest for {}", app.name));
        }
        ctx.remove(&variables::NEW_CONTENT_DIGEST);
        Ok(())
    }
}

impl<C: ControllerClient, F: FileService> Step for UploadAppStep<C, F> {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn execute(&self, ctx: &mut ProcessContext, logger: &ProcessLogger)
               -> Result<StepPhase, StepError> {
        let space = require(ctx, &variables::SPACE_ID)?;
        let archive_id = require(ctx, &variables::APP_ARCHIVE_ID)?;
        let app_to_deploy = require(ctx, &variables::APP_TO_DEPLOY)?;
        let manifest = require(ctx, &variables::ARCHIVE_MANIFEST)?;

        let helper = MtaArchiveHelper::from_manifest(&manifest)?;
        let module_file = helper.module_file_name(&app_to_deploy.module_name)
                                .ok_or_else(|| StepError::Content(format!(
                                    "no archive entry declared for module {}",
                                    app_to_deploy.module_name)))?;
        let app = self.client
                      .get_application(&app_to_deploy.name)
                      .map_err(StepError::from)?
                      .ok_or_else(|| StepError::Content(format!(
                          "application {} does not exist", app_to_deploy.name)))?;
        let needs_restage = ctx.get(&variables::APP_NEEDS_RESTAGE).unwrap_or(false);

        let calculator = ArchiveDigestCalculator::new(self.config.max_resource_file_size);
        let resolver = PackageReuseResolver::new(&*self.client, &*self.files, calculator);
        let outcome =
            resolver.decide_upload_action(&space, archive_id, module_file, &app, needs_restage)?;

        match outcome.decision {
            UploadDecision::UploadStarted(package) => {
                logger.info(&format!("uploading content of {}", app.name));
                ctx.set(&variables::CLOUD_PACKAGE, &package);
                ctx.set(&variables::APP_CONTENT_CHANGED, &true);
                ctx.set(&variables::NEW_CONTENT_DIGEST, &outcome.new_digest);
                Ok(StepPhase::Poll)
            }
            UploadDecision::BindLatest(package) => {
                logger.info(&format!("reusing package {} for {}", package.guid, app.name));
                ctx.set(&variables::CLOUD_PACKAGE, &package);
                ctx.set(&variables::APP_CONTENT_CHANGED, &false);
                Ok(StepPhase::Poll)
            }
            UploadDecision::ContentUnchanged => {
                logger.info(&format!("content of application {} is not changed", app.name));
                ctx.set(&variables::APP_CONTENT_CHANGED, &false);
                Ok(StepPhase::Done)
            }
        }
    }

    fn poll(&self, ctx: &mut ProcessContext, logger: &ProcessLogger)
            -> Result<StepPhase, StepError> {
        let executions: Vec<Box<dyn AsyncExecution + '_>> =
            vec![Box::new(PollUploadStatusExecution { client: &*self.client })];
        match Poller::poll_all(&executions, ctx, logger)? {
            ExecutionStatus::Running => Ok(StepPhase::Poll),
            ExecutionStatus::Finished => {
                self.store_new_digest(ctx, logger)?;
                Ok(StepPhase::Done)
            }
            ExecutionStatus::Failed => {
                let package = ctx.get(&variables::CLOUD_PACKAGE);
                let guid = package.map(|p| p.guid.to_string()).unwrap_or_default();
                Err(StepError::Operation(format!("package {guid} reached a failed state")))
            }
        }
    }
}

/// Sondea el estado del paquete cuyo guid quedó persistido en el contexto.
struct PollUploadStatusExecution<'a, C> {
    client: &'a C,
}

impl<C: ControllerClient> AsyncExecution for PollUploadStatusExecution<'_, C> {
    fn poll(&self, ctx: &mut ProcessContext, logger: &ProcessLogger)
            -> Result<ExecutionStatus, StepError> {
        let package = require(ctx, &variables::CLOUD_PACKAGE)?;
        let refreshed = self.client.get_package(package.guid).map_err(StepError::from)?;
        ctx.set(&variables::CLOUD_PACKAGE, &refreshed);
        match refreshed.status {
            PackageStatus::Ready => Ok(ExecutionStatus::Finished),
            PackageStatus::Failed | PackageStatus::Expired => {
                logger.error(&format!("package {} ended in {:?}",
                                      refreshed.guid, refreshed.status));
                Ok(ExecutionStatus::Failed)
            }
            PackageStatus::AwaitingUpload
            | PackageStatus::Processing
            | PackageStatus::Copying => Ok(ExecutionStatus::Running),
        }
    }
}
