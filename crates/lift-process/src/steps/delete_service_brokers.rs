//! Baja de brokers de servicios de aplicaciones que dejan de existir.

use std::sync::Arc;

use lift_core::{ProcessContext, ProcessLogger, Step, StepError, StepMetadata, StepPhase};

use crate::client::ControllerClient;
use crate::steps::DELETE_SERVICE_BROKERS_STEP_ID;
use crate::variables;

pub struct DeleteServiceBrokersStep<C> {
    client: Arc<C>,
    metadata: StepMetadata,
}

impl<C: ControllerClient> DeleteServiceBrokersStep<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client,
               metadata: StepMetadata::new(DELETE_SERVICE_BROKERS_STEP_ID,
                                           "Delete service brokers",
                                           "Elimina los brokers de aplicaciones \
                                            eliminadas que no vuelven a crearse") }
    }
}

impl<C: ControllerClient> Step for DeleteServiceBrokersStep<C> {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn execute(&self, ctx: &mut ProcessContext, logger: &ProcessLogger)
               -> Result<StepPhase, StepError> {
        let apps = ctx.get(&variables::APPS_TO_UNDEPLOY).unwrap_or_default();
        let kept = ctx.get(&variables::SERVICE_BROKERS_TO_CREATE).unwrap_or_default();

        for app in &apps {
            // el broker lleva el nombre de la aplicación que lo registró
            if kept.contains(&app.name) {
                continue;
            }
            let broker = match self.client.get_service_broker(&app.name) {
                Ok(Some(broker)) => broker,
                Ok(None) => {
                    logger.debug(&format!("service broker {} already gone", app.name));
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            match self.client.delete_service_broker(&broker.name) {
                Ok(()) => logger.info(&format!("deleted service broker {}", broker.name)),
                // sin privilegios suficientes: se deja el broker en su sitio
                Err(err) if err.status == Some(403) => {
                    logger.warn(&format!("insufficient privileges to delete service \
                                          broker {}, skipping", broker.name));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(StepPhase::Done)
    }
}
