//! Factory for the conflux receiver

use std::sync::Arc;

use conflux_component::Receiver;
use conflux_config::{
    Factory, FactoryError, ReceiverConfig, ReceiverConsumers, ReceiverFactory,
};

use super::{ConfluxReceiver, ConfluxReceiverConfig, SOURCE};

/// Factory for the canonical multiplexed receiver.
pub struct ConfluxReceiverFactory;

impl Factory for ConfluxReceiverFactory {
    fn type_tag(&self) -> &'static str {
        SOURCE
    }
}

impl ReceiverFactory for ConfluxReceiverFactory {
    fn create_default_config(&self) -> Box<dyn ReceiverConfig> {
        Box::new(ConfluxReceiverConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ReceiverConfig>, toml::de::Error> {
        let mut config = fragment.clone().try_into::<ConfluxReceiverConfig>()?;
        // An absent endpoint falls back to the canonical default.
        if config.settings.endpoint.is_empty() {
            config.settings.endpoint = ConfluxReceiverConfig::default().settings.endpoint;
        }
        Ok(Box::new(config))
    }

    fn create_receiver(
        &self,
        config: &dyn ReceiverConfig,
        consumers: ReceiverConsumers,
    ) -> Result<Arc<dyn Receiver>, FactoryError> {
        let name = config.name().to_string();
        let config = config
            .as_any()
            .downcast_ref::<ConfluxReceiverConfig>()
            .ok_or_else(|| FactoryError::config_mismatch(SOURCE, &name))?;

        let receiver = ConfluxReceiver::new(config, consumers.traces, consumers.metrics)
            .map_err(|e| FactoryError::create(SOURCE, &name, e))?;
        Ok(Arc::new(receiver))
    }
}
