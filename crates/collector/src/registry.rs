//! Built-in component factories

use std::sync::Arc;

use conflux_config::Registries;
use conflux_exporters::{ConfluxExporterFactory, LoggingExporterFactory, NoopExporterFactory};
use conflux_processors::{BatchProcessorFactory, NoopProcessorFactory};
use conflux_receivers::ConfluxReceiverFactory;

/// Registries with every built-in factory registered.
///
/// Receivers: `conflux`. Processors: `batch`, `noop`. Exporters: `logging`,
/// `noop`, `conflux`.
pub fn default_registries() -> Registries {
    let mut registries = Registries::default();

    registries.receivers.register(Arc::new(ConfluxReceiverFactory));

    registries.processors.register(Arc::new(BatchProcessorFactory));
    registries.processors.register(Arc::new(NoopProcessorFactory));

    registries.exporters.register(Arc::new(LoggingExporterFactory));
    registries.exporters.register(Arc::new(NoopExporterFactory));
    registries.exporters.register(Arc::new(ConfluxExporterFactory));

    registries
}
