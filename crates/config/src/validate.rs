//! Configuration validation
//!
//! Enforces the topology rules and prunes disabled components:
//! - every pipeline reference resolves to a defined component
//! - traces pipelines carry at least one processor, metrics pipelines none
//! - references to disabled components are dropped with an info log, so
//!   operators can disable a component without editing every pipeline
//! - disabled top-level entries are deleted
//! - after pruning, every pipeline still has at least one receiver and one
//!   exporter, and the top-level maps are non-empty
//!
//! Execution order: pipelines → receivers → exporters → processors.

use std::collections::BTreeMap;

use crate::error::{ConfigError, Result};
use crate::model::{
    Config, DataType, ExporterConfig, PipelineConfig, ProcessorConfig, ReceiverConfig,
};

/// Validate the loaded configuration, pruning disabled components in place.
pub fn validate(config: &mut Config) -> Result<()> {
    validate_pipelines(config)?;
    validate_receivers(config)?;
    validate_exporters(config)?;
    validate_processors(config);
    Ok(())
}

fn validate_pipelines(config: &mut Config) -> Result<()> {
    let Config {
        receivers,
        processors,
        exporters,
        pipelines,
    } = config;

    if pipelines.is_empty() {
        return Err(ConfigError::MissingPipelines);
    }

    for pipeline in pipelines.values_mut() {
        validate_pipeline_receivers(receivers, pipeline)?;
        validate_pipeline_exporters(exporters, pipeline)?;
        validate_pipeline_processors(processors, pipeline)?;
    }

    Ok(())
}

fn validate_pipeline_receivers(
    receivers: &BTreeMap<String, Box<dyn ReceiverConfig>>,
    pipeline: &mut PipelineConfig,
) -> Result<()> {
    if pipeline.receivers.is_empty() {
        return Err(ConfigError::PipelineMustHaveReceiver(pipeline.name.clone()));
    }

    for reference in &pipeline.receivers {
        if !receivers.contains_key(reference) {
            return Err(ConfigError::PipelineReceiverNotExists {
                pipeline: pipeline.name.clone(),
                reference: reference.clone(),
            });
        }
    }

    let name = pipeline.name.clone();
    pipeline.receivers.retain(|reference| {
        let enabled = receivers[reference].is_enabled();
        if !enabled {
            tracing::info!(
                pipeline = %name,
                receiver = %reference,
                "pipeline references a disabled receiver, ignoring it"
            );
        }
        enabled
    });

    if pipeline.receivers.is_empty() {
        return Err(ConfigError::PipelineMustHaveReceiver(pipeline.name.clone()));
    }

    Ok(())
}

fn validate_pipeline_exporters(
    exporters: &BTreeMap<String, Box<dyn ExporterConfig>>,
    pipeline: &mut PipelineConfig,
) -> Result<()> {
    if pipeline.exporters.is_empty() {
        return Err(ConfigError::PipelineMustHaveExporter(pipeline.name.clone()));
    }

    for reference in &pipeline.exporters {
        if !exporters.contains_key(reference) {
            return Err(ConfigError::PipelineExporterNotExists {
                pipeline: pipeline.name.clone(),
                reference: reference.clone(),
            });
        }
    }

    let name = pipeline.name.clone();
    pipeline.exporters.retain(|reference| {
        let enabled = exporters[reference].is_enabled();
        if !enabled {
            tracing::info!(
                pipeline = %name,
                exporter = %reference,
                "pipeline references a disabled exporter, ignoring it"
            );
        }
        enabled
    });

    if pipeline.exporters.is_empty() {
        return Err(ConfigError::PipelineMustHaveExporter(pipeline.name.clone()));
    }

    Ok(())
}

fn validate_pipeline_processors(
    processors: &BTreeMap<String, Box<dyn ProcessorConfig>>,
    pipeline: &mut PipelineConfig,
) -> Result<()> {
    // Data-type asymmetry: trace batching requires processors; metrics flow
    // from receivers straight to exporters.
    match pipeline.input_type {
        DataType::Traces => {
            if pipeline.processors.is_empty() {
                return Err(ConfigError::PipelineMustHaveProcessors(
                    pipeline.name.clone(),
                ));
            }
        }
        DataType::Metrics => {
            if !pipeline.processors.is_empty() {
                return Err(ConfigError::MetricPipelineCannotHaveProcessors(
                    pipeline.name.clone(),
                ));
            }
        }
    }

    for reference in &pipeline.processors {
        if !processors.contains_key(reference) {
            return Err(ConfigError::PipelineProcessorNotExists {
                pipeline: pipeline.name.clone(),
                reference: reference.clone(),
            });
        }
    }

    let name = pipeline.name.clone();
    pipeline.processors.retain(|reference| {
        let enabled = processors[reference].is_enabled();
        if !enabled {
            tracing::info!(
                pipeline = %name,
                processor = %reference,
                "pipeline references a disabled processor, ignoring it"
            );
        }
        enabled
    });

    if pipeline.input_type == DataType::Traces && pipeline.processors.is_empty() {
        return Err(ConfigError::PipelineMustHaveProcessors(
            pipeline.name.clone(),
        ));
    }

    Ok(())
}

fn validate_receivers(config: &mut Config) -> Result<()> {
    config.receivers.retain(|_, receiver| receiver.is_enabled());

    // At least one enabled receiver must remain for the config to be usable.
    if config.receivers.is_empty() {
        return Err(ConfigError::MissingReceivers);
    }
    Ok(())
}

fn validate_exporters(config: &mut Config) -> Result<()> {
    config.exporters.retain(|_, exporter| exporter.is_enabled());

    if config.exporters.is_empty() {
        return Err(ConfigError::MissingExporters);
    }
    Ok(())
}

fn validate_processors(config: &mut Config) {
    config
        .processors
        .retain(|_, processor| processor.is_enabled());
}
