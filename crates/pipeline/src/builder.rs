//! Pipeline builder - translates validated config into a runnable graph
//!
//! Build order is bottom-up so that by the time a receiver may emit its
//! first item, the full sink graph is ready:
//!
//! 1. exporters - one instance per full name, shared by `Arc` across every
//!    pipeline that lists it;
//! 2. processor chains - one fresh instance per pipeline per listed name
//!    (stateful chains are never shared), built tail-first so each
//!    processor owns its downstream; the chain terminates in a fan-out over
//!    the pipeline's exporters;
//! 3. receivers - one instance per referenced name; per data type, the
//!    heads of all pipelines referencing the receiver are teed through a
//!    fan-out connector.
//!
//! Only receivers referenced by at least one pipeline are instantiated;
//! enabled-but-unreferenced receivers are skipped with a debug log.

use std::collections::BTreeMap;
use std::sync::Arc;

use conflux_component::{Exporter, MetricsConsumer, Processor, Receiver, TraceConsumer};
use conflux_config::{
    Config, DataType, ExporterFactory, ProcessorFactory, ReceiverConsumers, ReceiverFactory,
    Registries,
};

use crate::error::{PipelineError, Result};
use crate::fanout::{MetricsFanOut, TraceFanOut};
use crate::service::{BuiltPipeline, Service};

/// Build a runnable [`Service`] from a validated config.
///
/// # Errors
///
/// Fails when a factory is missing or refuses its config; no partial graph
/// is returned.
pub fn build(config: &Config, registries: &Registries) -> Result<Service> {
    let exporters = build_exporters(config, registries)?;
    let (pipelines, tees) = build_pipelines(config, registries, &exporters)?;
    let receivers = build_receivers(config, registries, tees)?;

    Ok(Service::new(
        exporters.into_iter().collect(),
        pipelines,
        receivers,
    ))
}

/// Per-receiver pipeline heads, grouped by data type.
#[derive(Default)]
struct ReceiverTees {
    traces: Vec<Arc<dyn TraceConsumer>>,
    metrics: Vec<Arc<dyn MetricsConsumer>>,
}

fn trace_sink(exporter: &Arc<dyn Exporter>) -> Arc<dyn TraceConsumer> {
    Arc::clone(exporter) as Arc<dyn TraceConsumer>
}

fn metrics_sink(exporter: &Arc<dyn Exporter>) -> Arc<dyn MetricsConsumer> {
    Arc::clone(exporter) as Arc<dyn MetricsConsumer>
}

fn chain_head(processor: &Arc<dyn Processor>) -> Arc<dyn TraceConsumer> {
    Arc::clone(processor) as Arc<dyn TraceConsumer>
}

fn build_exporters(
    config: &Config,
    registries: &Registries,
) -> Result<BTreeMap<String, Arc<dyn Exporter>>> {
    let mut exporters: BTreeMap<String, Arc<dyn Exporter>> = BTreeMap::new();

    for pipeline in config.pipelines.values() {
        for name in &pipeline.exporters {
            if exporters.contains_key(name) {
                continue;
            }

            let entity = config
                .exporters
                .get(name)
                .ok_or_else(|| PipelineError::UnknownComponent {
                    kind: "exporter",
                    name: name.clone(),
                })?;
            let factory = registries.exporters.get(entity.type_tag()).ok_or_else(|| {
                PipelineError::UnknownType {
                    kind: "exporter",
                    type_tag: entity.type_tag().to_string(),
                }
            })?;

            let exporter = factory.create_exporter(entity.as_ref())?;
            tracing::debug!(exporter = %name, "built exporter");
            exporters.insert(name.clone(), exporter);
        }
    }

    Ok(exporters)
}

fn build_pipelines(
    config: &Config,
    registries: &Registries,
    exporters: &BTreeMap<String, Arc<dyn Exporter>>,
) -> Result<(Vec<BuiltPipeline>, BTreeMap<String, ReceiverTees>)> {
    let mut pipelines = Vec::new();
    let mut tees: BTreeMap<String, ReceiverTees> = BTreeMap::new();

    for (name, pipeline) in &config.pipelines {
        match pipeline.input_type {
            DataType::Traces => {
                let sinks: Vec<Arc<dyn TraceConsumer>> = pipeline
                    .exporters
                    .iter()
                    .filter_map(|n| exporters.get(n))
                    .map(trace_sink)
                    .collect();
                let mut next = TraceFanOut::wrap(sinks);

                // Tail-first, so each processor is created with its
                // downstream already in place. The resulting list is
                // downstream-first, which is also the start order.
                let mut processors: Vec<(String, Arc<dyn Processor>)> = Vec::new();
                for processor_name in pipeline.processors.iter().rev() {
                    let entity = config.processors.get(processor_name).ok_or_else(|| {
                        PipelineError::UnknownComponent {
                            kind: "processor",
                            name: processor_name.clone(),
                        }
                    })?;
                    let factory =
                        registries.processors.get(entity.type_tag()).ok_or_else(|| {
                            PipelineError::UnknownType {
                                kind: "processor",
                                type_tag: entity.type_tag().to_string(),
                            }
                        })?;

                    let processor =
                        factory.create_processor(entity.as_ref(), Arc::clone(&next))?;
                    next = chain_head(&processor);
                    processors.push((processor_name.clone(), processor));
                }

                for receiver_name in &pipeline.receivers {
                    tees.entry(receiver_name.clone())
                        .or_default()
                        .traces
                        .push(Arc::clone(&next));
                }

                tracing::debug!(
                    pipeline = %name,
                    processors = pipeline.processors.len(),
                    exporters = pipeline.exporters.len(),
                    "built traces pipeline"
                );
                pipelines.push(BuiltPipeline {
                    name: name.clone(),
                    input_type: pipeline.input_type,
                    processors,
                });
            }
            DataType::Metrics => {
                let sinks: Vec<Arc<dyn MetricsConsumer>> = pipeline
                    .exporters
                    .iter()
                    .filter_map(|n| exporters.get(n))
                    .map(metrics_sink)
                    .collect();
                let head = MetricsFanOut::wrap(sinks);

                for receiver_name in &pipeline.receivers {
                    tees.entry(receiver_name.clone())
                        .or_default()
                        .metrics
                        .push(Arc::clone(&head));
                }

                tracing::debug!(
                    pipeline = %name,
                    exporters = pipeline.exporters.len(),
                    "built metrics pipeline"
                );
                pipelines.push(BuiltPipeline {
                    name: name.clone(),
                    input_type: pipeline.input_type,
                    processors: Vec::new(),
                });
            }
        }
    }

    Ok((pipelines, tees))
}

fn build_receivers(
    config: &Config,
    registries: &Registries,
    tees: BTreeMap<String, ReceiverTees>,
) -> Result<Vec<(String, Arc<dyn Receiver>)>> {
    for name in config.receivers.keys() {
        if !tees.contains_key(name) {
            tracing::debug!(receiver = %name, "receiver not referenced by any pipeline, skipping");
        }
    }

    let mut receivers = Vec::new();
    for (name, tee) in tees {
        let entity = config
            .receivers
            .get(&name)
            .ok_or_else(|| PipelineError::UnknownComponent {
                kind: "receiver",
                name: name.clone(),
            })?;
        let factory = registries.receivers.get(entity.type_tag()).ok_or_else(|| {
            PipelineError::UnknownType {
                kind: "receiver",
                type_tag: entity.type_tag().to_string(),
            }
        })?;

        let consumers = ReceiverConsumers {
            traces: (!tee.traces.is_empty()).then(|| TraceFanOut::wrap(tee.traces)),
            metrics: (!tee.metrics.is_empty()).then(|| MetricsFanOut::wrap(tee.metrics)),
        };

        let receiver = factory.create_receiver(entity.as_ref(), consumers)?;
        tracing::debug!(receiver = %name, "built receiver");
        receivers.push((name, receiver));
    }

    Ok(receivers)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
