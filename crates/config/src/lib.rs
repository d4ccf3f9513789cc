//! Conflux - Configuration
//!
//! TOML-based configuration loading for the collector. The loader relies on
//! registered factories to produce typed, defaulted configuration for each
//! receiver, processor and exporter, so the set of component types is open:
//! registering a factory is all it takes to make a new `type` usable in
//! config files.
//!
//! # Layout
//!
//! Four top-level tables: `receivers`, `processors`, `exporters`,
//! `pipelines`. Sub-keys are composite `type` or `type/suffix` names; the
//! normalized full name is the identifier used everywhere else. Pipeline
//! keys use the data type (`traces` or `metrics`) as the type part.
//!
//! ```toml
//! [receivers.conflux]
//! endpoint = "0.0.0.0:55678"
//!
//! [processors.batch]
//!
//! [exporters."logging/debug"]
//!
//! [pipelines."traces/default"]
//! receivers = ["conflux"]
//! processors = ["batch"]
//! exporters = ["logging/debug"]
//! ```
//!
//! # Loading
//!
//! [`load_file`] / [`load_str`] parse, decode and validate in one pass;
//! validation prunes disabled components and enforces the topology rules, so
//! a returned [`Config`] is always buildable.

mod error;
mod factory;
mod load;
mod model;
mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{ConfigError, Result};
pub use factory::{
    ExporterFactory, Factory, FactoryError, ProcessorFactory, ReceiverConsumers, ReceiverFactory,
    Registries, Registry,
};
pub use load::{decode_type_and_name, load, load_file, load_str};
pub use model::{
    Config, DataType, ExporterConfig, ExporterSettings, PipelineConfig, ProcessorConfig,
    ProcessorSettings, ReceiverConfig, ReceiverSettings, TYPE_AND_NAME_SEPARATOR,
};
