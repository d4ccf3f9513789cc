//! Configuration loading
//!
//! Walks the four top-level TOML tables and turns each entry into a typed
//! config entity via the registered factories: decode the composite key,
//! look up the factory by type, decode the user settings on top of the
//! factory defaults, inject type and name, reject duplicates. Pipelines are
//! decoded directly (their type part is a data type, not a factory tag).
//!
//! Loading ends with validation, so the returned [`Config`] is always
//! topologically sound.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::factory::{
    ExporterFactory, ProcessorFactory, ReceiverFactory, Registries, Registry,
};
use crate::model::{
    Config, DataType, ExporterConfig, PipelineConfig, ProcessorConfig, ReceiverConfig,
    TYPE_AND_NAME_SEPARATOR,
};
use crate::validate;

/// Configuration key name for the receivers section
const RECEIVERS_KEY: &str = "receivers";

/// Configuration key name for the exporters section
const EXPORTERS_KEY: &str = "exporters";

/// Configuration key name for the processors section
const PROCESSORS_KEY: &str = "processors";

/// Configuration key name for the pipelines section
const PIPELINES_KEY: &str = "pipelines";

/// Decode a `type[/name]` composite key into `(type, full_name)`.
///
/// The key splits at most once on the separator; both parts are trimmed.
/// The type part must be non-empty, and when the separator is present the
/// name part must be non-empty too. The normalized full name is the type
/// alone, or `type/name`.
///
/// # Errors
///
/// `InvalidTypeAndNameKey` with the offending key and the reason.
pub fn decode_type_and_name(key: &str) -> Result<(String, String)> {
    let (type_part, name_part) = match key.split_once(TYPE_AND_NAME_SEPARATOR) {
        Some((type_part, name_part)) => (type_part.trim(), Some(name_part.trim())),
        None => (key.trim(), None),
    };

    if type_part.is_empty() {
        return Err(ConfigError::InvalidTypeAndNameKey {
            key: key.to_string(),
            reason: "the type part must be present".into(),
        });
    }

    match name_part {
        Some("") => Err(ConfigError::InvalidTypeAndNameKey {
            key: key.to_string(),
            reason: format!(
                "the name part must be specified after {TYPE_AND_NAME_SEPARATOR:?}"
            ),
        }),
        Some(name) => Ok((
            type_part.to_string(),
            format!("{type_part}{TYPE_AND_NAME_SEPARATOR}{name}"),
        )),
        None => Ok((type_part.to_string(), type_part.to_string())),
    }
}

/// Load and validate configuration from a TOML file.
///
/// # Errors
///
/// `Io` when the file cannot be read, otherwise any load or validation error.
pub fn load_file(path: impl AsRef<Path>, registries: &Registries) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_str(&contents, registries)
}

/// Load and validate configuration from a TOML string.
///
/// # Errors
///
/// `Parse` on invalid TOML, otherwise any load or validation error.
pub fn load_str(source: &str, registries: &Registries) -> Result<Config> {
    let table: toml::Table = toml::from_str(source)?;
    load(&table, registries)
}

/// Load and validate configuration from a parsed TOML table.
///
/// # Errors
///
/// The first load or validation error encountered; no partial configuration
/// is returned.
pub fn load(source: &toml::Table, registries: &Registries) -> Result<Config> {
    let mut config = Config {
        receivers: load_receivers(source.get(RECEIVERS_KEY), &registries.receivers)?,
        exporters: load_exporters(source.get(EXPORTERS_KEY), &registries.exporters)?,
        processors: load_processors(source.get(PROCESSORS_KEY), &registries.processors)?,
        pipelines: load_pipelines(source.get(PIPELINES_KEY))?,
    };

    validate::validate(&mut config)?;

    Ok(config)
}

/// Resolve a section value into its table, treating a missing section as
/// absent and rejecting non-table values.
fn section_table<'a>(
    value: Option<&'a toml::Value>,
    kind: &'static str,
) -> Result<Option<&'a toml::Table>> {
    match value {
        None => Ok(None),
        Some(toml::Value::Table(table)) => Ok(Some(table)),
        Some(other) => Err(ConfigError::unmarshal(
            kind,
            kind,
            format!("expected a table, found {}", other.type_str()),
        )),
    }
}

fn load_receivers(
    section: Option<&toml::Value>,
    registry: &Registry<dyn ReceiverFactory>,
) -> Result<BTreeMap<String, Box<dyn ReceiverConfig>>> {
    // There is no default receiver: the configuration must name at least one
    // to enable any functionality.
    let table = match section_table(section, "receivers")? {
        Some(table) if !table.is_empty() => table,
        _ => return Err(ConfigError::MissingReceivers),
    };

    let mut receivers: BTreeMap<String, Box<dyn ReceiverConfig>> = BTreeMap::new();
    for (key, fragment) in table {
        let (type_tag, full_name) = decode_type_and_name(key)?;

        let factory = registry
            .get(&type_tag)
            .ok_or(ConfigError::UnknownReceiverType(type_tag.clone()))?;

        let mut config = factory
            .unmarshal(fragment)
            .map_err(|e| ConfigError::unmarshal("receiver", key, e))?;

        let settings = config.settings_mut();
        settings.type_tag = type_tag;
        settings.name = full_name.clone();

        if receivers.insert(full_name.clone(), config).is_some() {
            return Err(ConfigError::DuplicateReceiverName(full_name));
        }
    }

    Ok(receivers)
}

fn load_exporters(
    section: Option<&toml::Value>,
    registry: &Registry<dyn ExporterFactory>,
) -> Result<BTreeMap<String, Box<dyn ExporterConfig>>> {
    // There is no default exporter either.
    let table = match section_table(section, "exporters")? {
        Some(table) if !table.is_empty() => table,
        _ => return Err(ConfigError::MissingExporters),
    };

    let mut exporters: BTreeMap<String, Box<dyn ExporterConfig>> = BTreeMap::new();
    for (key, fragment) in table {
        let (type_tag, full_name) = decode_type_and_name(key)?;

        let factory = registry
            .get(&type_tag)
            .ok_or(ConfigError::UnknownExporterType(type_tag.clone()))?;

        let mut config = factory
            .unmarshal(fragment)
            .map_err(|e| ConfigError::unmarshal("exporter", key, e))?;

        let settings = config.settings_mut();
        settings.type_tag = type_tag;
        settings.name = full_name.clone();

        if exporters.insert(full_name.clone(), config).is_some() {
            return Err(ConfigError::DuplicateExporterName(full_name));
        }
    }

    Ok(exporters)
}

fn load_processors(
    section: Option<&toml::Value>,
    registry: &Registry<dyn ProcessorFactory>,
) -> Result<BTreeMap<String, Box<dyn ProcessorConfig>>> {
    // Processors are optional at the top level; pipelines decide whether any
    // are required.
    let Some(table) = section_table(section, "processors")? else {
        return Ok(BTreeMap::new());
    };

    let mut processors: BTreeMap<String, Box<dyn ProcessorConfig>> = BTreeMap::new();
    for (key, fragment) in table {
        let (type_tag, full_name) = decode_type_and_name(key)?;

        let factory = registry
            .get(&type_tag)
            .ok_or(ConfigError::UnknownProcessorType(type_tag.clone()))?;

        let mut config = factory
            .unmarshal(fragment)
            .map_err(|e| ConfigError::unmarshal("processor", key, e))?;

        let settings = config.settings_mut();
        settings.type_tag = type_tag;
        settings.name = full_name.clone();

        if processors.insert(full_name.clone(), config).is_some() {
            return Err(ConfigError::DuplicateProcessorName(full_name));
        }
    }

    Ok(processors)
}

fn load_pipelines(section: Option<&toml::Value>) -> Result<BTreeMap<String, PipelineConfig>> {
    let Some(table) = section_table(section, "pipelines")? else {
        return Ok(BTreeMap::new());
    };

    let mut pipelines = BTreeMap::new();
    for (key, fragment) in table {
        let (type_tag, full_name) = decode_type_and_name(key)?;

        // The type part of a pipeline key is its data type, not a factory tag.
        let input_type = DataType::from_tag(&type_tag)
            .ok_or(ConfigError::InvalidPipelineType(type_tag))?;

        let mut config: PipelineConfig = fragment
            .clone()
            .try_into()
            .map_err(|e| ConfigError::unmarshal("pipeline", key, e))?;
        config.name = full_name.clone();
        config.input_type = input_type;

        if pipelines.insert(full_name.clone(), config).is_some() {
            return Err(ConfigError::DuplicatePipelineName(full_name));
        }
    }

    Ok(pipelines)
}
