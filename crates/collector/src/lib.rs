//! Conflux - Collector assembly
//!
//! Wires the built-in component factories into the registries the loader
//! and builder consult. The binary in this crate is the operator-facing
//! entry point; everything else lives in the component crates.

mod registry;

pub use registry::default_registries;
