//! Conflux - Receivers
//!
//! Ingress components that consume external wire protocols and emit
//! in-memory batches into the pipelines referencing them.
//!
//! The canonical receiver is the `conflux` receiver: one bound socket
//! serving both the binary-framed RPC protocol and a JSON/REST translation
//! of the same export service, demultiplexed per connection by sniffing the
//! preface's `content-type` header.

pub mod conflux;

pub use conflux::{ConfluxReceiver, ConfluxReceiverConfig, ConfluxReceiverFactory};
