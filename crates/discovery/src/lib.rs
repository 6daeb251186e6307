//! # CodeGuard Discovery
//!
//! Finds the providers that can run quality tools for a workspace.
//!
//! ## Architecture
//!
//! ```text
//! [ServerConfig..] ──> Discovery::discover
//!                        │  (JoinSet, one probe per server)
//!                        ├─> GET  {url}/capabilities        ──┐
//!                        └─> POST {url} initialize (on 404) ──┴─> capability mapping
//!                                                                   (CapabilityInference)
//!                        │
//!                        └─> Vec<Arc<dyn Provider>>   (built-ins when nothing answers)
//! ```
//!
//! Discovery never yields an empty provider list.

mod discovery;
mod error;
mod http;
mod inference;
mod provider;
mod remote;

pub use discovery::{Discovered, Discovery, DiscoveryConfig, DiscoveryReport, ServerConfig};
pub use error::{DiscoveryError, Result};
pub use inference::{map_capabilities, slugify, CapabilityInference, KeywordInference, NoInference};
pub use provider::{builtin_providers, BuiltinProvider, Provider};
pub use remote::RemoteProvider;
