//! All bits and pieces concerning the HTTP mock server are in this module.
//!
//! `bare_server::MockServerState` holds the expectations and implements routing and
//! assertion. `exposed_server::MockServer` is the handle crate users interact with: it owns the
//! listener, running on a background thread with the `hyper` server defined in the `hyper`
//! sub-module, and shares the state with the registries.
mod bare_server;
mod builder;
mod exposed_server;
mod hyper;

pub(crate) use bare_server::MockServerState;
pub use builder::MockServerBuilder;
pub use exposed_server::MockServer;

pub(crate) type DynError = Box<dyn std::error::Error + Send + Sync>;
