//! Assert many [`MockServer`]s with a single call.
//!
//! Every [`MockServer`] is registered, at construction, in a process-wide registry that
//! [`assert_all`] and [`verify_all`] go through. The process-wide registry is never cleared:
//! when tests run in parallel it also contains the servers of other tests. A
//! [`ServerRegistry`] passed to [`MockServerBuilder::registry`] only contains the servers you
//! gave it.
//!
//! [`MockServerBuilder::registry`]: crate::MockServerBuilder::registry
use crate::mock_server::MockServerState;
use crate::verification::Reporter;
use crate::MockServer;
use log::debug;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

static GLOBAL_REGISTRY: Lazy<ServerRegistry> = Lazy::new(ServerRegistry::new);

/// An append-only, ordered collection of mock servers.
///
/// Cloning a `ServerRegistry` gives another handle to the same collection. Servers stay in
/// the registry after they are closed or dropped, so they can still be asserted.
///
/// ### Example:
/// ```rust
/// use httpassert::{Expectation, MockServer, ServerRegistry};
///
/// let registry = ServerRegistry::new();
/// let users = MockServer::builder().name("users").registry(&registry).start();
/// let billing = MockServer::builder().name("billing").registry(&registry).start();
/// Expectation::new("GET", "/users").times(1).mount(&users);
/// Expectation::new("POST", "/invoices").times(1).mount(&billing);
///
/// // Nothing was called.
/// let mut failures: Vec<String> = Vec::new();
/// assert!(!registry.assert_all(&mut failures));
/// assert_eq!(
///     failures,
///     vec![
///         "Server(users) expected (1) more calls to GET /users",
///         "Server(billing) expected (1) more calls to POST /invoices",
///     ]
/// );
/// ```
#[derive(Clone, Default)]
pub struct ServerRegistry {
    servers: Arc<Mutex<Vec<Arc<MockServerState>>>>,
}

impl ServerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `server` to the registry.
    ///
    /// Servers built with [`MockServerBuilder::registry`] are added automatically.
    ///
    /// [`MockServerBuilder::registry`]: crate::MockServerBuilder::registry
    pub fn register(&self, server: &MockServer) {
        self.servers
            .lock()
            .expect("Poisoned lock!")
            .push(server.state().clone());
    }

    /// The number of registered servers.
    pub fn len(&self) -> usize {
        self.servers.lock().expect("Poisoned lock!").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assert every registered server, in registration order.
    ///
    /// All servers are asserted, even after one of them failed, so that `reporter` gets every
    /// failure. Returns `true` if all servers passed.
    pub fn assert_all(&self, reporter: &mut dyn Reporter) -> bool {
        reporter.mark_helper();
        let mut pass = true;
        for server in self.snapshot() {
            pass = server.assert(reporter) && pass;
        }
        pass
    }

    /// Assert every registered server and panic with a detailed message if any failed.
    pub fn verify_all(&self) {
        let failures: Vec<String> = self
            .snapshot()
            .iter()
            .filter_map(|server| server.verification_failure())
            .collect();
        if failures.is_empty() {
            return;
        }

        let error_message = format!("Verifications failed:\n{}", failures.join("\n"));
        if std::thread::panicking() {
            debug!("{}", &error_message);
        } else {
            panic!("{}", &error_message);
        }
    }

    // Assert without holding the lock, servers may be registered concurrently.
    fn snapshot(&self) -> Vec<Arc<MockServerState>> {
        self.servers.lock().expect("Poisoned lock!").clone()
    }
}

pub(crate) fn register(server: &MockServer) {
    GLOBAL_REGISTRY.register(server);
}

/// Assert every [`MockServer`] created by this process so far, see
/// [`ServerRegistry::assert_all`].
pub fn assert_all(reporter: &mut dyn Reporter) -> bool {
    GLOBAL_REGISTRY.assert_all(reporter)
}

/// Verify every [`MockServer`] created by this process so far, panicking on failure.
pub fn verify_all() {
    GLOBAL_REGISTRY.verify_all()
}
