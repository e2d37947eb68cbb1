use crate::mock_server::bare_server::MockServerState;
use crate::mock_server::hyper::run_server;
use crate::mock_server::MockServerBuilder;
use crate::verification::Reporter;
use crate::{Expectation, Middleware, Request};
use log::{debug, error};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// An HTTP web-server running in the background that checks your application sends exactly
/// the requests it is expected to send.
///
/// Declare the traffic you expect with [`Expectation`]s, drive your application against
/// [`MockServer::uri`] and, once it is done, call [`MockServer::assert`] to find out about
/// calls that never happened and calls that happened but were not expected.
///
/// Each instance of `MockServer` is fully isolated: [`MockServer::start`] takes care of finding
/// a random port available on your local machine which is assigned to the new `MockServer`.
/// The server runs on its own thread, hence it works with any async runtime (or none).
///
/// ## Best practices
///
/// You should use one instance of `MockServer` for each REST API that your application
/// interacts with and needs mocking for testing purposes.
///
/// To ensure full isolation and no cross-test interference, `MockServer`s shouldn't be
/// shared between tests.
pub struct MockServer {
    state: Arc<MockServerState>,
    server_address: SocketAddr,
    // Dropping or using the trigger stops the accept loop.
    shutdown_trigger: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    server_thread: Mutex<Option<JoinHandle<()>>>,
}

impl MockServer {
    /// You can use `MockServer::builder` if you need to specify custom configuration - e.g.
    /// run on a specific port or disable request recording.
    ///
    /// If this is not your case, use [`MockServer::start`].
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Start a new instance of a `MockServer` named `name`, listening on a random port.
    ///
    /// `name` only shows up in failure messages. The server is registered in the process-wide
    /// registry checked by [`assert_all`](crate::assert_all).
    ///
    /// ### Example:
    /// ```rust
    /// use httpassert::MockServer;
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     let mock_server = MockServer::start("catalog");
    ///
    ///     // Nothing was expected: the request gets a 404...
    ///     let status = reqwest::get(format!("{}/products", mock_server.uri()))
    ///         .await
    ///         .unwrap()
    ///         .status();
    ///     assert_eq!(status, 404);
    ///
    ///     // ...and it is reported as unexpected.
    ///     let mut failures: Vec<String> = Vec::new();
    ///     assert!(!mock_server.assert(&mut failures));
    ///     assert_eq!(
    ///         failures,
    ///         vec!["Server(catalog) got (1) unexpected calls to GET /products"]
    ///     );
    /// }
    /// ```
    pub fn start<N: Into<String>>(name: N) -> Self {
        Self::builder().name(name).start()
    }

    pub(super) fn listen(
        listener: TcpListener,
        state: Arc<MockServerState>,
    ) -> std::io::Result<Self> {
        let server_address = listener.local_addr()?;
        let (shutdown_trigger, shutdown_receiver) = tokio::sync::oneshot::channel();

        let server_state = state.clone();
        let server_thread = std::thread::Builder::new()
            .name(format!("httpassert-{}", state.name()))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Cannot build the mock server runtime: {}", e);
                        return;
                    }
                };
                let server_future = run_server(listener, server_state, shutdown_receiver);
                if let Err(e) = runtime.block_on(server_future) {
                    error!("Mock server failed: {}", e);
                }
            })?;

        Ok(Self {
            state,
            server_address,
            shutdown_trigger: Mutex::new(Some(shutdown_trigger)),
            server_thread: Mutex::new(Some(server_thread)),
        })
    }

    /// Register an [`Expectation`] on this `MockServer`.
    ///
    /// Incoming requests are matched against expectations in registration order: the first one
    /// that matches serves the request. Register narrow prefixes before broad ones.
    ///
    /// ### Example:
    /// ```rust
    /// use httpassert::{Expectation, MockServer, ResponseTemplate};
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     let mock_server = MockServer::start("shadowing");
    ///     mock_server.expect(
    ///         Expectation::new("GET", "/users/me")
    ///             .times(1)
    ///             .respond_with(ResponseTemplate::new(200)),
    ///     );
    ///     mock_server.expect(
    ///         Expectation::new("GET", "/users")
    ///             .times(1)
    ///             .respond_with(ResponseTemplate::new(404)),
    ///     );
    ///
    ///     let client = reqwest::Client::new();
    ///     let me = client.get(format!("{}/users/me", mock_server.uri())).send().await.unwrap();
    ///     let other = client.get(format!("{}/users/42", mock_server.uri())).send().await.unwrap();
    ///
    ///     assert_eq!(me.status(), 200);
    ///     assert_eq!(other.status(), 404);
    ///     assert!(mock_server.assert(&mut Vec::<String>::new()));
    /// }
    /// ```
    pub fn expect(&self, expectation: Expectation) {
        self.state.expect(expectation);
    }

    /// Add a [`Middleware`] around the routing of every incoming request.
    ///
    /// Middlewares run in the order they were added.
    pub fn use_middleware<M: Middleware + 'static>(&self, middleware: M) {
        self.state.use_middleware(Arc::new(middleware));
    }

    /// Report every [`Expectation`] that did not receive exactly the number of calls it
    /// expected to `reporter`, in registration order.
    ///
    /// - `Server(NAME) expected (N) more calls to METHOD PATH` if it was called N times less
    ///   than expected;
    /// - `Server(NAME) got (N) unexpected calls to METHOD PATH` if it was called N times more
    ///   than expected, including requests that matched no expectation at all.
    ///
    /// Returns `true` if nothing was reported. `assert` does not change any state: it can be
    /// called as many times as you like, before or after [`MockServer::close`].
    pub fn assert(&self, reporter: &mut dyn Reporter) -> bool {
        self.state.assert(reporter)
    }

    /// Assert the `MockServer` and panic with a detailed message, listing the received requests,
    /// if any expectation is not satisfied.
    pub fn verify(&self) {
        debug!("Verify expectations of {}.", self.state.name());
        if let Some(failure) = self.state.verification_failure() {
            let error_message = format!("Verifications failed:\n{}", failure);
            if std::thread::panicking() {
                debug!("{}", &error_message);
            } else {
                panic!("{}", &error_message);
            }
        }
    }

    /// Stop listening. Requests still in flight are dropped.
    ///
    /// Expectations are kept: [`MockServer::assert`] gives the same answer before and after
    /// `close`. Closing an already closed server does nothing. Dropping a `MockServer` closes it.
    pub fn close(&self) {
        let shutdown_trigger = self.shutdown_trigger.lock().expect("Poisoned lock!").take();
        if let Some(shutdown_trigger) = shutdown_trigger {
            let _ = shutdown_trigger.send(());
        }
        let server_thread = self.server_thread.lock().expect("Poisoned lock!").take();
        if let Some(server_thread) = server_thread {
            if server_thread.join().is_err() {
                error!("The thread of mock server {} panicked.", self.state.name());
            }
        }
    }

    /// Return the base uri of this running instance of `MockServer`, e.g. `http://127.0.0.1:4372`.
    ///
    /// Use this method to compose uris when interacting with this instance of `MockServer` via
    /// an HTTP client.
    pub fn uri(&self) -> String {
        format!("http://{}", self.server_address)
    }

    /// Return the socket address of this running instance of `MockServer`, e.g. `127.0.0.1:4372`.
    ///
    /// Use this method to interact with the `MockServer` using `TcpStream`s.
    pub fn address(&self) -> &SocketAddr {
        &self.server_address
    }

    /// The name given to this `MockServer` at construction.
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Return a vector with all the requests received by the `MockServer` since it started,
    /// in arrival order, whether they matched an expectation or not.
    ///
    /// If request recording has been disabled using [`MockServerBuilder::disable_request_recording`],
    /// it returns `None`.
    pub fn received_requests(&self) -> Option<Vec<Request>> {
        self.state.received_requests()
    }

    pub(crate) fn state(&self) -> &Arc<MockServerState> {
        &self.state
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.close();
    }
}
