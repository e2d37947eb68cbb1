use crate::mock_server::bare_server::{MockServerState, RequestRecording};
use crate::request::{BodyPrintLimit, BODY_PRINT_LIMIT};
use crate::{MockServer, Respond, ServerRegistry};
use std::env;
use std::net::TcpListener;
use std::sync::Arc;

/// A builder providing a fluent API to assemble a [`MockServer`] step-by-step.
/// Use [`MockServer::builder`] to get started.
pub struct MockServerBuilder {
    name: String,
    listener: Option<TcpListener>,
    record_incoming_requests: bool,
    body_print_limit: BodyPrintLimit,
    registry: Option<ServerRegistry>,
    not_found: Option<Arc<dyn Respond>>,
}

impl MockServerBuilder {
    pub(super) fn new() -> Self {
        let body_print_limit = match env::var("HTTPASSERT_BODY_PRINT_LIMIT")
            .ok()
            .and_then(|x| x.parse::<usize>().ok())
        {
            Some(limit) => BodyPrintLimit::Limited(limit),
            None => BodyPrintLimit::Limited(BODY_PRINT_LIMIT),
        };
        Self {
            name: "mock".to_string(),
            listener: None,
            record_incoming_requests: true,
            body_print_limit,
            registry: None,
            not_found: None,
        }
    }

    /// The label used for this server in failure messages, e.g. `Server(payments) ...`.
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Each instance of [`MockServer`] is, by default, running on a random
    /// port available on your local machine.
    /// With `MockServerBuilder::listener` you can choose to start the `MockServer`
    /// instance on a specific port you have already bound.
    ///
    /// ### Example:
    /// ```rust
    /// use httpassert::MockServer;
    ///
    /// // Arrange
    /// let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    /// let expected_server_address = listener
    ///     .local_addr()
    ///     .expect("Failed to get server address.");
    ///
    /// // Act
    /// let mock_server = MockServer::builder().listener(listener).start();
    ///
    /// // Assert
    /// assert_eq!(&expected_server_address, mock_server.address());
    /// ```
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// By default, [`MockServer`] records all incoming requests to display
    /// more meaningful messages when [`MockServer::verify`] fails.
    ///
    /// This can sometimes be undesirable (e.g. a long-lived server serving
    /// high volumes of traffic) - you can disable request recording using
    /// `MockServerBuilder::disable_request_recording`.
    pub fn disable_request_recording(mut self) -> Self {
        self.record_incoming_requests = false;
        self
    }

    /// The mock server prints the requests it received when verification fails.
    /// By default, the size of the printed body is limited to 10 000 bytes, or to the value
    /// of the `HTTPASSERT_BODY_PRINT_LIMIT` environment variable if set.
    pub fn body_print_limit(mut self, limit: BodyPrintLimit) -> Self {
        self.body_print_limit = limit;
        self
    }

    /// Also register the server in `registry`, on top of the process-wide one.
    ///
    /// Asserting your own [`ServerRegistry`] is not affected by servers started by other
    /// tests running in the same process.
    pub fn registry(mut self, registry: &ServerRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    /// Respond with `responder` instead of the process-wide not-found responder.
    ///
    /// See [`set_not_found_responder`](crate::set_not_found_responder).
    pub fn not_found<R: Respond + 'static>(mut self, responder: R) -> Self {
        self.not_found = Some(Arc::new(responder));
        self
    }

    /// Finalise the builder and launch the [`MockServer`] instance!
    ///
    /// It returns an error if no port could be bound or if the server thread could not
    /// be spawned.
    pub fn try_start(self) -> std::io::Result<MockServer> {
        let listener = match self.listener {
            Some(listener) => listener,
            None => TcpListener::bind("127.0.0.1:0")?,
        };
        let recording = if self.record_incoming_requests {
            RequestRecording::Enabled
        } else {
            RequestRecording::Disabled
        };
        let state = Arc::new(MockServerState::new(
            self.name,
            recording,
            self.body_print_limit,
            self.not_found,
        ));

        let server = MockServer::listen(listener, state)?;
        crate::registry::register(&server);
        if let Some(registry) = &self.registry {
            registry.register(&server);
        }
        Ok(server)
    }

    /// Finalise the builder and launch the [`MockServer`] instance!
    ///
    /// Panics if the server cannot be started, see [`MockServerBuilder::try_start`].
    pub fn start(self) -> MockServer {
        self.try_start()
            .expect("Failed to start a mock server on an OS port.")
    }
}
