#![allow(clippy::needless_doctest_main)]
//! `httpassert` provides an HTTP mock server that verifies your application sends exactly the
//! requests it is expected to send: no call missing, no call too many, no call nobody expected.
//!
//! # Table of Contents
//! 1. [Getting started](#getting-started)
//! 2. [Routing](#routing)
//! 3. [Assertions](#assertions)
//! 4. [Asserting every server at once](#asserting-every-server-at-once)
//! 5. [Runtime compatibility](#runtime-compatibility)
//!
//! ## Getting started
//! ```rust
//! use httpassert::{Expectation, MockServer, ResponseTemplate};
//!
//! #[async_std::main]
//! async fn main() {
//!     // Start a background HTTP server on a random local port
//!     let mock_server = MockServer::start("hello-service");
//!
//!     // Declare the traffic we expect: exactly one GET request on '/hello'.
//!     Expectation::new("GET", "/hello")
//!         .times(1)
//!         .respond_with(ResponseTemplate::new(200).set_body_string("world"))
//!         .mount(&mock_server);
//!
//!     // Probe the MockServer using any HTTP client.
//!     let body = reqwest::get(format!("{}/hello", mock_server.uri()))
//!         .await
//!         .unwrap()
//!         .text()
//!         .await
//!         .unwrap();
//!     assert_eq!(body, "world");
//!
//!     // Exactly what we expected: nothing to report.
//!     let mut failures: Vec<String> = Vec::new();
//!     assert!(mock_server.assert(&mut failures));
//!     assert!(failures.is_empty());
//! }
//! ```
//!
//! ## Routing
//!
//! An [`Expectation`] matches a request if the request has the same method and its path starts
//! with the expectation's path prefix. Expectations are tried in registration order and the
//! first one that matches serves the request, even if a more specific one was registered later.
//!
//! A request that matches no expectation gets the not-found response (a `404` unless changed
//! with [`set_not_found_responder`]) and is recorded, so that it can be reported later.
//!
//! ## Assertions
//!
//! Every [`Expectation`] keeps count of the calls it still expects. [`MockServer::assert`]
//! reports, to a [`Reporter`] of your choice, every expectation that received too few calls and
//! every expectation that received too many, including requests nobody expected.
//! All discrepancies are collected while the test runs and reported together at the end.
//!
//! [`MockServer::verify`] does the same but panics with a detailed message, listing the
//! requests the server received.
//!
//! ## Asserting every server at once
//!
//! Every [`MockServer`] is registered in a process-wide registry: [`assert_all`] and
//! [`verify_all`] check them all. Since the process-wide registry is shared with every other
//! test of the same binary, you can use your own [`ServerRegistry`] instead.
//!
//! ## Runtime compatibility
//!
//! Each [`MockServer`] runs on its own background thread, hence `httpassert` can be used with
//! [`async_std`], [`tokio`] or synchronous HTTP clients.
//!
//! [`async_std`]: https://docs.rs/async-std/
//! [`tokio`]: https://docs.rs/tokio/
mod expectation;
pub mod http;
mod middleware;
mod mock_server;
mod registry;
mod request;
mod respond;
mod response_template;
mod verification;

pub use expectation::Expectation;
pub use middleware::{Middleware, Next};
pub use mock_server::{MockServer, MockServerBuilder};
pub use registry::{assert_all, verify_all, ServerRegistry};
pub use request::{BodyPrintLimit, Request};
pub use respond::{reset_not_found_responder, set_not_found_responder, NotFound, Respond};
pub use response_template::ResponseTemplate;
pub use verification::{LogReporter, Reporter};
