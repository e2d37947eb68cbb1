use crate::{MockServer, Request, Respond, ResponseTemplate};
use http::Method;
use log::error;
use std::convert::TryInto;
use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, Ordering};

/// One anticipated traffic pattern: a method, a path prefix, how to respond and how many
/// times it should be called.
///
/// Matching is deliberately simple: the request method must be equal to `method` and the
/// request path must start with `path_prefix`. Anything more advanced belongs in the
/// responder.
///
/// An `Expectation` does nothing until it is handed to a [`MockServer`] via
/// [`MockServer::expect`] or [`Expectation::mount`].
///
/// ### Example:
/// ```rust
/// use httpassert::{Expectation, MockServer, ResponseTemplate};
///
/// #[async_std::main]
/// async fn main() {
///     let mock_server = MockServer::start("billing");
///     Expectation::new("POST", "/invoices")
///         .times(2)
///         .respond_with(ResponseTemplate::new(201))
///         .mount(&mock_server);
///
///     let client = reqwest::Client::new();
///     for _ in 0..2 {
///         let status = client
///             .post(format!("{}/invoices", mock_server.uri()))
///             .send()
///             .await
///             .unwrap()
///             .status();
///         assert_eq!(status, 201);
///     }
///
///     assert!(mock_server.assert(&mut Vec::<String>::new()));
/// }
/// ```
pub struct Expectation {
    method: Method,
    path_prefix: String,
    responder: Option<Box<dyn Respond>>,
    remaining_calls: AtomicI64,
}

impl Expectation {
    /// Expect requests with the given `method` whose path starts with `path_prefix`.
    ///
    /// The expectation starts with zero expected calls: use [`Expectation::times`] to set
    /// how many requests it should serve.
    pub fn new<M, P>(method: M, path_prefix: P) -> Self
    where
        M: TryInto<Method>,
        <M as TryInto<Method>>::Error: std::fmt::Debug,
        P: Into<String>,
    {
        Self {
            method: method.try_into().expect("Failed to convert into method."),
            path_prefix: path_prefix.into(),
            responder: None,
            remaining_calls: AtomicI64::new(0),
        }
    }

    /// Set the number of requests this expectation must serve.
    ///
    /// `0` means the matching requests must never happen: any call will be reported as
    /// unexpected when the server is asserted.
    pub fn times(self, n: u32) -> Self {
        self.remaining_calls.store(i64::from(n), Ordering::SeqCst);
        self
    }

    /// Use `responder` to build the response of every request served by this expectation.
    ///
    /// Without a responder the not-found responder is used, see [`set_not_found_responder`].
    ///
    /// [`set_not_found_responder`]: crate::set_not_found_responder
    pub fn respond_with<R: Respond + 'static>(mut self, responder: R) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Register this expectation on `server`. Shorthand for [`MockServer::expect`].
    pub fn mount(self, server: &MockServer) {
        server.expect(self);
    }

    /// The synthetic expectation recorded for a request that matched nothing.
    pub(crate) fn unexpected(request: &Request) -> Self {
        Self::new(request.method.clone(), request.path())
    }

    /// The method requests must have to match.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The prefix the path of a matching request starts with.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// How many calls are still expected.
    ///
    /// Negative values count the calls received beyond what was expected.
    pub fn remaining_calls(&self) -> i64 {
        self.remaining_calls.load(Ordering::SeqCst)
    }

    /// `true` if the request has the same method and its path starts with the prefix.
    pub fn matches(&self, request: &Request) -> bool {
        self.method == request.method && request.path().starts_with(&self.path_prefix)
    }

    /// Add `delta` to the remaining calls. Use negative numbers to decrement.
    pub fn adjust_count(&self, delta: i64) {
        self.remaining_calls.fetch_add(delta, Ordering::SeqCst);
    }

    /// Produce the response for `request` and account for the call.
    ///
    /// The counter is decremented once per invocation, whatever the responder does.
    pub(crate) fn serve(&self, request: &Request, not_found: &dyn Respond) -> ResponseTemplate {
        let responder: &dyn Respond = match &self.responder {
            Some(responder) => responder.as_ref(),
            None => not_found,
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| responder.respond(request)));
        self.adjust_count(-1);

        outcome.unwrap_or_else(|_| {
            error!(
                "The responder for {} {} panicked while serving {} {}.",
                self.method,
                self.path_prefix,
                request.method,
                request.path()
            );
            ResponseTemplate::new(500)
        })
    }
}

impl Debug for Expectation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("method", &self.method)
            .field("path_prefix", &self.path_prefix)
            .field("has_responder", &self.responder.is_some())
            .field("remaining_calls", &self.remaining_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotFound;

    #[test]
    fn matches_on_method_and_path_prefix() {
        let expectation = Expectation::new("GET", "/users");

        assert!(expectation.matches(&Request::for_test("GET", "/users")));
        assert!(expectation.matches(&Request::for_test("GET", "/users/123")));
        assert!(expectation.matches(&Request::for_test("GET", "/usersettings")));
        assert!(!expectation.matches(&Request::for_test("POST", "/users")));
        assert!(!expectation.matches(&Request::for_test("GET", "/")));
        assert!(!expectation.matches(&Request::for_test("GET", "/api/users")));
    }

    #[test]
    fn prefixes_are_matched_against_the_decoded_path() {
        let expectation = Expectation::new("GET", "/a b");
        let encoded = Request::for_test("GET", "/a%20b");
        let dotted = Request::for_test("GET", "/x/../y");

        assert!(expectation.matches(&encoded));
        assert!(Expectation::new("GET", "/x/..").matches(&dotted));
        assert!(!Expectation::new("GET", "/y").matches(&dotted));
        assert_eq!(Expectation::unexpected(&encoded).path_prefix(), "/a b");
        assert_eq!(Expectation::unexpected(&dotted).path_prefix(), "/x/../y");
    }

    #[test]
    fn method_comparison_is_exact() {
        let expectation = Expectation::new("get", "/");

        assert!(!expectation.matches(&Request::for_test("GET", "/")));
        assert!(expectation.matches(&Request::for_test("get", "/")));
    }

    #[test]
    fn every_serve_decrements_the_counter_once() {
        let expectation = Expectation::new("GET", "/").times(2);
        let request = Request::for_test("GET", "/");

        for _ in 0..5 {
            expectation.serve(&request, &NotFound);
        }

        assert_eq!(expectation.remaining_calls(), -3);
    }

    #[test]
    fn missing_responder_falls_back_to_not_found() {
        let expectation = Expectation::new("GET", "/").times(1);

        let response = expectation.serve(&Request::for_test("GET", "/"), &NotFound);

        assert_eq!(response.status_code(), 404);
        assert_eq!(expectation.remaining_calls(), 0);
    }

    #[test]
    fn a_panicking_responder_still_counts_as_a_call() {
        let expectation = Expectation::new("GET", "/")
            .times(1)
            .respond_with(|_: &Request| -> ResponseTemplate { panic!("broken responder") });

        let response = expectation.serve(&Request::for_test("GET", "/"), &NotFound);

        assert_eq!(response.status_code(), 500);
        assert_eq!(expectation.remaining_calls(), 0);
    }

    #[test]
    fn concurrent_adjustments_are_not_lost() {
        let expectation = Expectation::new("GET", "/").times(1000);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        expectation.adjust_count(-1);
                    }
                });
            }
        });

        assert_eq!(expectation.remaining_calls(), 0);
    }
}
