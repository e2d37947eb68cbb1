use crate::middleware::{Middleware, Next};
use crate::request::BodyPrintLimit;
use crate::respond::not_found_responder;
use crate::verification::{Reporter, VerificationReport};
use crate::{Expectation, Request, Respond, ResponseTemplate};
use log::debug;
use std::fmt::Write;
use std::sync::{Arc, Mutex, RwLock};

pub(crate) enum RequestRecording {
    Enabled,
    Disabled,
}

/// Everything a mock server knows about its traffic: the expectations in registration order,
/// the middleware chain and the requests it received.
///
/// It outlives the listener: the registries keep it around, so a server can be asserted
/// after it has been closed.
pub(crate) struct MockServerState {
    name: String,
    expectations: RwLock<Vec<Arc<Expectation>>>,
    middleware: RwLock<Vec<Arc<dyn Middleware>>>,
    received_requests: Option<Mutex<Vec<Request>>>,
    not_found: Option<Arc<dyn Respond>>,
    body_print_limit: BodyPrintLimit,
}

impl MockServerState {
    pub(crate) fn new(
        name: String,
        recording: RequestRecording,
        body_print_limit: BodyPrintLimit,
        not_found: Option<Arc<dyn Respond>>,
    ) -> Self {
        let received_requests = match recording {
            RequestRecording::Enabled => Some(Mutex::new(Vec::new())),
            RequestRecording::Disabled => None,
        };
        Self {
            name,
            expectations: RwLock::new(Vec::new()),
            middleware: RwLock::new(Vec::new()),
            received_requests,
            not_found,
            body_print_limit,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn expect(&self, expectation: Expectation) {
        self.expectations
            .write()
            .expect("Poisoned lock!")
            .push(Arc::new(expectation));
    }

    pub(crate) fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middleware
            .write()
            .expect("Poisoned lock!")
            .push(middleware);
    }

    /// Entry point for every request received by the listener.
    pub(crate) fn handle_request(self: &Arc<Self>, request: &Request) -> ResponseTemplate {
        debug!("Handling request {} {}.", request.method, request.path());
        if let Some(received_requests) = &self.received_requests {
            received_requests
                .lock()
                .expect("Poisoned lock!")
                .push(request.clone());
        }

        let chain: Arc<[Arc<dyn Middleware>]> = self
            .middleware
            .read()
            .expect("Poisoned lock!")
            .iter()
            .cloned()
            .collect();
        Next::new(chain, self.clone()).run(request)
    }

    /// Serve `request` with the first expectation that matches it, in registration order.
    ///
    /// A request nobody expected is recorded as a new expectation with zero expected calls,
    /// so that it shows up as unexpected when the server is asserted.
    pub(crate) fn route(&self, request: &Request) -> ResponseTemplate {
        let matched = self
            .expectations
            .read()
            .expect("Poisoned lock!")
            .iter()
            .find(|expectation| expectation.matches(request))
            .cloned();

        let expectation = match matched {
            Some(expectation) => expectation,
            None => {
                debug!("Got unexpected request:\n{}", request);
                self.register_unexpected(request)
            }
        };

        // The list lock is released: a slow responder does not hold up other requests.
        let not_found = self.not_found.clone().unwrap_or_else(not_found_responder);
        expectation.serve(request, not_found.as_ref())
    }

    fn register_unexpected(&self, request: &Request) -> Arc<Expectation> {
        let mut expectations = self.expectations.write().expect("Poisoned lock!");
        // A concurrent request or `expect` call may have beaten us to it.
        if let Some(expectation) = expectations.iter().find(|e| e.matches(request)) {
            return expectation.clone();
        }
        let expectation = Arc::new(Expectation::unexpected(request));
        expectations.push(expectation.clone());
        expectation
    }

    /// Report every expectation whose remaining calls are not zero.
    ///
    /// Returns `true` if nothing was reported. Counters are only read.
    pub(crate) fn assert(&self, reporter: &mut dyn Reporter) -> bool {
        reporter.mark_helper();

        let expectations = self.expectations.read().expect("Poisoned lock!").clone();
        let mut pass = true;
        for expectation in &expectations {
            let report = VerificationReport::for_expectation(expectation);
            if let Some(message) = report.error_message(&self.name, expectation) {
                reporter.report(message);
                pass = false;
            }
        }
        pass
    }

    pub(crate) fn received_requests(&self) -> Option<Vec<Request>> {
        self.received_requests
            .as_ref()
            .map(|requests| requests.lock().expect("Poisoned lock!").clone())
    }

    /// The failures of this server followed by the requests it received, `None` if the
    /// server passes its assertion.
    pub(crate) fn verification_failure(&self) -> Option<String> {
        let mut failures: Vec<String> = Vec::new();
        if self.assert(&mut failures) {
            return None;
        }

        let mut message: String = failures
            .iter()
            .map(|failure| format!("- {}\n", failure))
            .collect();
        message.push('\n');
        match self.received_requests() {
            Some(received_requests) if received_requests.is_empty() => {
                message.push_str("The server did not receive any request.\n");
            }
            Some(received_requests) => {
                message.push_str("Received requests:\n");
                for (index, request) in received_requests.iter().enumerate() {
                    let mut printed = String::new();
                    let _ = request.print_with_limit(&mut printed, self.body_print_limit);
                    let _ = writeln!(message, "- Request #{}", index + 1);
                    for line in printed.lines().filter(|line| !line.is_empty()) {
                        let _ = writeln!(message, "\t{}", line);
                    }
                }
            }
            None => message.push_str(
                "Enable request recording on the mock server to get the list of incoming requests as part of the panic message.\n",
            ),
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str) -> Arc<MockServerState> {
        Arc::new(MockServerState::new(
            name.to_string(),
            RequestRecording::Enabled,
            BodyPrintLimit::Unlimited,
            None,
        ))
    }

    #[test]
    fn the_first_registered_match_wins() {
        let state = state("routing");
        state.expect(
            Expectation::new("GET", "/api")
                .times(1)
                .respond_with(ResponseTemplate::new(200)),
        );
        state.expect(
            Expectation::new("GET", "/api/users")
                .times(1)
                .respond_with(ResponseTemplate::new(201)),
        );

        let response = state.handle_request(&Request::for_test("GET", "/api/users/1"));

        assert_eq!(response.status_code(), 200);
        let mut failures: Vec<String> = Vec::new();
        assert!(!state.assert(&mut failures));
        assert_eq!(
            failures,
            vec!["Server(routing) expected (1) more calls to GET /api/users"]
        );
    }

    #[test]
    fn counters_end_at_expected_minus_received() {
        let state = state("counting");
        state.expect(Expectation::new("PUT", "/items").times(3));

        for _ in 0..7 {
            state.handle_request(&Request::for_test("PUT", "/items/9"));
        }

        let expectations = state.expectations.read().unwrap();
        assert_eq!(expectations.len(), 1);
        assert_eq!(expectations[0].remaining_calls(), -4);
    }

    #[test]
    fn identical_unexpected_requests_accumulate_on_one_synthetic_expectation() {
        let state = state("synthetic");

        for _ in 0..4 {
            let response = state.handle_request(&Request::for_test("DELETE", "/orders/7"));
            assert_eq!(response.status_code(), 404);
        }

        let mut failures: Vec<String> = Vec::new();
        assert!(!state.assert(&mut failures));
        assert_eq!(
            failures,
            vec!["Server(synthetic) got (4) unexpected calls to DELETE /orders/7"]
        );
    }

    #[test]
    fn concurrent_unexpected_requests_create_a_single_synthetic_expectation() {
        let state = state("racing");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        state.handle_request(&Request::for_test("GET", "/race"));
                    }
                });
            }
        });

        let expectations = state.expectations.read().unwrap();
        assert_eq!(expectations.len(), 1);
        assert_eq!(expectations[0].remaining_calls(), -200);
    }

    #[test]
    fn assert_is_read_only() {
        let state = state("idempotent");
        state.expect(Expectation::new("PATCH", "/missed").times(2));

        for _ in 0..3 {
            let mut failures: Vec<String> = Vec::new();
            assert!(!state.assert(&mut failures));
            assert_eq!(
                failures,
                vec!["Server(idempotent) expected (2) more calls to PATCH /missed"]
            );
        }
    }

    #[test]
    fn a_balanced_server_has_no_verification_failure() {
        let state = state("balanced");
        state.expect(Expectation::new("GET", "/").times(1));

        state.handle_request(&Request::for_test("GET", "/"));

        assert!(state.verification_failure().is_none());
    }

    #[test]
    fn verification_failures_list_the_received_requests() {
        let state = state("listing");
        state.handle_request(&Request::for_test("POST", "/hooks"));

        let failure = state.verification_failure().unwrap();

        assert_eq!(
            failure,
            "- Server(listing) got (1) unexpected calls to POST /hooks\n\n\
             Received requests:\n\
             - Request #1\n\
             \tPOST http://localhost/hooks\n"
        );
    }
}
