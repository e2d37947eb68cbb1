use crate::mock_server::MockServerState;
use crate::{Request, ResponseTemplate};
use std::sync::Arc;

/// Wraps the routing of every request received by a [`MockServer`].
///
/// Middlewares run in the order they were added with [`MockServer::use_middleware`]: the first
/// one sees the request first and the response last. Each middleware decides whether to call
/// [`Next::run`] to hand the request down the chain; one that doesn't short-circuits routing,
/// and no [`Expectation`] gets to count the request.
///
/// Closures taking a `&Request` and a [`Next`] implement `Middleware`:
///
/// ```rust
/// use httpassert::{Expectation, MockServer, Next, Request, ResponseTemplate};
///
/// #[async_std::main]
/// async fn main() {
///     let mock_server = MockServer::start("auth");
///     mock_server.use_middleware(|request: &Request, next: Next| {
///         if request.headers.contains_key("authorization") {
///             next.run(request)
///         } else {
///             ResponseTemplate::new(401)
///         }
///     });
///     Expectation::new("GET", "/")
///         .times(1)
///         .respond_with(ResponseTemplate::new(200))
///         .mount(&mock_server);
///
///     let client = reqwest::Client::new();
///     let rejected = client.get(mock_server.uri()).send().await.unwrap();
///     let accepted = client
///         .get(mock_server.uri())
///         .header("authorization", "Bearer token")
///         .send()
///         .await
///         .unwrap();
///
///     assert_eq!(rejected.status(), 401);
///     assert_eq!(accepted.status(), 200);
///     assert!(mock_server.assert(&mut Vec::<String>::new()));
/// }
/// ```
///
/// [`MockServer`]: crate::MockServer
/// [`MockServer::use_middleware`]: crate::MockServer::use_middleware
/// [`Expectation`]: crate::Expectation
pub trait Middleware: Send + Sync {
    fn handle(&self, request: &Request, next: Next) -> ResponseTemplate;
}

impl<F> Middleware for F
where
    F: Send + Sync + Fn(&Request, Next) -> ResponseTemplate,
{
    fn handle(&self, request: &Request, next: Next) -> ResponseTemplate {
        (self)(request, next)
    }
}

/// The rest of the middleware chain, ending with the router of the [`MockServer`].
///
/// [`MockServer`]: crate::MockServer
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    server_state: Arc<MockServerState>,
}

impl Next {
    pub(crate) fn new(
        chain: Arc<[Arc<dyn Middleware>]>,
        server_state: Arc<MockServerState>,
    ) -> Self {
        Self {
            chain,
            position: 0,
            server_state,
        }
    }

    /// Pass the request to the next middleware, or route it if this was the last one.
    pub fn run(self, request: &Request) -> ResponseTemplate {
        match self.chain.get(self.position).cloned() {
            Some(middleware) => middleware.handle(
                request,
                Next {
                    position: self.position + 1,
                    ..self
                },
            ),
            None => self.server_state.route(request),
        }
    }
}
