use crate::{Request, ResponseTemplate};
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

/// Anything that implements `Respond` can be used to reply to a request served by an
/// [`Expectation`].
///
/// ## Fixed responses
///
/// The simplest `Respond` is [`ResponseTemplate`]: no matter the request, it will
/// always return itself.
///
/// ```rust
/// use httpassert::{Expectation, MockServer, ResponseTemplate};
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start("greeter");
///     Expectation::new("GET", "/hello")
///         .times(1)
///         .respond_with(ResponseTemplate::new(200).set_body_string("world"))
///         .mount(&mock_server);
///
///     // Act
///     let response = reqwest::get(format!("{}/hello", mock_server.uri()))
///         .await
///         .unwrap();
///
///     // Assert
///     assert_eq!(response.status(), 200);
///     assert_eq!(response.text().await.unwrap(), "world");
///     assert!(mock_server.assert(&mut Vec::<String>::new()));
/// }
/// ```
///
/// ## Dynamic responses
///
/// Closures taking a `&Request` and returning a [`ResponseTemplate`] implement `Respond` too.
/// Since routing only looks at the method and the path prefix, this is the place where more
/// advanced checks on the request belong:
///
/// ```rust
/// use httpassert::{Expectation, MockServer, Request, ResponseTemplate};
///
/// #[async_std::main]
/// async fn main() {
///     let mock_server = MockServer::start("users");
///     Expectation::new("GET", "/users")
///         .times(1)
///         .respond_with(|request: &Request| {
///             if request.path() == "/users/123" {
///                 ResponseTemplate::new(200)
///             } else {
///                 ResponseTemplate::new(400)
///             }
///         })
///         .mount(&mock_server);
///
///     let status = reqwest::get(format!("{}/users/123", mock_server.uri()))
///         .await
///         .unwrap()
///         .status();
///     assert_eq!(status, 200);
/// }
/// ```
///
/// [`Expectation`]: crate::Expectation
pub trait Respond: Send + Sync {
    /// Given a reference to a [`Request`] return a [`ResponseTemplate`] that will be used
    /// by the [`MockServer`] as blueprint for the response returned to the client.
    ///
    /// [`MockServer`]: crate::MockServer
    fn respond(&self, request: &Request) -> ResponseTemplate;
}

impl Respond for ResponseTemplate {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.clone()
    }
}

impl<F> Respond for F
where
    F: Send + Sync + Fn(&Request) -> ResponseTemplate,
{
    fn respond(&self, request: &Request) -> ResponseTemplate {
        (self)(request)
    }
}

/// The default not-found responder: a `404` with a plain text body.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Respond for NotFound {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_string("404 page not found\n")
    }
}

static NOT_FOUND_RESPONDER: Lazy<RwLock<Arc<dyn Respond>>> = Lazy::new(|| {
    let responder: Arc<dyn Respond> = Arc::new(NotFound);
    RwLock::new(responder)
});

/// Replace the process-wide responder used when an [`Expectation`] without a responder is
/// served, and for requests that matched no [`Expectation`] at all.
///
/// It applies to every [`MockServer`] that was not given its own responder via
/// [`MockServerBuilder::not_found`].
///
/// [`Expectation`]: crate::Expectation
/// [`MockServer`]: crate::MockServer
/// [`MockServerBuilder::not_found`]: crate::MockServerBuilder::not_found
pub fn set_not_found_responder<R: Respond + 'static>(responder: R) {
    *NOT_FOUND_RESPONDER.write().expect("Poisoned lock!") = Arc::new(responder);
}

/// Go back to [`NotFound`] as the process-wide not-found responder.
pub fn reset_not_found_responder() {
    set_not_found_responder(NotFound);
}

pub(crate) fn not_found_responder() -> Arc<dyn Respond> {
    NOT_FOUND_RESPONDER.read().expect("Poisoned lock!").clone()
}
