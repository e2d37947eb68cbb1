use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Bytes;
use serde::Serialize;
use std::convert::TryInto;
use std::time::Duration;

/// The blueprint for the response returned by a [`MockServer`] to an incoming request.
///
/// It is what every [`Respond`] implementation produces: the response handed back to the
/// client once routing has picked an [`Expectation`].
///
/// [`Expectation`]: crate::Expectation
/// [`MockServer`]: crate::MockServer
/// [`Respond`]: crate::Respond
#[derive(Clone, Debug)]
pub struct ResponseTemplate {
    mime: String,
    status_code: StatusCode,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    delay: Option<Duration>,
}

// `httpassert` is a crate meant for testing - failures are most likely not handled/temporary mistakes.
// Hence we prefer to panic and provide an easier API than to use `Result`s thus pushing
// the burden of "correctness" (and conversions) on the user.
impl ResponseTemplate {
    /// Start building a `ResponseTemplate` specifying the status code of the response.
    pub fn new<S>(s: S) -> Self
    where
        S: TryInto<StatusCode>,
        <S as TryInto<StatusCode>>::Error: std::fmt::Debug,
    {
        let status_code = s.try_into().expect("Failed to convert into status code.");
        Self {
            status_code,
            headers: HeaderMap::new(),
            mime: String::new(),
            body: None,
            delay: None,
        }
    }

    /// Append a header `value` to list of headers with `key` as header name.
    ///
    /// Unlike `insert_header`, this function will not override the contents of a header.
    pub fn append_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: std::fmt::Debug,
    {
        let key = key.try_into().expect("Failed to convert into header name.");
        let value = value
            .try_into()
            .expect("Failed to convert into header value.");
        self.headers.append(key, value);
        self
    }

    /// Insert a header `value` with `key` as header name, dropping any previous value.
    pub fn insert_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: std::fmt::Debug,
    {
        let key = key.try_into().expect("Failed to convert into header name.");
        let value = value
            .try_into()
            .expect("Failed to convert into header value.");
        self.headers.insert(key, value);
        self
    }

    /// Set the response body with bytes.
    pub fn set_body_bytes<B>(mut self, body: B) -> Self
    where
        B: TryInto<Vec<u8>>,
        <B as TryInto<Vec<u8>>>::Error: std::fmt::Debug,
    {
        let body = body.try_into().expect("Failed to convert into body.");
        self.body = Some(body);
        self
    }

    /// Set the response body from a JSON-serializable value.
    ///
    /// It sets "Content-Type" to "application/json".
    pub fn set_body_json<B: Serialize>(mut self, body: B) -> Self {
        let body = serde_json::to_vec(&body).expect("Failed to convert into body.");

        self.body = Some(body);
        self.mime = "application/json".to_string();
        self
    }

    /// Set the response body to a string.
    ///
    /// It sets "Content-Type" to "text/plain".
    pub fn set_body_string<T>(mut self, body: T) -> Self
    where
        T: TryInto<String>,
        <T as TryInto<String>>::Error: std::fmt::Debug,
    {
        let body = body.try_into().expect("Failed to convert into body.");

        self.body = Some(body.into_bytes());
        self.mime = "text/plain".to_string();
        self
    }

    /// Delay the response by `delay`.
    ///
    /// The server waits after routing has completed, so a slow response never holds up
    /// the routing of other requests nor a concurrent [`MockServer::assert`].
    ///
    /// [`MockServer::assert`]: crate::MockServer::assert
    pub fn set_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);

        self
    }

    /// The status code this template will respond with.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Generate a response from the template.
    pub(crate) fn generate_response(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::from(self.body.clone().unwrap_or_default()));
        *response.status_mut() = self.status_code;

        let mut headers = self.headers.clone();
        if let Ok(mime) = HeaderValue::from_str(&self.mime) {
            if !self.mime.is_empty() {
                headers.insert(http::header::CONTENT_TYPE, mime);
            }
        }
        *response.headers_mut() = headers;
        response
    }

    /// Retrieve the response delay.
    pub(crate) fn delay(&self) -> Option<Duration> {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_bodies_set_a_text_content_type() {
        let response = ResponseTemplate::new(201)
            .insert_header("x-request-id", "42")
            .set_body_string("hello")
            .generate_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.headers()["x-request-id"], "42");
    }

    #[test]
    fn appended_headers_keep_previous_values() {
        let response = ResponseTemplate::new(200)
            .append_header("set-cookie", "a=1")
            .append_header("set-cookie", "b=2")
            .generate_response();

        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
    }
}
