use std::fmt;

use http::{HeaderMap, Method, Uri};
use http_body_util::BodyExt;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use url::Url;

pub const BODY_PRINT_LIMIT: usize = 10_000;

/// Specifies limitations on printing request bodies in verification failures. For some mock
/// servers the bodies may be too large to reasonably print and it may be desirable to limit them.
#[derive(Debug, Copy, Clone)]
pub enum BodyPrintLimit {
    /// Maximum length of a body to print in bytes.
    Limited(usize),
    /// There is no limit to the size of a body that may be printed.
    Unlimited,
}

/// An incoming request to an instance of [`MockServer`].
///
/// Routing only looks at `method` and [`Request::path`]: headers and body are there for
/// your [`Respond`] implementations and [`Middleware`]s to inspect.
///
/// [`MockServer`]: crate::MockServer
/// [`Respond`]: crate::Respond
/// [`Middleware`]: crate::Middleware
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    path: String,
}

impl Request {
    /// The path the client asked for, percent-decoded and without the query string,
    /// e.g. `/users/a b` for `GET /users/a%20b?page=2`.
    ///
    /// Dot segments are left alone: a request for `/x/../y` has path `/x/../y`, unlike
    /// `url.path()`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub(crate) async fn from_hyper(
        request: hyper::Request<hyper::body::Incoming>,
    ) -> Result<Request, crate::mock_server::DynError> {
        let (parts, body) = request.into_parts();
        let path = decoded_path(&parts.uri);
        let url = match parts.uri.authority() {
            Some(_) => parts.uri.to_string(),
            None => format!("http://localhost{}", parts.uri),
        }
        .parse()?;

        let body = body.collect().await?.to_bytes();

        Ok(Self {
            url,
            method: parts.method,
            headers: parts.headers,
            body: body.to_vec(),
            path,
        })
    }

    pub(crate) fn print_with_limit(
        &self,
        mut buffer: impl fmt::Write,
        body_print_limit: BodyPrintLimit,
    ) -> fmt::Result {
        writeln!(buffer, "{} {}", self.method, self.url)?;
        for name in self.headers.keys() {
            let values = self
                .headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect::<Vec<_>>();
            writeln!(buffer, "{}: {}", name, values.join(","))?;
        }

        let printable = match body_print_limit {
            BodyPrintLimit::Limited(limit) if self.body.len() > limit => {
                // Back off to the closest char boundary below the limit.
                (limit.saturating_sub(3)..=limit)
                    .rev()
                    .find_map(|end| std::str::from_utf8(&self.body[..end]).ok())
                    .map(|truncated| (truncated, true))
            }
            _ => std::str::from_utf8(&self.body).ok().map(|body| (body, false)),
        };

        match printable {
            Some((body, truncated)) => {
                writeln!(buffer, "{}", body)?;
                if truncated {
                    writeln!(
                        buffer,
                        "We truncated the body because it was too large: {} bytes",
                        self.body.len(),
                    )?;
                    writeln!(
                        buffer,
                        "Increase this limit by setting `HTTPASSERT_BODY_PRINT_LIMIT`, or calling `MockServerBuilder::body_print_limit` when building your MockServer instance"
                    )?;
                }
                Ok(())
            }
            None => writeln!(
                buffer,
                "Body is likely binary (invalid utf-8) size is {} bytes",
                self.body.len()
            ),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_test(method: &str, path: &str) -> Request {
        let uri: Uri = path.parse().expect("valid test path");
        Request {
            url: format!("http://localhost{}", path)
                .parse()
                .expect("valid test url"),
            method: Method::from_bytes(method.as_bytes()).expect("valid test method"),
            headers: HeaderMap::new(),
            body: Vec::new(),
            path: decoded_path(&uri),
        }
    }
}

fn decoded_path(uri: &Uri) -> String {
    percent_decode_str(uri.path())
        .decode_utf8_lossy()
        .into_owned()
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_with_limit(f, BodyPrintLimit::Unlimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_truncated_when_printed() {
        let mut request = Request::for_test("POST", "/upload");
        request.body = "a".repeat(20).into_bytes();

        let mut printed = String::new();
        request
            .print_with_limit(&mut printed, BodyPrintLimit::Limited(5))
            .unwrap();

        assert!(printed.starts_with("POST http://localhost/upload\n"));
        assert!(printed.contains("\naaaaa\n"));
        assert!(printed.contains("too large: 20 bytes"));
    }

    #[test]
    fn the_path_is_percent_decoded() {
        let request = Request::for_test("GET", "/users/a%20b%2Fc?page=2");

        assert_eq!(request.path(), "/users/a b/c");
    }

    #[test]
    fn dot_segments_are_kept_in_the_path() {
        let request = Request::for_test("GET", "/x/../y");

        assert_eq!(request.path(), "/x/../y");
        assert_eq!(request.url.path(), "/y");
    }

    #[test]
    fn binary_bodies_are_not_printed() {
        let mut request = Request::for_test("PUT", "/blob");
        request.body = vec![0xff, 0xfe, 0xfd];

        let printed = request.to_string();

        assert!(printed.contains("Body is likely binary (invalid utf-8) size is 3 bytes"));
    }
}
