use crate::mock_server::bare_server::MockServerState;
use crate::mock_server::DynError;
use crate::ResponseTemplate;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::error;
use std::convert::Infallible;
use std::sync::Arc;

/// The actual HTTP server routing incoming requests to the expectations of `server_state`.
///
/// Every connection is served on its own task, and every request is routed on the blocking
/// pool: a responder that blocks only holds up its own request. The accept loop stops when
/// `shutdown_signal` resolves, either because it was triggered or because the sender was
/// dropped.
pub(super) async fn run_server(
    listener: std::net::TcpListener,
    server_state: Arc<MockServerState>,
    mut shutdown_signal: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), DynError> {
    listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(listener)?;

    let request_handler = move |request: hyper::Request<hyper::body::Incoming>| {
        let server_state = server_state.clone();
        async move {
            let request = match crate::Request::from_hyper(request).await {
                Ok(request) => request,
                Err(e) => {
                    error!("Failed to read an incoming request: {}", e);
                    return Ok::<hyper::Response<Full<Bytes>>, Infallible>(
                        ResponseTemplate::new(400).generate_response(),
                    );
                }
            };

            let response_template = match tokio::task::spawn_blocking(move || {
                server_state.handle_request(&request)
            })
            .await
            {
                Ok(response_template) => response_template,
                Err(e) => {
                    error!("Failed to route an incoming request: {}", e);
                    ResponseTemplate::new(500)
                }
            };

            // Wait outside of the routing logic: no lock is held while we sleep.
            if let Some(delay) = response_template.delay() {
                tokio::time::sleep(delay).await;
            }

            Ok::<hyper::Response<Full<Bytes>>, Infallible>(response_template.generate_response())
        }
    };

    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Failed to accept a connection: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown_signal => break,
        };

        let request_handler = request_handler.clone();
        tokio::task::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(TokioIo::new(stream), service_fn(request_handler))
                .await
            {
                error!("Failed to serve an incoming connection: {}", e);
            }
        });
    }

    Ok(())
}
