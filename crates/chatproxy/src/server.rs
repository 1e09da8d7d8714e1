use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use common::consts::{CHAT_PATH, CHAT_STREAM_PATH, INDEX_PATH, MODELS_PATH};
use futures::FutureExt;
use http_body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use opentelemetry::global;
use opentelemetry::trace::FutureExt as _;
use opentelemetry_http::HeaderExtractor;
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app_state::AppState;
use crate::handlers::chat::chat;
use crate::handlers::chat_stream::chat_stream;
use crate::handlers::errors::{describe_panic, ChatProxyError};
use crate::handlers::index::index;
use crate::handlers::models::list_models;
use crate::handlers::request::extract_request_id;
use crate::handlers::response::{method_not_allowed, not_found, HandlerResponse};

/// Route an incoming HTTP request to the appropriate handler.
///
/// Handler errors become the JSON error envelope. A panic anywhere in a
/// handler is caught here and reported as a `500` so the connection still
/// gets an answer.
pub async fn route<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<HandlerResponse, hyper::Error>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let parent_cx = global::get_text_map_propagator(|p| p.extract(&HeaderExtractor(req.headers())));
    let request_id = extract_request_id(&req);

    let request_span = info_span!(
        "request",
        request_id = %request_id,
        http.method = %req.method(),
        http.path = %req.uri().path(),
        llm.model = tracing::field::Empty,
    );

    let handled = AssertUnwindSafe(dispatch(req, state))
        .catch_unwind()
        .instrument(request_span.clone())
        .with_context(parent_cx)
        .await;

    let _entered = request_span.enter();
    let response = match handled {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(error = %err, status = %err.status_code(), "request rejected");
            err.into_response()
        }
        Err(panic) => {
            let reason = describe_panic(panic.as_ref());
            error!(reason = %reason, "handler panicked");
            ChatProxyError::Internal(reason).into_response()
        }
    };

    debug!(status = %response.status(), "response ready");
    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: Arc<AppState>) -> Result<HandlerResponse, ChatProxyError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::GET, INDEX_PATH) => index(&state),
        (&Method::GET, MODELS_PATH) => Ok(list_models(&state)),
        (&Method::POST, CHAT_PATH) => chat(req, state).await,
        (&Method::POST, CHAT_STREAM_PATH) => chat_stream(req, state).await,
        (_, INDEX_PATH | MODELS_PATH) => Ok(method_not_allowed("GET")),
        (_, CHAT_PATH | CHAT_STREAM_PATH) => Ok(method_not_allowed("POST")),
        _ => {
            debug!(method = %method, path = %path, "no route found");
            Ok(not_found())
        }
    }
}

/// Accept connections and spawn a task per connection until `shutdown`
/// resolves. In-flight connections are left to finish on their own.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()>,
{
    info!(address = %listener.local_addr()?, "server listening");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::task::spawn(async move {
                    debug!(peer = ?peer_addr, "accepted connection");

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { route(req, state).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        warn!(error = ?err, "error serving connection");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("received shutdown signal, stopping server");
                break;
            }
        }
    }

    Ok(())
}
