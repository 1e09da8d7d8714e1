use bytes::Bytes;
use http_body::Frame;
use http_body_util::{combinators::BoxBody, BodyExt, Full, StreamBody};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub type HandlerResponse = Response<BoxBody<Bytes, hyper::Error>>;

/// Items carried by a streaming response body.
pub type StreamFrame = Result<Frame<Bytes>, hyper::Error>;

pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response(status: StatusCode, body: &serde_json::Value) -> HandlerResponse {
    let body_bytes = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(full(body_bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

pub fn html_response(status: StatusCode, page: String) -> HandlerResponse {
    let mut response = Response::new(full(page));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

pub fn not_found() -> HandlerResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "not found" }),
    )
}

pub fn method_not_allowed(allow: &'static str) -> HandlerResponse {
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "method not allowed" }),
    );
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    response
}

/// One server-sent event: `data: <json>\n\n`.
pub fn sse_event<T: Serialize>(payload: &T) -> Bytes {
    let json = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string());
    Bytes::from(format!("data: {}\n\n", json))
}

/// A `text/event-stream` response whose body yields whatever frames arrive on
/// `frames` and ends when the sender is dropped.
pub fn sse_response(frames: mpsc::Receiver<StreamFrame>) -> HandlerResponse {
    let body = StreamBody::new(ReceiverStream::new(frames)).boxed();
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}
