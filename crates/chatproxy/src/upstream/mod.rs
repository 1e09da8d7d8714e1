use async_trait::async_trait;
use common::configuration::Configuration;
use hfinference::{model_endpoint, InferenceError, InferenceOutput, TextGenerationRequest};
use opentelemetry::global;
use opentelemetry_http::HeaderInjector;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

/// Something that turns a prompt into display text for a given upstream
/// model. Implementations never fail: every problem becomes a message the
/// user can read.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, message: &str, model_id: &str) -> String;
}

/// Client for the hosted inference API. One POST per call, no retries.
pub struct InferenceClient {
    http_client: reqwest::Client,
    base_url: String,
    access_key: Option<String>,
}

impl InferenceClient {
    /// `http_client` carries the request timeout.
    pub fn new(http_client: reqwest::Client, base_url: String, access_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url,
            access_key,
        }
    }

    pub fn from_configuration(config: &Configuration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::new(
            http_client,
            config.inference.base_url.clone(),
            config.access_key().map(str::to_string),
        ))
    }

    pub async fn try_generate(
        &self,
        message: &str,
        model_id: &str,
    ) -> Result<InferenceOutput, InferenceError> {
        let url = model_endpoint(&self.base_url, model_id);
        let payload = TextGenerationRequest::new(message);

        debug!(url = %url, authenticated = self.access_key.is_some(), "sending inference request");
        let request_start_time = std::time::Instant::now();

        let response = self
            .http_client
            .post(&url)
            .headers(self.request_headers())
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport_error)?
            .error_for_status()
            .map_err(classify_transport_error)?;

        let body = response.bytes().await.map_err(classify_transport_error)?;

        let output = InferenceOutput::from_slice(&body).map_err(|err| {
            warn!(
                error = %err,
                body = %String::from_utf8_lossy(&body),
                "failed to parse inference response"
            );
            InferenceError::UnexpectedBody(err.to_string())
        })?;

        info!(
            model = %model_id,
            response_time_ms = request_start_time.elapsed().as_millis(),
            "inference call completed"
        );

        Ok(output)
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        if let Some(key) = &self.access_key {
            match HeaderValue::from_str(&format!("Bearer {}", key)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(err) => {
                    warn!(error = %err, "api key is not a valid header value, sending unauthenticated")
                }
            }
        }

        // Chain upstream spans to the current request span.
        global::get_text_map_propagator(|propagator| {
            let cx =
                tracing_opentelemetry::OpenTelemetrySpanExt::context(&tracing::Span::current());
            propagator.inject_context(&cx, &mut HeaderInjector(&mut headers));
        });

        headers
    }
}

#[async_trait]
impl TextGenerator for InferenceClient {
    async fn generate(&self, message: &str, model_id: &str) -> String {
        match self.try_generate(message, model_id).await {
            Ok(output) => output.into(),
            Err(err) => {
                warn!(model = %model_id, error = %err, "inference call failed");
                err.to_string()
            }
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfinference::apis::text_generation::MODEL_LOADING_MESSAGE;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn client_for(base_url: String, access_key: Option<&str>) -> InferenceClient {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        InferenceClient::new(http_client, base_url, access_key.map(str::to_string))
    }

    #[tokio::test]
    async fn test_generated_text_with_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/microsoft/phi-2")
            .match_header("authorization", "Bearer hf_test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "inputs": "hello",
                "parameters": {
                    "max_new_tokens": 512,
                    "do_sample": true,
                    "return_full_text": false
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"generated_text": "hi"}]"#)
            .create_async()
            .await;

        let client = client_for(server.url(), Some("hf_test"));
        assert_eq!(client.generate("hello", "microsoft/phi-2").await, "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_credential_sends_no_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/google/gemma-7b-it")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"generated_text": "anonymous"}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        assert_eq!(
            client.generate("hello", "google/gemma-7b-it").await,
            "anonymous"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_model_loading_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/tiiuae/falcon-7b-instruct")
            .with_status(200)
            .with_body(r#"{"error": "Model is currently loading", "estimated_time": 20.0}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        assert_eq!(
            client.generate("hello", "tiiuae/falcon-7b-instruct").await,
            MODEL_LOADING_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/microsoft/phi-2")
            .with_status(503)
            .with_body(r#"{"error": "Model is currently loading"}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        let err = client
            .try_generate("hello", "microsoft/phi-2")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)));
        assert!(err.to_string().starts_with("Error contacting the API: "));
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/microsoft/phi-2")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        let reply = client.generate("hello", "microsoft/phi-2").await;
        assert!(reply.starts_with("Unexpected error: "), "reply: {reply}");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr), None);
        let err = client
            .try_generate("hello", "microsoft/phi-2")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let client = InferenceClient::new(http_client, format!("http://{}", addr), None);

        assert_eq!(
            client.generate("hello", "microsoft/phi-2").await,
            "The request timed out. Please try again."
        );
    }
}
