//! HTTP adapter for the enrichment service
//!
//! Implements [`EnrichmentService`] against the enrichment backend's two
//! delivery paths: a batched request/response call and an event-stream
//! endpoint carrying `data:`-framed JSON payloads terminated by a literal
//! `[DONE]` sentinel.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::domain::constants::enrichment::STREAM_DONE_SENTINEL;
use crate::domain::identifier::Identifier;
use crate::domain::preview::PreviewItem;
use crate::domain::services::{EnrichmentError, EnrichmentService, StreamEvent};
use crate::domain::session::TargetSpec;
use crate::infrastructure::http_client::HttpClient;

#[derive(Debug, Clone, Serialize)]
struct BatchEnrichRequest<'a> {
    target: &'a TargetSpec,
    identifiers: &'a [Identifier],
}

#[derive(Debug, Deserialize)]
struct BatchEnrichResponse {
    items: Vec<PreviewItem>,
}

/// Enrichment backend reachable over HTTP
pub struct HttpEnrichmentService {
    http: Arc<HttpClient>,
    base_url: Url,
}

impl HttpEnrichmentService {
    pub fn new(http: Arc<HttpClient>, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, EnrichmentError> {
        self.base_url
            .join(path)
            .map_err(|e| EnrichmentError::Protocol(format!("bad endpoint {path}: {e}")))
    }

    fn map_transport(error: reqwest::Error) -> EnrichmentError {
        EnrichmentError::Transport(error.to_string())
    }

    async fn check_status(response: Response) -> Result<Response, EnrichmentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(EnrichmentError::Status { status: status.as_u16(), message })
    }
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentService {
    async fn enrich_batch(
        &self,
        target: &TargetSpec,
        identifiers: &[Identifier],
    ) -> Result<Vec<PreviewItem>, EnrichmentError> {
        let url = self.endpoint("api/enrichment/batch")?;
        let request = BatchEnrichRequest { target, identifiers };

        let response = self
            .http
            .post_json(url.as_str(), &request)
            .await
            .map_err(Self::map_transport)?;
        let response = Self::check_status(response).await?;

        let parsed: BatchEnrichResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Protocol(e.to_string()))?;
        debug!(count = parsed.items.len(), "batch enrichment response parsed");
        Ok(parsed.items)
    }

    async fn open_stream(
        &self,
        target: &TargetSpec,
        identifiers: &[Identifier],
    ) -> Result<BoxStream<'static, Result<StreamEvent, EnrichmentError>>, EnrichmentError> {
        let mut url = self.endpoint("api/enrichment/stream")?;
        let ids = identifiers
            .iter()
            .map(Identifier::as_str)
            .collect::<Vec<_>>()
            .join(",");
        url.query_pairs_mut()
            .append_pair("marketplace", &target.marketplace)
            .append_pair("template", &target.template_id)
            .append_pair("ids", &ids);

        let response = self
            .http
            .get_event_stream(url.as_str())
            .await
            .map_err(Self::map_transport)?;
        let response = Self::check_status(response).await?;

        Ok(decode_event_stream(response))
    }
}

/// Decode a `data:`-framed event body into stream events.
///
/// Buffers raw bytes and splits on newlines (a chunk boundary can land in
/// the middle of a line or a UTF-8 sequence, so decoding happens per
/// complete line). Lines without a `data:` prefix are ignored.
fn decode_event_stream(
    response: Response,
) -> BoxStream<'static, Result<StreamEvent, EnrichmentError>> {
    let stream = async_stream::stream! {
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(error) => {
                    yield Err(EnrichmentError::Transport(error.to_string()));
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = match std::str::from_utf8(&line) {
                    Ok(line) => line.trim_end_matches(['\n', '\r']).to_string(),
                    Err(error) => {
                        yield Err(EnrichmentError::Protocol(format!("non-UTF8 event line: {error}")));
                        return;
                    }
                };
                let Some(payload) = line.strip_prefix("data:") else {
                    continue;
                };
                let payload = payload.trim();
                if payload.is_empty() {
                    continue;
                }
                if payload == STREAM_DONE_SENTINEL {
                    yield Ok(StreamEvent::Done);
                    return;
                }
                match serde_json::from_str::<StreamEvent>(payload) {
                    Ok(event) => yield Ok(event),
                    Err(error) => {
                        yield Err(EnrichmentError::Protocol(format!("bad event payload: {error}")));
                        return;
                    }
                }
            }
        }
        // body ended without the sentinel; the consumer treats stream end
        // as an interruption, nothing more to emit here
    };
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_event_payloads_parse() {
        let payload = r#"{"type":"item","item":{
            "id":"B00EXAMPLE",
            "identifier":"B00EXAMPLE",
            "derived_sku":"RL-B00EXAMPLE",
            "status":"ready",
            "source":null,
            "generated":{"fields":{"title":"T"},"custom_fields":{},
                "pricing":{"cost":1.0,"fees":0.2,"margin_rate":0.3,"list_price":1.56}},
            "warnings":[],
            "errors":[]
        }}"#;
        let event: StreamEvent = serde_json::from_str(payload).unwrap();
        match event {
            StreamEvent::Item { item } => {
                assert_eq!(item.id, "B00EXAMPLE");
                assert!(item.generated.is_some());
                assert!(item.edits.is_empty());
            }
            StreamEvent::Done => panic!("expected an item event"),
        }
    }
}
