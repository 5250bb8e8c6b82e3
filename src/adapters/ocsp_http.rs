//! OCSP HTTP client adapter.
//! POSTs DER-encoded OCSP requests to responder URLs and returns the raw
//! response body for wire-level parsing.

use std::time::Duration;

use crate::infra::error::{ProcessorError, ProcessorResult};

/// HTTP adapter performing OCSP POST exchanges
pub struct OcspHttpClient {
    http: reqwest::Client,
}

impl OcspHttpClient {
    /// Create a new client with the given per-request timeout
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("einvoice-processor/1.0")
            .build()
            .expect("reqwest client build");
        Self { http }
    }

    /// POST a DER request to a responder and return the response body
    pub async fn post_request(&self, url: &str, request_der: &[u8]) -> ProcessorResult<Vec<u8>> {
        let resp = self
            .http
            .post(url)
            .header("Content-Type", "application/ocsp-request")
            .header("Accept", "application/ocsp-response")
            .body(request_der.to_vec())
            .send()
            .await
            .map_err(|e| ProcessorError::OcspUnavailable(format!("HTTP error: {e}")))?;

        if !resp.status().is_success() {
            return Err(ProcessorError::OcspUnavailable(format!(
                "HTTP {} from {url}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ProcessorError::OcspUnavailable(format!("read body failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

impl Default for OcspHttpClient {
    fn default() -> Self {
        Self::new(crate::trust::ocsp::DEFAULT_OCSP_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_responder_is_an_ocsp_error() {
        let client = OcspHttpClient::new(Duration::from_millis(200));
        let err = client
            .post_request("http://127.0.0.1:9/status", &[0x30, 0x03, 0x30, 0x01, 0x00])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "OCSP_UNAVAILABLE");
    }
}
