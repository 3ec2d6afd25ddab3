//! Shared request/response handling for provider adapters

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use usdc_types::{AdapterError, AdapterResult, ProviderConfig};

/// Send a request, mapping client timeouts to [`AdapterError::Timeout`]
pub(crate) async fn send(provider: &ProviderConfig, request: RequestBuilder) -> AdapterResult<Response> {
	request.send().await.map_err(|e| {
		if e.is_timeout() {
			AdapterError::Timeout {
				provider: provider.provider_id.clone(),
				timeout_ms: provider.timeout_ms,
			}
		} else {
			AdapterError::Http(e)
		}
	})
}

/// Parse a 2xx JSON body; any other status becomes a provider error with a body snippet
pub(crate) async fn read_json<T: DeserializeOwned>(
	provider: &ProviderConfig,
	response: Response,
) -> AdapterResult<T> {
	let status = response.status();
	let body = response.text().await.map_err(AdapterError::Http)?;
	if !status.is_success() {
		return Err(AdapterError::provider(
			&provider.provider_id,
			status.as_u16(),
			&body,
		));
	}
	serde_json::from_str(&body).map_err(|e| {
		AdapterError::invalid_response(&provider.provider_id, format!("{}", e))
	})
}

/// Like [`read_json`] but treats 404 as "no data"
pub(crate) async fn read_optional_json<T: DeserializeOwned>(
	provider: &ProviderConfig,
	response: Response,
) -> AdapterResult<Option<T>> {
	if response.status() == StatusCode::NOT_FOUND {
		return Ok(None);
	}
	read_json(provider, response).await.map(Some)
}
