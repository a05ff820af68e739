//! Release status lookup against the remote instance status endpoint.

use reqwest::Url;

use crate::error::EnrichmentError;
use crate::models::run::ReleaseInfo;

/// `GET` target for `instance_name` under `base_url`. The instance name is
/// percent-encoded as a single path segment.
pub fn status_url(base_url: &str, instance_name: &str) -> Result<Url, EnrichmentError> {
    let mut url =
        Url::parse(base_url).map_err(|e| EnrichmentError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| EnrichmentError::InvalidUrl(format!("{base_url}: not a base URL")))?
        .pop_if_empty()
        .extend(["v1", "instances", instance_name, "status"]);
    Ok(url)
}

/// Parse a status body into release metadata.
pub fn parse_release(body: &str) -> Result<ReleaseInfo, EnrichmentError> {
    serde_json::from_str::<ReleaseInfo>(body).map_err(|e| EnrichmentError::Parse(e.to_string()))
}

/// Fetch the current release for an instance. Any status >= 400 is an error.
pub async fn fetch_release(
    client: &reqwest::Client,
    url: Url,
) -> Result<ReleaseInfo, EnrichmentError> {
    let resp = client
        .get(url)
        .header("Accept", "application/json")
        .header("User-Agent", "logbatch")
        .send()
        .await?;

    let status = resp.status();
    if status.as_u16() >= 400 {
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!("Release status request failed: {} {}", status, body);
        return Err(EnrichmentError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let body = resp.text().await?;
    parse_release(&body)
}
