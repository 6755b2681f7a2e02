use std::time::Duration;

use anyhow::Context as _;

use crate::error::{GlazeError, GlazeResult};

/// Build the shared fetch client. The timeout bounds the whole request so a
/// source that never sends bytes fails instead of hanging.
pub fn build_client(timeout: Duration) -> GlazeResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("glaze/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")?;
    Ok(client)
}

/// Fetch the source image bytes. Every failure mode (bad URL, DNS, timeout,
/// non-2xx status, truncated body) surfaces as an `Input` error; nothing is
/// retried.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> GlazeResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GlazeError::input(format!("image URL is invalid: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(GlazeError::input(format!(
            "image URL is invalid: upstream returned {status}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| GlazeError::input(format!("image URL is invalid: {e}")))?;
    tracing::debug!(url, len = bytes.len(), "fetched source image");
    Ok(bytes.to_vec())
}
