// src/collect/providers/mod.rs
pub mod arxiv;
pub mod rss;

use std::time::Duration;

use crate::retry::FetchError;

/// GET a text body with a per-call timeout, classifying failures.
pub(crate) async fn http_get_text(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<String, FetchError> {
    let rsp = client
        .get(url)
        .query(query)
        .timeout(timeout)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;
    let rsp = rsp.error_for_status().map_err(FetchError::from_reqwest)?;
    rsp.text().await.map_err(FetchError::from_reqwest)
}
