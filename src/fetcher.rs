use reqwest::Client;
use tracing::debug;

use crate::utils::error::Result;

/// Plain HTTP GET for pages and images. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Returns the response body, or `AppError::Http` on a transport error or non-2xx status.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Fetching");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        debug!(url, bytes = body.len(), "Fetched");
        Ok(body.to_vec())
    }
}
