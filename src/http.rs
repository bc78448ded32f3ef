use std::time::Duration;

use reqwest::Client;

/// Shared HTTP client for every adapter in a run.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("daily-pipelines/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
}
