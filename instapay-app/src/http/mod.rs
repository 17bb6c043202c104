pub mod reqwest;

#[derive(Debug, Clone)]
pub struct CrossPlatformHttpClient {
    client: ::reqwest::Client,
}

impl Default for CrossPlatformHttpClient {
    fn default() -> Self {
        Self::new()
    }
}
