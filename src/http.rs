use reqwest::{Client, Response};

pub const USER_AGENT: &str = concat!("magplay/", env!("CARGO_PKG_VERSION"));

const MAX_ERROR_BODY: usize = 2048;

/// Build the connection pool shared by every API client
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// Read at most 2KB of an error response, trimmed
pub async fn error_body(response: Response) -> String {
    let bytes = response.bytes().await.unwrap_or_default();
    let end = bytes.len().min(MAX_ERROR_BODY);
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
