use serde::{Deserialize, Serialize};

pub use tinylink_shortener::MappingSummary;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchShortenItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// `short_url` is empty when the item could not be shortened.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchShortenResult {
    pub correlation_id: String,
    pub short_url: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub urls: u64,
    pub users: u64,
}
