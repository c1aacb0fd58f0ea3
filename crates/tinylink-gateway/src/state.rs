use ipnet::IpNet;
use std::sync::Arc;

use tinylink_core::{ShortCode, Shortener};

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    base_url: String,
    trusted_subnet: Option<IpNet>,
}

impl AppState {
    pub fn new(shortener: Arc<dyn Shortener>, public_base_url: impl Into<String>) -> Self {
        Self {
            shortener,
            base_url: public_base_url.into(),
            trusted_subnet: None,
        }
    }

    /// Opens the internal endpoints to clients inside `subnet`.
    pub fn with_trusted_subnet(mut self, subnet: IpNet) -> Self {
        self.trusted_subnet = Some(subnet);
        self
    }

    pub fn trusted_subnet(&self) -> Option<&IpNet> {
        self.trusted_subnet.as_ref()
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Renders the public short link for `code`.
    pub fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }
}
