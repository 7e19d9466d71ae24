use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

#[async_trait]
/// Trait for getting resources over the network.
/// The trait does not interpret the responses (status codes, decoding),
/// this is done by ExtractionContext, which is a wrapper over it.
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FetchMethod {
    Get,
    /// Only the headers are of interest
    Head,
}

#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        FetchRequest {
            method: FetchMethod::Get,
            url,
            headers: vec![],
        }
    }

    pub fn head(url: Url) -> Self {
        FetchRequest {
            method: FetchMethod::Head,
            url,
            headers: vec![],
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Clone, Default, Debug)]
pub struct FetchResponse {
    pub status: u16,
    /// header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: &str) -> Self {
        FetchResponse {
            status: 200,
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
