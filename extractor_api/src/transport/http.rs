use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};

use super::api::{FetchMethod, FetchRequest, FetchResponse, Transport};

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        HttpTransport { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let is_head = request.method == FetchMethod::Head;
        let method = if is_head { Method::HEAD } else { Method::GET };

        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = if is_head {
            String::new()
        } else {
            response.text().await?
        };

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
