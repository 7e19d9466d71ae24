use std::env;
use std::sync::Arc;

use anyhow::Result;
use reqwest::header;
use serde::Deserialize;
use sys_locale::get_locale;
use tracing::debug;
use url::Url;

use crate::error::ExtractionError;
use crate::transport::{FetchRequest, FetchResponse, HttpTransport, Transport};

#[derive(Clone)]
pub struct ExtractionContext {
    pub transport: Arc<dyn Transport>,
    pub locales: Vec<String>,
}

impl ExtractionContext {
    pub fn new() -> Result<ExtractionContext> {
        let locale = get_locale()
            .filter(|l| l != "c" && l != "C")
            .unwrap_or_else(|| "en-US".to_string());

        let locales = if locale.len() > 2 {
            vec![locale.clone(), locale[0..2].to_string()]
        } else {
            vec![locale]
        };

        ExtractionContext::new_with_locale(locales)
    }

    pub fn new_with_locale(locales: Vec<String>) -> Result<ExtractionContext> {
        Ok(ExtractionContext {
            transport: Arc::new(HttpTransport::new(build_http(&locales)?)),
            locales,
        })
    }

    /// Context over a custom transport (e.g. [`crate::StubTransport`] in tests)
    pub fn with_transport(transport: Arc<dyn Transport>) -> ExtractionContext {
        ExtractionContext {
            transport,
            locales: vec!["en-US".to_string(), "en".to_string()],
        }
    }

    pub async fn send_request(
        &self,
        resource_name: &str,
        request: FetchRequest,
    ) -> Result<FetchResponse> {
        debug!("downloading {} ({:?} {})", resource_name, request.method, request.url);
        let url = request.url.to_string();
        let response =
            self.transport
                .fetch(request)
                .await
                .map_err(|e| ExtractionError::Fetch {
                    resource: resource_name.to_string(),
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
        if !response.is_success() {
            return Err(ExtractionError::Fetch {
                resource: resource_name.to_string(),
                url,
                reason: format!("HTTP status {}", response.status),
            }
            .into());
        }
        Ok(response)
    }

    pub async fn get_body(&self, resource_name: &str, url: &Url) -> Result<String> {
        Ok(self
            .send_request(resource_name, FetchRequest::get(url.clone()))
            .await?
            .body)
    }

    /// Downloads and decodes a JSON document.
    /// `transform` gets applied to the body before parsing (e.g. [`crate::utils::strip_jsonp`]).
    pub async fn get_json<A>(
        &self,
        resource_name: &str,
        url: &Url,
        transform: Option<fn(&str) -> &str>,
    ) -> Result<A>
    where
        A: for<'a> Deserialize<'a>,
    {
        let body = self.get_body(resource_name, url).await?;
        let source: &str = match transform {
            Some(transform) => transform(&body),
            None => &body,
        };
        serde_json::from_str(source)
            .map_err(|e| ExtractionError::malformed(resource_name, e).into())
    }

    /// Asks for the headers only, to learn what is behind the URL
    pub async fn probe(&self, resource_name: &str, url: &Url) -> Result<FetchResponse> {
        self.send_request(resource_name, FetchRequest::head(url.clone()))
            .await
    }
}

pub fn build_http(locales: &Vec<String>) -> Result<reqwest::Client> {
    build_http_with_proxy(locales, env::var("http_proxy").ok().as_deref())
}

/// Like [`build_http`], with the proxy given explicitly. Certificates are always verified.
pub fn build_http_with_proxy(
    locales: &Vec<String>,
    proxy: Option<&str>,
) -> Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_str(
            &locales
                .iter()
                .enumerate()
                .map(|(i, l)| {
                    if i != 0 {
                        format!("{l};q={}", 1.0 - (i as f32 / 10.0))
                    } else {
                        l.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
        )?,
    );

    let mut builder = reqwest::ClientBuilder::new()
        // default, probably overriden by extractors
        .user_agent("okhttp/4.9.3")
        .default_headers(headers)
        .cookie_store(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}
