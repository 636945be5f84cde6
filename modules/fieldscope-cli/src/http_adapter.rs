// A single generic ContentAdapter for every AdapterKind. The wire protocol
// of each real source (auth scheme, exact endpoint, response envelope) is
// out of scope here — adapters only need to satisfy
// `fetch(query) -> {results: [raw_item…]}`. This adapter honors that
// boundary: given a base URL template and an optional API key (both
// supplied per-connector via env vars), it issues one GET, expects a JSON
// array (or an object with a `results` array) in response, and wraps each
// element as a RawItem untouched. A real deployment would swap this out
// for per-source adapters with real auth/pagination/parsing — see
// DESIGN.md.

use async_trait::async_trait;
use fieldscope_engine::adapters::{ContentAdapter, RawBatch, RawItem};
use serde_json::Value;

pub struct HttpJsonAdapter {
    name: String,
    client: reqwest::Client,
    url_template: String,
    api_key_header: Option<(String, String)>,
}

impl HttpJsonAdapter {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            url_template: url_template.into(),
            api_key_header: None,
        }
    }

    pub fn with_api_key_header(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.api_key_header = Some((header.into(), value.into()));
        self
    }

    fn build_url(&self, query: &str) -> String {
        self.url_template
            .replace("{query}", &urlencoding_lite(query))
    }
}

/// Minimal percent-encoding for the single `{query}` substitution this
/// adapter performs; not a general-purpose URL encoder.
fn urlencoding_lite(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[async_trait]
impl ContentAdapter for HttpJsonAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &str) -> anyhow::Result<RawBatch> {
        let url = self.build_url(query);
        let mut request = self.client.get(&url);
        if let Some((header, value)) = &self.api_key_header {
            request = request.header(header, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned HTTP {status}", self.name);
        }

        let body: Value = response.json().await?;
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        Ok(RawBatch {
            results: items.into_iter().map(|payload| RawItem { payload }).collect(),
            context: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_substitutes_and_encodes_query() {
        let adapter = HttpJsonAdapter::new("serper", "https://example.test/search?q={query}");
        assert_eq!(
            adapter.build_url("padel near me"),
            "https://example.test/search?q=padel%20near%20me"
        );
    }
}
