//! Blocking HTTP client backed by reqwest.

use reqwest::blocking::Client;
use std::time::Duration;
use tribun_store::{HttpClient, HttpResponse};

/// Sends store requests with a blocking reqwest client.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn put(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, String> {
        let mut request = self.client.put(url).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
