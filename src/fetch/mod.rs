// src/fetch/mod.rs

pub mod zips;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{Error, Result};

/// A fully drained response body.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub body: Vec<u8>,
    /// `Last-Modified` as sent by the server. Informational only: it is not
    /// reliable across redirects and CDNs, so watermarks come from the data.
    pub last_modified: Option<DateTime<Utc>>,
    /// `Content-Type` header, used to pick the charset of text pages.
    pub content_type: Option<String>,
}

/// Blocking GET. One call, one round trip, no retries.
pub trait Transport {
    fn get(&self, url: &str) -> Result<Response>;
}

/// `reqwest` blocking client configured from [`Config`].
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = HttpClient::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &cfg.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| Error::Config(format!("proxy {proxy:?}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("building http client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self))]
    fn get(&self, url: &str) -> Result<Response> {
        let transport = |source| Error::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let last_modified = resp
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        // body is read to the end and the connection released before returning
        let body = resp.bytes().map_err(transport)?.to_vec();
        debug!(size = body.len(), ?last_modified, "fetched");

        Ok(Response {
            body,
            last_modified,
            content_type,
        })
    }
}

/// RFC 1123 dates as used in HTTP headers.
pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_http_date() {
        assert_eq!(
            parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_http_transport_builds_with_proxy() {
        let cfg = Config {
            proxy: Some("http://127.0.0.1:3128".into()),
            timeout_secs: Some(5),
            ..Config::default()
        };
        assert!(HttpTransport::new(&cfg).is_ok());
    }
}
