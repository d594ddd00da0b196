//! C2 Upstream Clients (spec §4.2).
//!
//! Treated by spec §1 as an external collaborator: the core only consumes
//! the `MusicBrainzClient` / `BandsintownClient` interfaces below. These
//! `reqwest`-based HTTP implementations exist so the workspace is runnable
//! end to end: stable headers, a per-call timeout, and a single
//! error-mapping helper.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use ac_domain::error::{Error, ErrorSource, Result};

use crate::raw::{RawAct, RawEvent};

#[async_trait]
pub trait MusicBrainzClient: Send + Sync {
    /// Returns the raw provider-side act blob, or fails tagged
    /// `musicbrainz`.
    async fn fetch_act(&self, id: &str) -> Result<RawAct>;
}

#[async_trait]
pub trait BandsintownClient: Send + Sync {
    /// Fetches an HTML page and returns the embedded JSON-LD event blobs.
    /// Returns an empty sequence on parse failure; fails tagged
    /// `bandsintown` only on transport failure (spec §4.2).
    async fn fetch_events(&self, url: &str) -> Result<Vec<RawEvent>>;
}

fn build_http_client(user_agent: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().user_agent(user_agent.to_owned()).timeout(timeout).build()
}

fn from_reqwest(source: ErrorSource, e: reqwest::Error) -> Error {
    Error::upstream(source, e.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MusicBrainz
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HttpMusicBrainzClient {
    http: Client,
    base_url: String,
}

impl HttpMusicBrainzClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = build_http_client(user_agent, timeout)
            .map_err(|e| Error::Misconfiguration(format!("building MusicBrainz client: {e}")))?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl MusicBrainzClient for HttpMusicBrainzClient {
    async fn fetch_act(&self, id: &str) -> Result<RawAct> {
        let url = format!("{}/artist/{}?fmt=json&inc=url-rels", self.base_url, id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| from_reqwest(ErrorSource::Musicbrainz, e))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(
                ErrorSource::Musicbrainz,
                format!("musicbrainz returned {}", resp.status()),
            ));
        }

        let body = resp.text().await.map_err(|e| from_reqwest(ErrorSource::Musicbrainz, e))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::upstream(ErrorSource::Musicbrainz, format!("parsing act {id}: {e}")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bandsintown
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HttpBandsintownClient {
    http: Client,
    ld_json_re: Regex,
}

impl HttpBandsintownClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = build_http_client(user_agent, timeout)
            .map_err(|e| Error::Misconfiguration(format!("building Bandsintown client: {e}")))?;
        let ld_json_re = Regex::new(
            r#"(?is)<script[^>]+type=["']application/ld\+json["'][^>]*>(.*?)</script>"#,
        )
        .expect("static regex is valid");
        Ok(Self { http, ld_json_re })
    }

    /// Pull every embedded JSON-LD block out of an HTML page and keep the
    /// `MusicEvent` entries. Any block that fails to parse is skipped —
    /// the whole call only errors on transport failure (spec §4.2).
    fn extract_events(&self, html: &str) -> Vec<RawEvent> {
        let mut events = Vec::new();
        for cap in self.ld_json_re.captures_iter(html) {
            let blob = cap[1].trim();
            let value: serde_json::Value = match serde_json::from_str(blob) {
                Ok(v) => v,
                Err(_) => continue,
            };
            collect_music_events(&value, &mut events);
        }
        events
    }
}

fn collect_music_events(value: &serde_json::Value, out: &mut Vec<RawEvent>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_music_events(item, out);
            }
        }
        serde_json::Value::Object(_) => {
            let is_music_event = value
                .get("@type")
                .and_then(|t| t.as_str())
                .map(|t| t.eq_ignore_ascii_case("MusicEvent"))
                .unwrap_or(false);
            if is_music_event {
                if let Ok(event) = serde_json::from_value::<RawEvent>(value.clone()) {
                    out.push(event);
                }
            }
        }
        _ => {}
    }
}

#[async_trait]
impl BandsintownClient for HttpBandsintownClient {
    async fn fetch_events(&self, url: &str) -> Result<Vec<RawEvent>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| from_reqwest(ErrorSource::Bandsintown, e))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(
                ErrorSource::Bandsintown,
                format!("bandsintown returned {}", resp.status()),
            ));
        }

        let html = resp.text().await.map_err(|e| from_reqwest(ErrorSource::Bandsintown, e))?;
        Ok(self.extract_events(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_act_parses_a_successful_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/artist/abc?fmt=json&inc=url-rels")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"abc","name":"Test Band","country":"DE","life-span":{"ended":false},"relations":[]}"#,
            )
            .create_async()
            .await;

        let client = HttpMusicBrainzClient::new(server.url(), "act-cache/test", Duration::from_secs(5)).unwrap();
        let act = client.fetch_act("abc").await.unwrap();
        assert_eq!(act.name, "Test Band");
        assert_eq!(act.country.as_deref(), Some("DE"));
    }

    #[tokio::test]
    async fn fetch_act_tags_transport_errors_as_musicbrainz() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/artist/abc?fmt=json&inc=url-rels").with_status(500).create_async().await;

        let client = HttpMusicBrainzClient::new(server.url(), "act-cache/test", Duration::from_secs(5)).unwrap();
        let err = client.fetch_act("abc").await.unwrap_err();
        assert_eq!(err.source_kind(), ErrorSource::Musicbrainz);
    }

    #[tokio::test]
    async fn fetch_events_extracts_music_events_from_ld_json() {
        let mut server = mockito::Server::new_async().await;
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@type":"MusicEvent","name":"Show","startDate":"2099-01-01"}
            </script>
            </head></html>"#;
        let _m = server.mock("GET", "/a/123").with_status(200).with_body(html).create_async().await;

        let client = HttpBandsintownClient::new("act-cache/test", Duration::from_secs(5)).unwrap();
        let events = client.fetch_events(&format!("{}/a/123", server.url())).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name.as_deref(), Some("Show"));
    }

    #[tokio::test]
    async fn fetch_events_returns_empty_on_no_ld_json_blocks() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/a/123").with_status(200).with_body("<html></html>").create_async().await;

        let client = HttpBandsintownClient::new("act-cache/test", Duration::from_secs(5)).unwrap();
        let events = client.fetch_events(&format!("{}/a/123", server.url())).await.unwrap();
        assert!(events.is_empty());
    }
}
