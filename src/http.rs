//! REST backend over HTTP/JSON.
//!
//! Thin `reqwest` wrapper for the notes and tags endpoints. Status handling and
//! body parsing live in pure functions so they can be tested without a server.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | list | `GET {base}/notes/?q=&tags=1,2&importance=&locked=` |
//! | create | `POST {base}/notes/` |
//! | update | `PATCH {base}/notes/{id}/` |
//! | delete | `DELETE {base}/notes/{id}/` |
//! | tags | `GET`/`POST {base}/tags/`, `DELETE {base}/tags/{id}/` |

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{BackendError, NoteBackend, NoteFilter, TagBackend};
use crate::config::BackendConfig;
use crate::doc::{Note, NoteDraft, NoteId, NotePatch, Tag, TagId};

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), token: config.token.clone() })
    }

    fn url(&self, path: &str) -> String {
        endpoint(&self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send `req` and return the status and body text.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<(u16, String), BackendError> {
        let response = self.authorize(req).send().await.map_err(|e| BackendError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| BackendError::Request(e.to_string()))?;
        Ok((status, text))
    }

    async fn fetch<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, BackendError> {
        let (status, text) = self.send(req).await?;
        parse_body(status, &text)
    }

    async fn discard(&self, req: reqwest::RequestBuilder) -> Result<(), BackendError> {
        let (status, text) = self.send(req).await?;
        check_status(status, text)
    }
}

#[async_trait::async_trait]
impl NoteBackend for HttpBackend {
    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, BackendError> {
        let query = filter.query_pairs();
        debug!(?query, "listing notes");
        let (status, text) = self.send(self.http.get(self.url("notes/")).query(&query)).await?;
        parse_listing(status, &text)
    }

    async fn create(&self, draft: &NoteDraft) -> Result<Note, BackendError> {
        self.fetch(self.http.post(self.url("notes/")).json(draft)).await
    }

    async fn update(&self, id: NoteId, patch: &NotePatch) -> Result<Note, BackendError> {
        self.fetch(self.http.patch(self.url(&format!("notes/{id}/"))).json(patch)).await
    }

    async fn delete(&self, id: NoteId) -> Result<(), BackendError> {
        self.discard(self.http.delete(self.url(&format!("notes/{id}/")))).await
    }
}

#[async_trait::async_trait]
impl TagBackend for HttpBackend {
    async fn list_tags(&self) -> Result<Vec<Tag>, BackendError> {
        let (status, text) = self.send(self.http.get(self.url("tags/"))).await?;
        parse_listing(status, &text)
    }

    async fn create_tag(&self, name: &str, color: &str) -> Result<Tag, BackendError> {
        let body = TagDraft { name, color };
        self.fetch(self.http.post(self.url("tags/")).json(&body)).await
    }

    async fn delete_tag(&self, id: TagId) -> Result<(), BackendError> {
        self.discard(self.http.delete(self.url(&format!("tags/{id}/")))).await
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct TagDraft<'a> {
    name: &'a str,
    color: &'a str,
}

/// Some deployments wrap list responses in a paginated envelope.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

// =============================================================================
// PARSING
// =============================================================================

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn check_status(status: u16, body: String) -> Result<(), BackendError> {
    if (200..300).contains(&status) { Ok(()) } else { Err(BackendError::Status { status, body }) }
}

fn parse_body<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, BackendError> {
    check_status(status, text.to_owned())?;
    serde_json::from_str(text).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Decode a list body, accepting either a bare array or a `{"results": [...]}` page.
fn parse_listing<T: DeserializeOwned>(status: u16, text: &str) -> Result<Vec<T>, BackendError> {
    match parse_body::<Listing<T>>(status, text)? {
        Listing::Plain(items) | Listing::Paged { results: items } => Ok(items),
    }
}
