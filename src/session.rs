//! Authenticated HTTP sessions.
//!
//! A [`Session`] is a blocking reqwest client that sends
//! `Authorization: Token <value>` on every request and keeps a cookie store
//! (the annotation form endpoint needs the CSRF cookie of the host page).
//!
//! Every request goes through the [`Transport`] trait: reads as plain GET or
//! HEAD, writes as a described [`Request`]. Tests drive the whole client
//! with a scripted transport.

use std::sync::Arc;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, REFERER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Tracing target for session handling.
pub const TRACING_TARGET: &str = "konfuzio_sdk::session";

/// Name of the cookie Django uses for the CSRF token.
const CSRF_COOKIE: &str = "csrftoken";

/// Longest body excerpt used as an error detail when the server sends no JSON.
const DETAIL_EXCERPT: usize = 200;

/// A fully read HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response without a content type.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Set the `Content-Type` the response claims.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Read a blocking reqwest response to the end.
    pub fn read(response: Response) -> Result<Self> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes()?.to_vec();
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Mime type without parameters, lowercased (`text/html; charset=utf-8` -> `text/html`).
    pub fn mime_essence(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// The server's explanation of a failure.
    ///
    /// Django REST framework puts it under `detail`; anything else falls back
    /// to a short excerpt of the body, then to the status reason.
    pub fn detail(&self) -> String {
        if let Ok(serde_json::Value::Object(map)) =
            serde_json::from_slice::<serde_json::Value>(&self.body)
        {
            match map.get("detail") {
                Some(serde_json::Value::String(detail)) => return detail.clone(),
                Some(other) => return other.to_string(),
                None => {}
            }
        }
        let text = self.text();
        let text = text.trim();
        if text.is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or("no detail")
                .to_string()
        } else {
            text.chars().take(DETAIL_EXCERPT).collect()
        }
    }
}

/// Body of a write request.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// Text fields plus one file part.
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

/// File attached to a multipart request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// A request that changes state on the server. Sent once, never retried.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub referer: Option<String>,
    pub body: Body,
}

impl Request {
    pub fn post(url: impl Into<String>, body: Body) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            referer: None,
            body,
        }
    }

    pub fn delete(url: impl Into<String>, body: Body) -> Self {
        Self {
            method: Method::DELETE,
            url: url.into(),
            referer: None,
            body,
        }
    }

    /// Django checks the referer of form posts made over HTTPS.
    pub fn with_referer(mut self, referer: &str) -> Self {
        self.referer = Some(referer.to_string());
        self
    }
}

/// Flatten a JSON object into form pairs. Nulls are left out.
pub fn form_fields(value: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Executes requests against the server.
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse>;

    fn head(&self, url: &str) -> Result<HttpResponse>;

    fn send(&self, request: Request) -> Result<HttpResponse>;

    /// CSRF token for the form endpoints of `host`.
    fn csrf_token(&self, host: &str) -> Result<String>;
}

/// Blocking HTTP session carrying the `Authorization: Token` header.
#[derive(Clone)]
pub struct Session {
    client: Client,
    cookies: Arc<Jar>,
    authenticated: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session. The token is not validated here; a bad token only
    /// shows up as an authentication error on the first request.
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Token {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            tracing::debug!(target: TRACING_TARGET, "Creating session without token");
        }

        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            client,
            cookies,
            authenticated: token.is_some(),
        })
    }

    /// Whether requests carry an Authorization header.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Value of the CSRF cookie in a `Cookie` header (`a=1; csrftoken=xyz`).
fn csrf_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// CSRF token already held by a cookie jar for `url`.
fn stored_csrf_token(jar: &Jar, url: &url::Url) -> Option<String> {
    let header = jar.cookies(url)?;
    csrf_from_cookie_header(header.to_str().ok()?)
}

impl Transport for Session {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::trace!(target: TRACING_TARGET, %url, "GET");
        HttpResponse::read(self.client.get(url).send()?)
    }

    fn head(&self, url: &str) -> Result<HttpResponse> {
        tracing::trace!(target: TRACING_TARGET, %url, "HEAD");
        HttpResponse::read(self.client.head(url).send()?)
    }

    fn send(&self, request: Request) -> Result<HttpResponse> {
        tracing::trace!(target: TRACING_TARGET, method = %request.method, url = %request.url, "Sending");
        let mut builder = self.client.request(request.method, &request.url);
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer.as_str());
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(fields) => builder.form(&fields),
            Body::Multipart { fields, file } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                let part = Part::bytes(file.data)
                    .file_name(file.file_name)
                    .mime_str("application/octet-stream")?;
                builder.multipart(form.part(file.field, part))
            }
        };
        HttpResponse::read(builder.send()?)
    }

    /// Read the token from the cookie the host page sets. If the page sets
    /// none because the jar already holds one, use the stored cookie.
    fn csrf_token(&self, host: &str) -> Result<String> {
        let login = self.client.get(host).send()?;
        let fresh = login
            .cookies()
            .find(|cookie| cookie.name() == CSRF_COOKIE)
            .map(|cookie| cookie.value().to_string());
        let token = match fresh {
            Some(token) => Some(token),
            None => stored_csrf_token(&self.cookies, &url::Url::parse(host)?),
        };
        token.ok_or_else(|| Error::MissingCsrfToken(host.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_json_field() {
        let response = HttpResponse::new(StatusCode::UNAUTHORIZED, r#"{"detail":"bad token"}"#);
        assert_eq!(response.detail(), "bad token");
    }

    #[test]
    fn detail_falls_back_to_body_then_reason() {
        let html = HttpResponse::new(StatusCode::BAD_GATEWAY, "<h1>Bad Gateway</h1>");
        assert_eq!(html.detail(), "<h1>Bad Gateway</h1>");

        let empty = HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(empty.detail(), "Service Unavailable");
    }

    #[test]
    fn mime_essence_strips_parameters() {
        let response =
            HttpResponse::new(StatusCode::OK, "").with_content_type("Text/HTML; charset=utf-8");
        assert_eq!(response.mime_essence().as_deref(), Some("text/html"));
    }

    #[test]
    fn session_builds_with_and_without_token() {
        assert!(Session::new(Some("abc")).unwrap().is_authenticated());
        assert!(!Session::new(None).unwrap().is_authenticated());
    }

    #[test]
    fn stored_csrf_cookie_is_found_in_jar() {
        let jar = Jar::default();
        let url = url::Url::parse("https://app.konfuzio.com/").unwrap();
        assert_eq!(stored_csrf_token(&jar, &url), None);

        jar.add_cookie_str("sessionid=s1; Path=/", &url);
        jar.add_cookie_str("csrftoken=abc123; Path=/", &url);
        assert_eq!(stored_csrf_token(&jar, &url).as_deref(), Some("abc123"));

        let other = url::Url::parse("https://other.example.com/").unwrap();
        assert_eq!(stored_csrf_token(&jar, &other), None);
    }

    #[test]
    fn csrf_cookie_is_matched_by_exact_name() {
        assert_eq!(
            csrf_from_cookie_header("xcsrftoken=no; csrftoken=yes").as_deref(),
            Some("yes")
        );
        assert_eq!(csrf_from_cookie_header("sessionid=s1"), None);
    }

    #[test]
    fn form_fields_stringify_values_and_skip_nulls() {
        let fields = form_fields(&serde_json::json!({
            "start_offset": 3,
            "label": "7",
            "revised": false,
            "accuracy": null
        }));
        assert!(fields.contains(&("start_offset".to_string(), "3".to_string())));
        assert!(fields.contains(&("label".to_string(), "7".to_string())));
        assert!(fields.contains(&("revised".to_string(), "false".to_string())));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn token_with_newline_is_rejected() {
        assert!(matches!(
            Session::new(Some("bad\ntoken")),
            Err(Error::InvalidHeader(_))
        ));
    }
}
