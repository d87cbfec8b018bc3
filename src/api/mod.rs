//! Konfuzio server operations.
//!
//! [`KonfuzioClient`] is built once from [`Settings`] and passed by reference
//! to everything that talks to the server. It owns the default session, so
//! there is no process-wide token: a different token means a different
//! client (see [`KonfuzioClient::with_token`]).
//!
//! Everything is generic over [`Transport`]. Reads go through the retrying
//! [`Fetcher`]; writes (POST, DELETE, uploads) are sent exactly once.

mod annotations;
mod documents;
mod labels;
mod projects;

pub use annotations::{select_annotations, select_confirmed_annotations, sort_by_start_offset};
pub use documents::{check_downloaded_file, select_dataset_documents, FileVariant};

use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::session::{HttpResponse, Session, Transport};
use crate::settings::Settings;
use crate::urls::Urls;

/// Tracing target for server operations.
pub const TRACING_TARGET: &str = "konfuzio_sdk::api";

/// Client for one Konfuzio host.
#[derive(Debug)]
pub struct KonfuzioClient<T = Session> {
    settings: Settings,
    urls: Urls,
    transport: T,
    fetcher: Fetcher,
}

impl KonfuzioClient<Session> {
    /// Create a client whose session uses the configured token.
    pub fn new(settings: Settings) -> Result<Self> {
        let session = Session::new(settings.token.as_deref())?;
        Ok(Self::with_transport(settings, session, Fetcher::default()))
    }

    /// Same host and configuration, authenticated with `token`.
    pub fn with_token(self, token: &str) -> Result<Self> {
        let settings = Settings {
            token: Some(token.to_string()),
            ..self.settings
        };
        let session = Session::new(Some(token))?;
        Ok(Self {
            urls: self.urls,
            settings,
            transport: session,
            fetcher: self.fetcher,
        })
    }

}

impl<T: Transport> KonfuzioClient<T> {
    pub fn with_transport(settings: Settings, transport: T, fetcher: Fetcher) -> Self {
        let urls = Urls::new(&settings.host);
        Self {
            settings,
            urls,
            transport,
            fetcher,
        }
    }

    /// The transport every request goes through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn urls(&self) -> &Urls {
        &self.urls
    }

    fn project_id(&self) -> Result<u64> {
        self.settings.require_project_id()
    }
}

/// Turn a non-2xx answer to a write into an error.
pub(crate) fn ensure_success(url: &str, response: HttpResponse) -> Result<HttpResponse> {
    let status = response.status;
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.detail();
    tracing::warn!(target: TRACING_TARGET, %url, %status, %detail, "Request failed");
    if (401..=403).contains(&status.as_u16()) {
        Err(Error::Authentication(detail))
    } else {
        Err(Error::Request {
            url: url.to_string(),
            status,
            detail,
        })
    }
}

/// Require one exact status, for endpoints that promise it (201, 204).
pub fn expect_status(url: &str, actual: StatusCode, expected: StatusCode) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedStatus {
            url: url.to_string(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::status_response;

    #[test]
    fn expect_status_rejects_other_codes() {
        assert!(expect_status("u", StatusCode::NO_CONTENT, StatusCode::NO_CONTENT).is_ok());
        let err = expect_status("u", StatusCode::OK, StatusCode::NO_CONTENT).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedStatus {
                expected: StatusCode::NO_CONTENT,
                actual: StatusCode::OK,
                ..
            }
        ));
    }

    #[test]
    fn ensure_success_classifies_failures() {
        assert!(ensure_success("u", status_response(201)).is_ok());
        assert!(ensure_success("u", status_response(403))
            .unwrap_err()
            .is_authentication());
        assert!(matches!(
            ensure_success("u", status_response(400)),
            Err(Error::Request { status: StatusCode::BAD_REQUEST, .. })
        ));
    }
}
