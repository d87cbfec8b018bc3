//! In-memory doubles for the transport and sleeper.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fetch::Sleeper;
use crate::session::{HttpResponse, Request, Transport};

pub fn status_response(status: u16) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(status).unwrap(), Vec::new())
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(
        StatusCode::from_u16(status).unwrap(),
        serde_json::to_vec(&body).unwrap(),
    )
    .with_content_type("application/json")
}

/// Answers requests from a fixed script, recording every url asked for
/// and every write sent. Once the script is used up every request fails
/// like a dropped connection.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    calls: RefCell<Vec<String>>,
    sent: RefCell<Vec<Request>>,
    csrf_token: Option<String>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            ..Self::default()
        }
    }

    /// Hand out `token` when a CSRF token is asked for.
    pub fn with_csrf_token(mut self, token: &str) -> Self {
        self.csrf_token = Some(token.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.borrow().clone()
    }

    fn next(&self, url: &str) -> Result<HttpResponse> {
        self.calls.borrow_mut().push(url.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::Io(std::io::ErrorKind::ConnectionReset.into()))
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        self.next(url)
    }

    fn head(&self, url: &str) -> Result<HttpResponse> {
        self.next(url)
    }

    fn send(&self, request: Request) -> Result<HttpResponse> {
        let response = self.next(&request.url);
        self.sent.borrow_mut().push(request);
        response
    }

    fn csrf_token(&self, host: &str) -> Result<String> {
        self.calls.borrow_mut().push(host.to_string());
        self.csrf_token
            .clone()
            .ok_or_else(|| Error::MissingCsrfToken(host.to_string()))
    }
}

/// Records requested sleeps instead of sleeping.
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    slept: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn count(&self) -> usize {
        self.slept.borrow().len()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}
