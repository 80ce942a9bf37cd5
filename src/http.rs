/// Minimal HTTP seam over the browser's fetch

use crate::errors::HttpError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Opaque cross-origin request (`mode: "no-cors"`)
    pub no_cors: bool,
    /// Send cookies along (`credentials: "include"`)
    pub include_credentials: bool,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            no_cors: false,
            include_credentials: false,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: String) -> HttpRequest {
        HttpRequest {
            method: Method::Post,
            body: Some(body),
            ..HttpRequest::get(url)
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> HttpRequest {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &str) -> HttpRequest {
        self.header("Authorization", &format!("Bearer {}", token))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// 0 for opaque (no-cors) responses
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[allow(async_fn_in_trait)]
pub trait HttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}
