/// Apps Script webhook transport

use super::{Delivery, Transport};
use crate::errors::{HttpError, SendError};
use crate::http::{HttpClient, HttpRequest};
use crate::settings::WebhookTarget;
use log::{debug, warn};
use std::time::Duration;

pub struct WebhookTransport<'a, C> {
    http: &'a C,
    target: &'a WebhookTarget,
    timeout: Duration,
}

impl<'a, C: HttpClient> WebhookTransport<'a, C> {
    pub fn new(http: &'a C, target: &'a WebhookTarget, timeout: Duration) -> Self {
        WebhookTransport { http, target, timeout }
    }
}

impl<C: HttpClient> Transport for WebhookTransport<'_, C> {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn append(&self, payload: &str, _date_key: &str) -> Result<Delivery, SendError> {
        let mut request = HttpRequest::get(webhook_request_url(&self.target.url, payload));
        request.no_cors = true;
        request.include_credentials = true;
        request.timeout = Some(self.timeout);

        // The response is opaque, so any answer counts as delivered
        match self.http.send(request).await {
            Ok(_) => {
                debug!("Webhook accepted payload");
                Ok(Delivery::Confirmed)
            }
            Err(HttpError::Timeout) => {
                warn!(
                    "Webhook gave no answer within {:?}; assuming the row was written",
                    self.timeout
                );
                Ok(Delivery::Presumed)
            }
            Err(e) => Err(SendError::Network(e)),
        }
    }

    async fn count_rows_for(&self, _date_key: &str) -> Result<u64, SendError> {
        Err(SendError::Unsupported(self.name()))
    }
}

/// `{url}?data={payload}` with the payload percent-encoded
pub fn webhook_request_url(url: &str, payload: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}data={}", url, separator, urlencoding::encode(payload))
}
