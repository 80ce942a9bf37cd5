/// Row delivery strategies: Sheets REST API (OAuth) or Apps Script webhook

pub mod sheets;
pub mod webhook;

use crate::errors::SendError;

pub use sheets::SheetsTransport;
pub use webhook::WebhookTransport;

/// How sure we are that the row landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The endpoint acknowledged the append
    Confirmed,
    /// No answer inside the timeout; assumed written
    Presumed,
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    fn name(&self) -> &'static str;

    /// Append one `[date_key, payload]` row
    async fn append(&self, payload: &str, date_key: &str) -> Result<Delivery, SendError>;

    /// Authoritative number of rows recorded under `date_key`
    async fn count_rows_for(&self, date_key: &str) -> Result<u64, SendError>;
}
