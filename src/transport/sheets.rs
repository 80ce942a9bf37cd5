/// Google Sheets REST transport

use super::{Delivery, Transport};
use crate::auth::{AuthSession, TokenProvider};
use crate::errors::SendError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::settings::SheetTarget;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Value, json};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub struct SheetsTransport<'a, C, P> {
    http: &'a C,
    auth: &'a AuthSession<P>,
    target: &'a SheetTarget,
    scan_rows: usize,
}

impl<'a, C, P> SheetsTransport<'a, C, P>
where
    C: HttpClient,
    P: TokenProvider,
{
    pub fn new(http: &'a C, auth: &'a AuthSession<P>, target: &'a SheetTarget, scan_rows: usize) -> Self {
        SheetsTransport {
            http,
            auth,
            target,
            scan_rows,
        }
    }

    async fn try_append(&self, payload: &str, date_key: &str) -> Result<Delivery, SendError> {
        let token = self.auth.token(true).await?;
        let body = json!({ "values": [[date_key, hyperlink_formula(payload)]] }).to_string();
        let request = HttpRequest::post(append_url(self.target), body)
            .bearer(&token)
            .header("Content-Type", "application/json");

        let response = self.http.send(request).await?;
        if response.is_success() {
            debug!("Row appended to sheet {}", self.target.sheet_id);
            Ok(Delivery::Confirmed)
        } else {
            Err(http_failure(&response))
        }
    }

    async fn try_count(&self, date_key: &str) -> Result<u64, SendError> {
        let token = self.auth.token(false).await?;
        let request = HttpRequest::get(values_url(self.target)).bearer(&token);

        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(http_failure(&response));
        }

        let range: ValueRange = serde_json::from_str(&response.body).map_err(|e| SendError::Http {
            status: response.status,
            message: format!("unreadable values response: {}", e),
        })?;
        Ok(count_trailing_matches(&range.values, date_key, self.scan_rows))
    }

    async fn drop_token_on_auth_failure(&self, error: &SendError) {
        if error.is_auth_failure() {
            warn!("Sheets API rejected credentials; clearing cached token");
            self.auth.invalidate().await;
        }
    }
}

impl<C, P> Transport for SheetsTransport<'_, C, P>
where
    C: HttpClient,
    P: TokenProvider,
{
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn append(&self, payload: &str, date_key: &str) -> Result<Delivery, SendError> {
        let result = self.try_append(payload, date_key).await;
        if let Err(e) = &result {
            self.drop_token_on_auth_failure(e).await;
        }
        result
    }

    async fn count_rows_for(&self, date_key: &str) -> Result<u64, SendError> {
        let result = self.try_count(date_key).await;
        if let Err(e) = &result {
            self.drop_token_on_auth_failure(e).await;
        }
        result
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

fn http_failure(response: &HttpResponse) -> SendError {
    let message = serde_json::from_str::<ApiErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.error.message)
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    SendError::Http {
        status: response.status,
        message,
    }
}

pub fn append_url(target: &SheetTarget) -> String {
    format!(
        "{}/{}/values/{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
        API_BASE,
        target.sheet_id,
        urlencoding::encode(&target.append_range())
    )
}

pub fn values_url(target: &SheetTarget) -> String {
    format!(
        "{}/{}/values/{}",
        API_BASE,
        target.sheet_id,
        urlencoding::encode(&target.date_column_range())
    )
}

/// `=HYPERLINK("p","p")`, with quotes doubled for the formula parser
pub fn hyperlink_formula(payload: &str) -> String {
    let quoted = payload.replace('"', "\"\"");
    format!("=HYPERLINK(\"{}\",\"{}\")", quoted, quoted)
}

/// Count rows for `date_key` walking up from the bottom of the sheet.
///
/// Only the last `scan_rows` rows are looked at, and the walk stops at the
/// first non-matching row once at least one match has been seen.
pub fn count_trailing_matches(rows: &[Vec<Value>], date_key: &str, scan_rows: usize) -> u64 {
    let mut count = 0;
    for row in rows.iter().rev().take(scan_rows) {
        let first = row.first().and_then(Value::as_str);
        if first == Some(date_key) {
            count += 1;
        } else if count > 0 {
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionConfig;
    use crate::errors::{AuthError, HttpError};
    use crate::http::Method;
    use crate::testing::{FakeHttp, FakeTokens};

    fn target() -> SheetTarget {
        SheetTarget {
            sheet_id: "ABC123".to_string(),
            tab_name: "Production Tracker".to_string(),
        }
    }

    fn rows(keys: &[&str]) -> Vec<Vec<Value>> {
        keys.iter().map(|k| vec![Value::String(k.to_string())]).collect()
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            append_url(&target()),
            "https://sheets.googleapis.com/v4/spreadsheets/ABC123/values/%27Production%20Tracker%27%21A%3AB:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"
        );
        assert_eq!(
            values_url(&target()),
            "https://sheets.googleapis.com/v4/spreadsheets/ABC123/values/%27Production%20Tracker%27%21A%3AA"
        );
    }

    #[test]
    fn test_hyperlink_formula() {
        assert_eq!(
            hyperlink_formula("https://a.dev"),
            "=HYPERLINK(\"https://a.dev\",\"https://a.dev\")"
        );
        assert_eq!(hyperlink_formula("say \"hi\""), "=HYPERLINK(\"say \"\"hi\"\"\",\"say \"\"hi\"\"\")");
    }

    #[test]
    fn test_count_stops_after_today_block() {
        let values = rows(&["01/04/26", "01/05/26", "01/04/26", "01/05/26", "01/05/26"]);
        assert_eq!(count_trailing_matches(&values, "01/05/26", 100), 2);
    }

    #[test]
    fn test_count_skips_trailing_non_matches_before_first_match() {
        let values = rows(&["01/05/26", "01/05/26", "Date", ""]);
        assert_eq!(count_trailing_matches(&values, "01/05/26", 100), 2);
    }

    #[test]
    fn test_count_is_bounded_by_scan_window() {
        let values = rows(&vec!["01/05/26"; 150]);
        assert_eq!(count_trailing_matches(&values, "01/05/26", 100), 100);
        assert_eq!(count_trailing_matches(&[], "01/05/26", 100), 0);
        assert_eq!(count_trailing_matches(&[vec![]], "01/05/26", 100), 0);
    }

    #[tokio::test]
    async fn test_append_posts_row_with_bearer_token() {
        let http = FakeHttp::new();
        http.push_ok(200, "{}");
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        let delivery = transport.append("https://a.dev", "01/05/26").await.unwrap();

        assert_eq!(delivery, Delivery::Confirmed);
        let request = &http.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert!(request.headers.contains(&("Authorization".to_string(), "Bearer tok".to_string())));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({ "values": [["01/05/26", "=HYPERLINK(\"https://a.dev\",\"https://a.dev\")"]] })
        );
        assert_eq!(auth.provider().interactive_flags(), vec![true]);
    }

    #[tokio::test]
    async fn test_append_surfaces_api_error_message() {
        let http = FakeHttp::new();
        http.push_ok(400, r#"{"error": {"code": 400, "message": "Unable to parse range"}}"#);
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        let result = transport.append("x", "01/05/26").await;

        assert_eq!(
            result,
            Err(SendError::Http {
                status: 400,
                message: "Unable to parse range".to_string()
            })
        );
        assert!(auth.has_cached_token());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token() {
        let http = FakeHttp::new();
        http.push_ok(401, "not json");
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        let result = transport.append("x", "01/05/26").await;

        assert_eq!(
            result,
            Err(SendError::Http {
                status: 401,
                message: "HTTP 401".to_string()
            })
        );
        assert!(!auth.has_cached_token());
        assert_eq!(auth.provider().removed(), vec!["tok".to_string()]);
    }

    #[tokio::test]
    async fn test_range_error_naming_authors_tab_keeps_token() {
        let http = FakeHttp::new();
        http.push_ok(400, r#"{"error": {"message": "Unable to parse range: 'Authors'!A:B"}}"#);
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        assert!(transport.append("x", "01/05/26").await.is_err());

        assert!(auth.has_cached_token());
        assert!(auth.provider().removed().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure() {
        let http = FakeHttp::new();
        http.push(Err(HttpError::Network("offline".to_string())));
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        let result = transport.append("x", "01/05/26").await;

        assert!(matches!(result, Err(SendError::Network(_))));
        assert!(result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_count_uses_silent_token() {
        let http = FakeHttp::new();
        http.push_ok(200, r#"{"range": "A1:A4", "values": [["Date"], ["01/04/26"], ["01/05/26"], ["01/05/26"]]}"#);
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        let count = transport.count_rows_for("01/05/26").await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(http.requests()[0].method, Method::Get);
        assert_eq!(auth.provider().interactive_flags(), vec![false]);
    }

    #[tokio::test]
    async fn test_count_without_values_is_zero() {
        let http = FakeHttp::new();
        http.push_ok(200, r#"{"range": "A1:A1"}"#);
        let auth = AuthSession::new(FakeTokens::always("tok"), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        assert_eq!(transport.count_rows_for("01/05/26").await, Ok(0));
    }

    #[tokio::test]
    async fn test_count_not_authenticated() {
        let http = FakeHttp::new();
        let auth = AuthSession::new(FakeTokens::default(), &ExtensionConfig::default());
        let target = target();
        let transport = SheetsTransport::new(&http, &auth, &target, 100);

        let result = transport.count_rows_for("01/05/26").await;

        assert_eq!(result, Err(SendError::Auth(AuthError::NotAuthenticated)));
        assert!(http.requests().is_empty());
    }
}
