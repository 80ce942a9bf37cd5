/// OAuth token session for the Sheets API transport
///
/// States: no token -> cached(expiry). A cached token is reused while it has
/// more than the refresh margin left; otherwise the provider is asked again.
/// `invalidate` drops the token so the next call goes back to the provider.

use crate::config::ExtensionConfig;
use crate::errors::AuthError;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use std::cell::RefCell;

/// Source of OAuth access tokens (chrome.identity in the browser)
#[allow(async_fn_in_trait)]
pub trait TokenProvider {
    /// `interactive` may show a consent prompt; silent fetches just fail
    async fn fetch_token(&self, interactive: bool) -> Result<String, AuthError>;

    /// Tell the provider to forget a token it handed out
    async fn remove_cached_token(&self, token: &str);
}

#[derive(Debug, Clone, PartialEq)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct AuthSession<P> {
    provider: P,
    cached: RefCell<Option<CachedToken>>,
    lifetime: Duration,
    refresh_margin: Duration,
}

impl<P: TokenProvider> AuthSession<P> {
    pub fn new(provider: P, config: &ExtensionConfig) -> Self {
        AuthSession {
            provider,
            cached: RefCell::new(None),
            lifetime: Duration::from_std(config.token_lifetime).unwrap_or_else(|_| Duration::hours(1)),
            refresh_margin: Duration::from_std(config.token_refresh_margin)
                .unwrap_or_else(|_| Duration::minutes(1)),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn token(&self, interactive: bool) -> Result<String, AuthError> {
        self.token_at(Utc::now(), interactive).await
    }

    pub async fn token_at(&self, now: DateTime<Utc>, interactive: bool) -> Result<String, AuthError> {
        if let Some(token) = self.valid_token(now) {
            return Ok(token);
        }

        debug!("Fetching OAuth token (interactive: {})", interactive);
        match self.provider.fetch_token(interactive).await {
            Ok(token) if token.is_empty() => Err(AuthError::NotAuthenticated),
            Ok(token) => {
                *self.cached.borrow_mut() = Some(CachedToken {
                    value: token.clone(),
                    expires_at: now + self.lifetime,
                });
                Ok(token)
            }
            Err(e) => {
                warn!("Auth failed: {}", e);
                if e.to_string().contains("OAuth2") {
                    self.invalidate().await;
                }
                Err(e)
            }
        }
    }

    /// Forget the cached token locally and at the provider
    pub async fn invalidate(&self) {
        let previous = self.cached.borrow_mut().take();
        if let Some(token) = previous {
            debug!("Invalidating cached OAuth token");
            self.provider.remove_cached_token(&token.value).await;
        }
    }

    pub fn has_cached_token(&self) -> bool {
        self.cached.borrow().is_some()
    }

    fn valid_token(&self, now: DateTime<Utc>) -> Option<String> {
        self.cached
            .borrow()
            .as_ref()
            .filter(|token| token.expires_at > now + self.refresh_margin)
            .map(|token| token.value.clone())
    }
}
