use super::{js_error, to_js};
use crate::auth::TokenProvider;
use crate::errors::AuthError;
use js_sys::Reflect;
use log::warn;
use serde_json::json;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "identity"], js_name = getAuthToken, catch)]
    async fn get_auth_token(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "identity"], js_name = removeCachedAuthToken, catch)]
    async fn remove_cached_auth_token(details: JsValue) -> Result<JsValue, JsValue>;
}

/// OAuth tokens from `chrome.identity`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeIdentity;

/// Older browsers resolve with the token string, newer ones with `{ token, grantedScopes }`
fn token_from(result: &JsValue) -> Option<String> {
    result.as_string().or_else(|| {
        Reflect::get(result, &"token".into())
            .ok()
            .and_then(|token| token.as_string())
    })
}

impl TokenProvider for ChromeIdentity {
    async fn fetch_token(&self, interactive: bool) -> Result<String, AuthError> {
        let details = to_js(&json!({ "interactive": interactive })).map_err(AuthError::Provider)?;
        let result = get_auth_token(details)
            .await
            .map_err(|e| AuthError::Provider(js_error(&e)))?;
        token_from(&result).ok_or(AuthError::NotAuthenticated)
    }

    async fn remove_cached_token(&self, token: &str) {
        let details = match to_js(&json!({ "token": token })) {
            Ok(details) => details,
            Err(e) => {
                warn!("Could not encode token removal: {}", e);
                return;
            }
        };
        if let Err(e) = remove_cached_auth_token(details).await {
            warn!("removeCachedAuthToken failed: {}", js_error(&e));
        }
    }
}
