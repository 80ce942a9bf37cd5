use super::{js_error, set_timeout};
use crate::errors::HttpError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use js_sys::{Array, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestCredentials, RequestInit, RequestMode, Response};

#[wasm_bindgen]
extern "C" {
    /// Global `fetch`; the background runs in a worker, so there is no `window`
    #[wasm_bindgen(js_name = fetch)]
    fn fetch_with_request(request: &Request) -> Promise;
}

/// `HttpClient` over the browser's `fetch`
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchClient;

fn build_request(request: &HttpRequest, controller: Option<&AbortController>) -> Result<Request, HttpError> {
    let build = |e: JsValue| HttpError::Build(js_error(&e));

    let init = RequestInit::new();
    init.set_method(request.method.as_str());
    if request.no_cors {
        init.set_mode(RequestMode::NoCors);
    }
    if request.include_credentials {
        init.set_credentials(RequestCredentials::Include);
    }
    if let Some(body) = &request.body {
        init.set_body(&JsValue::from_str(body));
    }
    if !request.headers.is_empty() {
        let headers = Headers::new().map_err(build)?;
        for (name, value) in &request.headers {
            headers.append(name, value).map_err(build)?;
        }
        init.set_headers(&headers);
    }
    if let Some(controller) = controller {
        init.set_signal(Some(&controller.signal()));
    }

    Request::new_with_str_and_init(&request.url, &init).map_err(build)
}

/// Promise that resolves with `undefined` after `millis`
fn sleep(millis: i32) -> Promise {
    Promise::new(&mut |resolve, _reject| {
        set_timeout(&resolve, millis);
    })
}

impl HttpClient for FetchClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let controller = match request.timeout {
            Some(_) => Some(AbortController::new().map_err(|e| HttpError::Build(js_error(&e)))?),
            None => None,
        };
        let js_request = build_request(&request, controller.as_ref())?;
        let pending = fetch_with_request(&js_request);

        let settled = match request.timeout {
            Some(timeout) => {
                let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
                let race = Array::of2(&pending, &sleep(millis));
                JsFuture::from(Promise::race(&race)).await
            }
            None => JsFuture::from(pending).await,
        }
        .map_err(|e| HttpError::Network(js_error(&e)))?;

        let response = match settled.dyn_into::<Response>() {
            Ok(response) => response,
            Err(_) => {
                if let Some(controller) = &controller {
                    controller.abort();
                }
                return Err(HttpError::Timeout);
            }
        };

        let status = response.status();
        // Opaque responses have no readable body
        let body = match response.text() {
            Ok(text) => JsFuture::from(text)
                .await
                .ok()
                .and_then(|text| text.as_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };
        Ok(HttpResponse { status, body })
    }
}
