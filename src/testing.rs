//! In-memory stand-ins for the browser used by unit tests.

use crate::auth::TokenProvider;
use crate::errors::{AuthError, HttpError, StorageError};
use crate::host::{Badge, ExtensionHost, Notice};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::storage::{Area, MemoryStorage, Storage};
use serde_json::{Map, Value};
use crate::tab_data::TabInfo;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Token provider replaying scripted results; empty script means "not authenticated"
#[derive(Default)]
pub struct FakeTokens {
    results: RefCell<VecDeque<Result<String, AuthError>>>,
    interactive: RefCell<Vec<bool>>,
    removed: RefCell<Vec<String>>,
}

impl FakeTokens {
    pub fn with(results: Vec<Result<String, AuthError>>) -> FakeTokens {
        FakeTokens {
            results: RefCell::new(results.into()),
            ..FakeTokens::default()
        }
    }

    pub fn always(token: &str) -> FakeTokens {
        FakeTokens::with((0..32).map(|_| Ok(token.to_string())).collect())
    }

    pub fn fetch_count(&self) -> usize {
        self.interactive.borrow().len()
    }

    pub fn interactive_flags(&self) -> Vec<bool> {
        self.interactive.borrow().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.borrow().clone()
    }
}

impl TokenProvider for FakeTokens {
    async fn fetch_token(&self, interactive: bool) -> Result<String, AuthError> {
        self.interactive.borrow_mut().push(interactive);
        self.results
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(AuthError::NotAuthenticated))
    }

    async fn remove_cached_token(&self, token: &str) {
        self.removed.borrow_mut().push(token.to_string());
    }
}

/// HTTP client replaying scripted responses and recording requests
#[derive(Default)]
pub struct FakeHttp {
    responses: RefCell<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl FakeHttp {
    pub fn new() -> FakeHttp {
        FakeHttp::default()
    }

    pub fn push(&self, response: Result<HttpResponse, HttpError>) {
        self.responses.borrow_mut().push_back(response);
    }

    pub fn push_ok(&self, status: u16, body: &str) {
        self.push(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl HttpClient for FakeHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Network("no scripted response".to_string())))
    }
}

/// Host recording everything shown to the user
#[derive(Default)]
pub struct FakeHost {
    pub badges: RefCell<Vec<Badge>>,
    pub notices: RefCell<Vec<Notice>>,
    pub options_opened: Cell<usize>,
    pub tab: RefCell<Option<TabInfo>>,
    pub selection: RefCell<Option<String>>,
}

impl FakeHost {
    pub fn with_tab(url: &str) -> FakeHost {
        FakeHost {
            tab: RefCell::new(Some(TabInfo::new(1, url))),
            ..FakeHost::default()
        }
    }

    pub fn last_badge(&self) -> Option<Badge> {
        self.badges.borrow().last().cloned()
    }

    pub fn notice_titles(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|n| n.title.clone()).collect()
    }
}

impl ExtensionHost for FakeHost {
    fn show_badge(&self, badge: &Badge) {
        self.badges.borrow_mut().push(badge.clone());
    }

    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }

    fn open_options_page(&self) {
        self.options_opened.set(self.options_opened.get() + 1);
    }

    async fn active_tab(&self) -> Option<TabInfo> {
        self.tab.borrow().clone()
    }

    async fn page_selection(&self, _tab_id: i32) -> Option<String> {
        self.selection.borrow().clone()
    }
}

/// Memory storage whose local-area writes can be switched off
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    pub fail_local_writes: Cell<bool>,
}

impl FlakyStorage {
    fn check(&self, area: Area) -> Result<(), StorageError> {
        if area == Area::Local && self.fail_local_writes.get() {
            return Err(StorageError::Backend("QUOTA_BYTES quota exceeded".to_string()));
        }
        Ok(())
    }
}

impl Storage for FlakyStorage {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>, StorageError> {
        self.inner.get(area, key).await
    }

    async fn set(&self, area: Area, key: &str, value: Value) -> Result<(), StorageError> {
        self.check(area)?;
        self.inner.set(area, key, value).await
    }

    async fn remove(&self, area: Area, keys: &[String]) -> Result<(), StorageError> {
        self.check(area)?;
        self.inner.remove(area, keys).await
    }

    async fn get_all(&self, area: Area) -> Result<Map<String, Value>, StorageError> {
        self.inner.get_all(area).await
    }
}
