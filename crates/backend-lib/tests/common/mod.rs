//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use backend_lib::{
    clock::ManualClock,
    config::Settings,
    create_router,
    mail::{MailError, Mailer},
    storage::MemoryUserStore,
    verification::MemoryCodeCache,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Captures outgoing mail so tests can read the code
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// Code in the most recent message
    pub fn last_code(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, body) = sent.last()?;
        body.lines()
            .find_map(|line| line.strip_prefix("Your verification code is: "))
            .map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    pub store: MemoryUserStore,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let store = MemoryUserStore::new();
        let clock = Arc::new(ManualClock::starting_now());

        let state = AppState::new(
            &settings,
            Arc::new(store.clone()),
            Arc::new(MemoryCodeCache::new()),
            mailer.clone(),
            clock.clone(),
        )
        .unwrap();

        Self {
            router: create_router(Arc::new(state)),
            mailer,
            store,
            clock,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register a user and return its id
    pub async fn register(&self, email: &str, phone: &str) -> String {
        let (status, body) = self
            .request(Method::POST, "/auth/register", None, Some(registration(email, phone)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Log in and return the session token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }
}

pub fn test_settings() -> Settings {
    Settings {
        signing_key: Some("integration-test-secret".to_string()),
        ..Settings::default()
    }
}

pub fn registration(email: &str, phone: &str) -> Value {
    json!({
        "lastname": "Doe",
        "firstname": "Jane",
        "email": email,
        "phone": phone,
        "address": "1 Main Street",
        "password": "Password1!",
    })
}
