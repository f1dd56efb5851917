//! Shared fixtures: a page that records what controllers do and a scripted
//! card widget.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

use haile_site::api::{ApiClient, IntentStatus};
use haile_site::config::{PaymentsConfig, SiteConfig};
use haile_site::page::{
    AuthView, BlogCard, ClientInfo, FormId, Notification, NotificationKind, Page,
};
use haile_site::payment::{BillingDetails, CardError, CardWidget, ConfirmedIntent};

#[derive(Default)]
pub struct RecordingPage {
    pub notifications: Mutex<Vec<Notification>>,
    pub banners: Mutex<Vec<String>>,
    pub redirects: Mutex<Vec<Url>>,
    pub resets: Mutex<Vec<FormId>>,
    pub submit_toggles: Mutex<Vec<(FormId, bool)>>,
    pub auth_views: Mutex<Vec<AuthView>>,
    pub blog_grids: Mutex<Vec<Vec<BlogCard>>>,
}

impl RecordingPage {
    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == NotificationKind::Error)
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn redirects(&self) -> Vec<Url> {
        self.redirects.lock().unwrap().clone()
    }

    pub fn last_auth_view(&self) -> Option<AuthView> {
        self.auth_views.lock().unwrap().last().cloned()
    }

    pub fn last_blog_grid(&self) -> Option<Vec<BlogCard>> {
        self.blog_grids.lock().unwrap().last().cloned()
    }
}

impl Page for RecordingPage {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }

    fn show_fatal_banner(&self, message: &str) {
        self.banners.lock().unwrap().push(message.to_string());
    }

    fn set_submit_enabled(&self, form: FormId, enabled: bool) {
        self.submit_toggles.lock().unwrap().push((form, enabled));
    }

    fn reset_form(&self, form: FormId) {
        self.resets.lock().unwrap().push(form);
    }

    fn set_donation_form_visible(&self, _visible: bool) {}

    fn redirect(&self, url: &Url) {
        self.redirects.lock().unwrap().push(url.clone());
    }

    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            user_agent: "test-agent".to_string(),
            screen_width: 1280,
            screen_height: 720,
        }
    }

    fn render_auth(&self, view: &AuthView) {
        self.auth_views.lock().unwrap().push(view.clone());
    }

    fn render_blogs(&self, cards: &[BlogCard]) {
        self.blog_grids.lock().unwrap().push(cards.to_vec());
    }
}

/// Card widget whose confirmation result is fixed up front.
pub struct FakeWidget {
    pub result: Result<ConfirmedIntent, CardError>,
    pub fail_init: bool,
    /// When set, confirmation waits until notified.
    pub gate: Option<Arc<Notify>>,
    /// When set, mounting waits until notified.
    pub mount_gate: Option<Arc<Notify>>,
    pub confirmed_with: Mutex<Vec<String>>,
    pub mounts: Mutex<u32>,
}

impl FakeWidget {
    pub fn confirming(id: &str, status: IntentStatus) -> Self {
        Self::with_result(Ok(ConfirmedIntent {
            id: id.to_string(),
            status,
        }))
    }

    pub fn declining(err: CardError) -> Self {
        Self::with_result(Err(err))
    }

    fn with_result(result: Result<ConfirmedIntent, CardError>) -> Self {
        Self {
            result,
            fail_init: false,
            gate: None,
            mount_gate: None,
            confirmed_with: Mutex::new(Vec::new()),
            mounts: Mutex::new(0),
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn slow_mount(mut self, gate: Arc<Notify>) -> Self {
        self.mount_gate = Some(gate);
        self
    }

    pub fn broken(mut self) -> Self {
        self.fail_init = true;
        self
    }
}

#[async_trait]
impl CardWidget for FakeWidget {
    async fn create_elements(&self) -> Result<(), CardError> {
        if self.fail_init {
            return Err(CardError::new("script failed to load"));
        }
        Ok(())
    }

    async fn mount_card(&self, _container: &str) -> Result<(), CardError> {
        *self.mounts.lock().unwrap() += 1;
        if let Some(gate) = &self.mount_gate {
            gate.notified().await;
        }
        Ok(())
    }

    fn clear_card(&self) {}

    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        _billing: &BillingDetails,
    ) -> Result<ConfirmedIntent, CardError> {
        self.confirmed_with
            .lock()
            .unwrap()
            .push(client_secret.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

pub fn api(base: &str) -> ApiClient {
    ApiClient::builder(base)
        .timeout(Duration::from_secs(2))
        .max_retries(2)
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap()
}

pub fn site_config() -> SiteConfig {
    SiteConfig {
        origin: "https://haile.example".to_string(),
        success_path: "success.html".to_string(),
    }
}

/// Payment settings with short timings so tests run in real time.
pub fn payments_config() -> PaymentsConfig {
    PaymentsConfig {
        publishable_key: Some("pk_test_123".to_string()),
        debounce_ms: 50,
        redirect_delay_ms: 0,
        notification_timeout_ms: 100,
        ..PaymentsConfig::default()
    }
}
