//! The page surface controllers render into.
//!
//! Controllers never touch markup directly. They push notifications, toggle
//! controls and request navigation through [`Page`], which a browser binding
//! or the terminal front end implements.

use std::time::Duration;
use tracing::{error, info};
use url::Url;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    /// Hide automatically after this long; `None` keeps it until closed.
    pub dismiss_after: Option<Duration>,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Info,
            dismiss_after: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
            dismiss_after: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
            dismiss_after: None,
        }
    }

    pub fn dismiss_after(mut self, after: Duration) -> Self {
        self.dismiss_after = Some(after);
        self
    }
}

/// Forms whose submit control or contents a controller may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormId {
    Donation,
    Contact,
    Registration,
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    Blog,
}

/// Browser facts reported in payment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl ClientInfo {
    pub fn screen_resolution(&self) -> String {
        format!("{}x{}", self.screen_width, self.screen_height)
    }
}

/// Account state as the header shows it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthView {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub show_admin_controls: bool,
}

/// One post as the blog grid shows it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlogCard {
    pub id: Option<String>,
    pub title: String,
    /// Plain-text preview of the content.
    pub excerpt: String,
    /// The excerpt is cut short; the full post is available on demand.
    pub truncated: bool,
    pub author: Option<String>,
    pub published: Option<String>,
    /// Edit and delete controls are shown.
    pub can_edit: bool,
}

pub trait Page: Send + Sync {
    fn notify(&self, notification: Notification);

    /// Persistent banner for failures that disable a feature.
    fn show_fatal_banner(&self, message: &str);

    fn set_submit_enabled(&self, form: FormId, enabled: bool);

    fn reset_form(&self, form: FormId);

    fn set_donation_form_visible(&self, visible: bool);

    fn redirect(&self, url: &Url);

    fn client_info(&self) -> ClientInfo;

    fn render_auth(&self, view: &AuthView);

    fn render_blogs(&self, cards: &[BlogCard]);
}

/// Renders everything to the terminal.
#[derive(Debug, Default)]
pub struct TerminalPage;

impl Page for TerminalPage {
    fn notify(&self, notification: Notification) {
        info!(kind = notification.kind.as_str(), "{}", notification.message);
        println!("[{}] {}", notification.kind.as_str(), notification.message);
    }

    fn show_fatal_banner(&self, message: &str) {
        error!("{message}");
        eprintln!("!! {message}");
    }

    fn set_submit_enabled(&self, _form: FormId, _enabled: bool) {}

    fn reset_form(&self, _form: FormId) {}

    fn set_donation_form_visible(&self, _visible: bool) {}

    fn redirect(&self, url: &Url) {
        println!("-> {url}");
    }

    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            user_agent: concat!("haile/", env!("CARGO_PKG_VERSION")).to_string(),
            screen_width: 0,
            screen_height: 0,
        }
    }

    fn render_auth(&self, view: &AuthView) {
        match (&view.signed_in, &view.display_name) {
            (true, Some(name)) => println!("Signed in as {name}"),
            (true, None) => println!("Signed in"),
            (false, _) => println!("Not signed in"),
        }
    }

    fn render_blogs(&self, cards: &[BlogCard]) {
        if cards.is_empty() {
            println!("No posts yet");
        }
        for card in cards {
            match (&card.can_edit, &card.id) {
                (true, Some(id)) => println!("[{id}] {}", card.title),
                _ => println!("{}", card.title),
            }
            let author = card.author.as_deref().unwrap_or("Unknown");
            match &card.published {
                Some(date) => println!("  By {author} on {date}"),
                None => println!("  By {author}"),
            }
            let more = if card.truncated { "..." } else { "" };
            println!("  {}{more}\n", card.excerpt);
        }
    }
}
