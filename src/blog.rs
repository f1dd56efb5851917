//! Blog grid and the admin editor behind it.
//!
//! Anyone can read posts. Creating, editing and deleting need a signed-in
//! admin; the session token comes from the shared [`AuthController`].

use chrono::{DateTime, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, BlogDraft, BlogPost, BlogsClient};
use crate::auth::AuthController;
use crate::config::BlogConfig;
use crate::error::{SiteError, SiteResult};
use crate::page::{BlogCard, FormId, Notification, Page};
use crate::sanitize::text_content;

/// Characters of plain text shown before "Show More".
pub const EXCERPT_CHARS: usize = 100;

/// What an empty rich-text editor submits.
const EMPTY_EDITOR: &str = "<p><br></p>";

/// Where the last listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogSource {
    Backend,
    LocalData,
    Unavailable,
}

#[derive(Debug, Default)]
struct BlogState {
    posts: Vec<BlogPost>,
    /// Post loaded into the editor; saving updates it instead of creating.
    editing: Option<String>,
}

pub struct BlogController {
    api: BlogsClient,
    page: Arc<dyn Page>,
    auth: Arc<AuthController>,
    local_data: Option<PathBuf>,
    state: Mutex<BlogState>,
}

impl BlogController {
    pub fn new(
        api: &ApiClient,
        page: Arc<dyn Page>,
        auth: Arc<AuthController>,
        config: &BlogConfig,
    ) -> Self {
        Self {
            api: api.blogs(),
            page,
            auth,
            local_data: config.local_data_path.clone(),
            state: Mutex::new(BlogState::default()),
        }
    }

    /// Fetch and render the grid. Falls back to the bundled posts when the
    /// backend is unreachable, and to an empty grid when those are missing.
    pub async fn load(&self) -> BlogSource {
        let (posts, source) = match self.api.list().await {
            Ok(posts) => (posts, BlogSource::Backend),
            Err(err) => {
                warn!("blog list failed: {err}");
                match self.local_posts() {
                    Ok(posts) => {
                        info!(count = posts.len(), "showing local blog data");
                        (posts, BlogSource::LocalData)
                    }
                    Err(err) => {
                        warn!("local blog data unavailable: {err}");
                        (Vec::new(), BlogSource::Unavailable)
                    }
                }
            }
        };

        let can_edit = self.auth.view().await.show_admin_controls;
        let cards: Vec<BlogCard> = posts.iter().map(|post| card(post, can_edit)).collect();
        self.state.lock().await.posts = posts;
        self.page.render_blogs(&cards);
        source
    }

    /// Posts from the last [`load`](Self::load).
    pub async fn posts(&self) -> Vec<BlogPost> {
        self.state.lock().await.posts.clone()
    }

    /// Full post for the "Show More" view, from the last listing.
    pub async fn full_post(&self, id: &str) -> Option<BlogPost> {
        self.state
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id.as_deref() == Some(id))
            .cloned()
    }

    /// Load a post into the editor.
    pub async fn edit(&self, id: &str) -> SiteResult<BlogPost> {
        self.admin_token().await?;
        let post = self
            .api
            .get(id)
            .await
            .map_err(|err| self.failed(err, "Failed to load blog", false))?;
        self.state.lock().await.editing = Some(id.to_string());
        Ok(post)
    }

    pub async fn editing(&self) -> Option<String> {
        self.state.lock().await.editing.clone()
    }

    pub async fn cancel_edit(&self) {
        self.state.lock().await.editing = None;
        self.page.reset_form(FormId::Blog);
    }

    /// Create a post, or update the one loaded by [`edit`](Self::edit).
    pub async fn save(&self, title: &str, content: &str) -> SiteResult<()> {
        let token = self.admin_token().await?;
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() || content == EMPTY_EDITOR {
            return Err(self.reject("Title and content are required"));
        }

        let draft = BlogDraft {
            title: title.to_string(),
            content: content.to_string(),
        };
        let editing = self.state.lock().await.editing.clone();
        let result = match &editing {
            Some(id) => self.api.update(id, &draft, &token).await,
            None => self.api.create(&draft, &token).await,
        };
        result.map_err(|err| self.failed(err, "Failed to save blog", true))?;

        self.state.lock().await.editing = None;
        self.page.reset_form(FormId::Blog);
        self.load().await;
        let message = match editing {
            Some(id) => {
                info!(%id, "blog updated");
                "Blog updated successfully"
            }
            None => {
                info!("blog created");
                "Blog created successfully"
            }
        };
        self.page.notify(Notification::success(message));
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> SiteResult<()> {
        let token = self.admin_token().await?;
        self.api
            .delete(id, &token)
            .await
            .map_err(|err| self.failed(err, "Failed to delete blog", true))?;

        {
            let mut state = self.state.lock().await;
            if state.editing.as_deref() == Some(id) {
                state.editing = None;
            }
        }
        info!(%id, "blog deleted");
        self.load().await;
        self.page
            .notify(Notification::success("Blog deleted successfully"));
        Ok(())
    }

    async fn admin_token(&self) -> SiteResult<String> {
        let is_admin = self.auth.view().await.show_admin_controls;
        match self.auth.token().await {
            Some(token) if is_admin => Ok(token),
            _ => Err(self.reject("Only administrators can manage blog posts")),
        }
    }

    fn local_posts(&self) -> SiteResult<Vec<BlogPost>> {
        let path = self
            .local_data
            .as_ref()
            .ok_or_else(|| SiteError::ConfigError("no local blog data configured".to_string()))?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn reject(&self, message: &str) -> SiteError {
        self.page.notify(Notification::error(message));
        SiteError::Validation(message.to_string())
    }

    /// Save and delete report the backend's `error` text; loading a post
    /// for editing always uses the fallback.
    fn failed(&self, err: ApiError, fallback: &str, use_server_text: bool) -> SiteError {
        warn!("blog request failed: {err}");
        let message = match err.server_message() {
            Some(text) if use_server_text => text.to_string(),
            _ => fallback.to_string(),
        };
        self.page.notify(Notification::error(message));
        SiteError::Api(err)
    }
}

/// Grid entry for a post.
pub fn card(post: &BlogPost, can_edit: bool) -> BlogCard {
    let (excerpt, truncated) = excerpt(&post.content);
    BlogCard {
        id: post.id.clone(),
        title: post.title.clone(),
        excerpt,
        truncated,
        author: post.author.clone().filter(|a| !a.trim().is_empty()),
        published: post.created_at.as_deref().map(published_date),
        can_edit,
    }
}

/// First [`EXCERPT_CHARS`] characters of the post's text, and whether
/// anything was cut.
pub fn excerpt(content: &str) -> (String, bool) {
    let text = text_content(content);
    let text = text.trim();
    let truncated = text.chars().count() > EXCERPT_CHARS;
    (text.chars().take(EXCERPT_CHARS).collect(), truncated)
}

/// `2025-01-05T10:00:00Z` becomes `January 5, 2025`; anything unparseable is
/// shown as sent.
fn published_date(raw: &str) -> String {
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d"));
    match date {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}
