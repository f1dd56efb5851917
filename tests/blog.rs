mod common;

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api, RecordingPage};
use haile_site::auth::{AuthController, MemoryTokenStore};
use haile_site::blog::{BlogController, BlogSource};
use haile_site::config::BlogConfig;
use haile_site::page::FormId;
use haile_site::SiteError;

/// Session restored from a stored token with the given role.
async fn session(server: &MockServer, page: Arc<RecordingPage>, role: &str) -> Arc<AuthController> {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("Authorization", "Bearer tok-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "first_name": "Sara",
            "role": role
        })))
        .mount(server)
        .await;

    let auth = Arc::new(AuthController::new(
        &api(&server.uri()),
        page,
        Arc::new(MemoryTokenStore::with_token("tok-admin")),
    ));
    auth.init().await.unwrap();
    auth
}

fn visitor(server: &MockServer, page: Arc<RecordingPage>) -> Arc<AuthController> {
    Arc::new(AuthController::new(
        &api(&server.uri()),
        page,
        Arc::new(MemoryTokenStore::default()),
    ))
}

fn blog(
    server: &MockServer,
    page: Arc<RecordingPage>,
    auth: Arc<AuthController>,
    config: &BlogConfig,
) -> BlogController {
    BlogController::new(&api(&server.uri()), page, auth, config)
}

async fn mount_list(server: &MockServer, posts: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts))
        .mount(server)
        .await;
}

#[tokio::test]
async fn admin_sees_cards_with_controls() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!([
            {"id": 1, "title": "Short", "content": "<p>Hello</p>", "author": "Sara", "created_at": "2025-01-05T10:00:00Z"},
            {"id": "2", "title": "Long", "content": format!("<p>{}</p>", "word ".repeat(40))}
        ]),
    )
    .await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "admin").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    assert_eq!(blogs.load().await, BlogSource::Backend);
    let grid = page.last_blog_grid().unwrap();
    assert_eq!(grid.len(), 2);
    assert_eq!(grid[0].excerpt, "Hello");
    assert_eq!(grid[0].published.as_deref(), Some("January 5, 2025"));
    assert!(!grid[0].truncated);
    assert!(grid[1].truncated);
    assert_eq!(grid[1].excerpt.chars().count(), 100);
    assert!(grid.iter().all(|card| card.can_edit));

    let full = blogs.full_post("2").await.unwrap();
    assert_eq!(full.title, "Long");
}

#[tokio::test]
async fn visitors_see_cards_without_controls() {
    let server = MockServer::start().await;
    mount_list(&server, json!([{"id": 1, "title": "Short", "content": "<p>Hello</p>"}])).await;

    let page = Arc::new(RecordingPage::default());
    let auth = visitor(&server, Arc::clone(&page));
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    blogs.load().await;
    let grid = page.last_blog_grid().unwrap();
    assert!(!grid[0].can_edit);
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_local_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("blog-data.json");
    std::fs::write(
        &local,
        json!([{"id": 9, "title": "Offline", "content": "<p>Saved copy</p>"}]).to_string(),
    )
    .unwrap();

    let page = Arc::new(RecordingPage::default());
    let auth = visitor(&server, Arc::clone(&page));
    let blogs = blog(
        &server,
        Arc::clone(&page),
        auth,
        &BlogConfig {
            local_data_path: Some(local),
        },
    );

    assert_eq!(blogs.load().await, BlogSource::LocalData);
    let grid = page.last_blog_grid().unwrap();
    assert_eq!(grid[0].title, "Offline");
    assert!(page.errors().is_empty());
}

#[tokio::test]
async fn no_local_posts_renders_empty_grid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let auth = visitor(&server, Arc::clone(&page));
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    assert_eq!(blogs.load().await, BlogSource::Unavailable);
    assert_eq!(page.last_blog_grid(), Some(Vec::new()));
}

#[tokio::test]
async fn create_sends_bearer_token_and_reloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/blogs"))
        .and(header("Authorization", "Bearer tok-admin"))
        .and(body_json(json!({"title": "New post", "content": "<p>Body</p>"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;
    mount_list(&server, json!([{"id": 3, "title": "New post", "content": "<p>Body</p>"}])).await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "admin").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    blogs.save("  New post ", "<p>Body</p>").await.unwrap();
    assert_eq!(page.last_blog_grid().unwrap()[0].title, "New post");
    assert!(page.resets.lock().unwrap().contains(&FormId::Blog));
    assert_eq!(page.messages().last().map(String::as_str), Some("Blog created successfully"));
}

#[tokio::test]
async fn edit_then_save_updates_the_loaded_post() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blogs/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "title": "Old", "content": "<p>Old body</p>"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/blogs/7"))
        .and(header("Authorization", "Bearer tok-admin"))
        .and(body_json(json!({"title": "Updated", "content": "<p>New body</p>"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    mount_list(&server, json!([])).await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "admin").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    let post = blogs.edit("7").await.unwrap();
    assert_eq!(post.title, "Old");
    assert_eq!(blogs.editing().await.as_deref(), Some("7"));

    blogs.save("Updated", "<p>New body</p>").await.unwrap();
    assert_eq!(blogs.editing().await, None);
    assert_eq!(page.messages().last().map(String::as_str), Some("Blog updated successfully"));
}

#[tokio::test]
async fn empty_editor_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "admin").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    let err = blogs.save("Title", "<p><br></p>").await.unwrap_err();
    assert!(matches!(err, SiteError::Validation(_)));
    blogs.save("   ", "<p>Body</p>").await.unwrap_err();
    assert_eq!(
        page.errors(),
        vec!["Title and content are required", "Title and content are required"]
    );
}

#[tokio::test]
async fn members_cannot_write() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/blogs/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "member").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    assert!(blogs.save("Title", "<p>Body</p>").await.is_err());
    assert!(blogs.delete("7").await.is_err());
    assert_eq!(
        page.errors(),
        vec![
            "Only administrators can manage blog posts",
            "Only administrators can manage blog posts"
        ]
    );
}

#[tokio::test]
async fn delete_reports_server_error_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/blogs/7"))
        .and(header("Authorization", "Bearer tok-admin"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Post is locked"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/blogs/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .mount(&server)
        .await;
    mount_list(&server, json!([])).await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "admin").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    let err = blogs.delete("7").await.unwrap_err();
    assert!(matches!(err, SiteError::Api(_)));
    assert_eq!(page.errors(), vec!["Post is locked"]);

    blogs.delete("7").await.unwrap();
    assert_eq!(page.messages().last().map(String::as_str), Some("Blog deleted successfully"));
}

#[tokio::test]
async fn failed_edit_load_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blogs/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not found"})))
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let auth = session(&server, Arc::clone(&page), "admin").await;
    let blogs = blog(&server, Arc::clone(&page), auth, &BlogConfig::default());

    blogs.edit("404").await.unwrap_err();
    assert_eq!(page.errors(), vec!["Failed to load blog"]);
    assert_eq!(blogs.editing().await, None);
}
