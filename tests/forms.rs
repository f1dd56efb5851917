mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api, RecordingPage};
use haile_site::api::{ChildRegistration, ContactSubmission};
use haile_site::forms::{ContactController, FormOutcome, RegistrationController};
use haile_site::page::FormId;

fn contact() -> ContactSubmission {
    ContactSubmission {
        name: "  Abebe Kebede ".to_string(),
        email: "abebe@example.org".to_string(),
        subject: "classes".to_string(),
        message: "When do the Saturday classes start?".to_string(),
    }
}

fn registration() -> ChildRegistration {
    ChildRegistration {
        child_name: "Liya".to_string(),
        father_name: "Abebe".to_string(),
        mother_name: "Hana".to_string(),
        country: "Ethiopia".to_string(),
        state: None,
        class_date: "2026-11-07".to_string(),
        time_slot: "9:30AM-10:00AM".to_string(),
        start_time_utc: Some("2026-11-07 06:30:00 UTC".to_string()),
        email: "hana@example.org".to_string(),
        phone: "+251 911 000000".to_string(),
        church: None,
    }
}

#[tokio::test]
async fn contact_submission_is_trimmed_and_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contacts"))
        .and(body_partial_json(json!({"name": "Abebe Kebede"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let forms = ContactController::new(&api(&server.uri()), page.clone(), Duration::ZERO);

    let outcome = forms.submit(contact()).await;
    assert!(matches!(outcome, FormOutcome::Submitted(_)));
    assert!(page.resets.lock().unwrap().contains(&FormId::Contact));
}

#[tokio::test]
async fn contact_submissions_inside_interval_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let forms = ContactController::new(
        &api(&server.uri()),
        page.clone(),
        Duration::from_secs(60),
    );

    assert!(matches!(forms.submit(contact()).await, FormOutcome::Submitted(_)));
    assert_eq!(forms.submit(contact()).await, FormOutcome::Dropped);
}

#[tokio::test]
async fn invalid_contact_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contacts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let forms = ContactController::new(&api(&server.uri()), page.clone(), Duration::ZERO);

    let mut short = contact();
    short.message = "hi".to_string();
    assert!(matches!(forms.submit(short).await, FormOutcome::Invalid(_)));
    assert_eq!(page.errors().len(), 1);
}

#[tokio::test]
async fn contact_backend_failure_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contacts"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "spam"})))
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let forms = ContactController::new(&api(&server.uri()), page.clone(), Duration::ZERO);

    assert_eq!(
        forms.submit(contact()).await,
        FormOutcome::Failed("Failed to send message. Please try again later.".to_string())
    );
}

#[tokio::test]
async fn registration_uses_server_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/registrations"))
        .and(body_partial_json(json!({
            "child_name": "Liya",
            "start_time_utc": "2026-11-07 06:30:00 UTC"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"message": "Liya is registered for 2026-11-07"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let forms =
        RegistrationController::new(&api(&server.uri()), page.clone(), Duration::from_millis(5));

    assert_eq!(
        forms.submit(registration()).await,
        FormOutcome::Submitted("Liya is registered for 2026-11-07".to_string())
    );
    assert!(page.resets.lock().unwrap().contains(&FormId::Registration));
}

#[tokio::test]
async fn registration_missing_field_is_named() {
    let server = MockServer::start().await;
    let page = Arc::new(RecordingPage::default());
    let forms = RegistrationController::new(&api(&server.uri()), page.clone(), Duration::ZERO);

    let mut form = registration();
    form.father_name = "  ".to_string();
    assert_eq!(
        forms.submit(form).await,
        FormOutcome::Invalid("Please fill in the father name field".to_string())
    );
}

#[tokio::test]
async fn registration_failure_prefers_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/registrations"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "Slot is full"})),
        )
        .mount(&server)
        .await;

    let page = Arc::new(RecordingPage::default());
    let forms = RegistrationController::new(&api(&server.uri()), page.clone(), Duration::ZERO);

    assert_eq!(
        forms.submit(registration()).await,
        FormOutcome::Failed("Slot is full".to_string())
    );
    assert_eq!(page.errors(), vec!["Slot is full"]);
}
