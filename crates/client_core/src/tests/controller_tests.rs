use std::{sync::Arc, time::Duration};

use serde_json::json;
use shared::{domain::StatusKind, error::ErrorKind};
use tokio::sync::Notify;

use crate::{
    documents::{download_link, FetchOutcome},
    test_support::{document_json, mounted, ScriptedTransport},
    transport::{HttpReply, TransportError},
    upload::SubmitOutcome,
    validation::{SelectedFile, ValidationError, MAX_UPLOAD_BYTES},
    view_state::StatusAction,
};

fn report_pdf() -> SelectedFile {
    SelectedFile::new("r.pdf", "application/pdf", vec![7u8; 2048])
}

fn status_text(panel: &crate::DocumentPanel) -> Option<String> {
    panel.snapshot().status.map(|message| message.text)
}

#[tokio::test]
async fn initial_mount_with_empty_store_shows_no_documents_and_no_message() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));

    let panel = crate::DocumentPanel::mount(&crate::test_support::test_settings(), transport.clone());
    assert_eq!(panel.initial_load().await, Some(FetchOutcome::Loaded(0)));
    assert_eq!(panel.initial_load().await, None);

    let state = panel.snapshot();
    assert!(state.documents.is_empty());
    assert!(state.status.is_none());
    assert!(!state.list_busy);
    assert_eq!(transport.get_urls(), vec!["https://store.test/api/documents/".to_string()]);
}

#[tokio::test]
async fn disallowed_file_is_rejected_and_previous_file_kept() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));
    let panel = mounted(transport).await;

    panel.uploads().set_title("Draft");
    panel.uploads().set_file(report_pdf()).expect("pdf accepted");

    let err = panel
        .uploads()
        .set_file(SelectedFile::new("payload.exe", "application/pdf", vec![1]))
        .expect_err("exe rejected");
    assert!(matches!(err, ValidationError::UnsupportedType { .. }));

    let state = panel.snapshot();
    assert_eq!(state.file, Some(report_pdf()));
    assert_eq!(state.title, "Draft");
    assert_eq!(state.file_input_reset, 1);
    let status = state.status.expect("error message");
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.contains("payload.exe"));
}

#[tokio::test]
async fn oversized_file_gets_size_specific_message() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));
    let panel = mounted(transport).await;

    let big = SelectedFile::new("big.pdf", "application/pdf", vec![0u8; MAX_UPLOAD_BYTES as usize + 1]);
    let err = panel.uploads().set_file(big).expect_err("too large");
    assert!(matches!(err, ValidationError::TooLarge { .. }));
    assert!(panel.snapshot().file.is_none());
    assert!(status_text(&panel).expect("message").contains("10MB"));
}

#[tokio::test]
async fn submit_with_blank_title_never_reaches_network() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));
    let panel = mounted(transport.clone()).await;

    panel.uploads().set_title("   ");
    panel.uploads().set_file(report_pdf()).expect("accepted");

    let outcome = panel.uploads().submit().await;
    assert_eq!(outcome, SubmitOutcome::Invalid(ValidationError::MissingTitle));
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Validation));
    assert!(transport.posted().is_empty());
    assert_eq!(status_text(&panel).as_deref(), Some("Title is required"));
    assert!(!panel.snapshot().upload_busy);
}

#[tokio::test]
async fn successful_upload_clears_form_and_refreshes_once() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));
    let panel = mounted(transport.clone()).await;

    let stored = document_json(1, "Report", "https://store.test/media/r.pdf");
    transport.push_post(Ok(HttpReply::json(
        201,
        &json!({"success": true, "document": stored}),
    )));
    transport.push_list(json!([stored]));

    panel.uploads().set_title("  Report ");
    panel.uploads().set_file(report_pdf()).expect("accepted");
    let outcome = panel.uploads().submit().await;

    let SubmitOutcome::Uploaded(Some(document)) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(document.title, "Report");

    let state = panel.snapshot();
    assert_eq!(state.title, "");
    assert!(state.file.is_none());
    assert!(!state.upload_busy);
    assert_eq!(state.file_input_reset, 1);
    assert_eq!(state.status.as_ref().map(|m| m.kind), Some(StatusKind::Success));
    assert_eq!(state.documents.len(), 1);
    assert_eq!(state.documents[0].title, "Report");
    assert_eq!(state.documents[0].download_url, "https://store.test/documents/r.pdf");

    assert_eq!(transport.get_count(), 2, "initial fetch plus exactly one refresh");
    let posted = transport.posted();
    assert_eq!(posted.len(), 1);
    let (url, form) = &posted[0];
    assert_eq!(url, "https://store.test/api/upload/");
    assert_eq!(form.text_field("title"), Some("Report"));
    let file = form.file_field("file").expect("file part");
    assert_eq!(file.file_name, "r.pdf");
    assert_eq!(file.mime_type, "application/pdf");
    assert_eq!(file.bytes.len(), 2048);
}

#[tokio::test]
async fn rejected_upload_surfaces_store_message_and_keeps_fields() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));
    let panel = mounted(transport.clone()).await;

    transport.push_post(Ok(HttpReply::json(
        200,
        &json!({"success": false, "message": "quota exceeded"}),
    )));
    panel.uploads().set_title("Report");
    panel.uploads().set_file(report_pdf()).expect("accepted");

    assert_eq!(
        panel.uploads().submit().await,
        SubmitOutcome::Failed(ErrorKind::Application)
    );
    let state = panel.snapshot();
    assert_eq!(state.title, "Report");
    assert_eq!(state.file, Some(report_pdf()));
    assert!(!state.upload_busy);
    let status = state.status.expect("error");
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.contains("quota exceeded"));
    assert_eq!(transport.get_count(), 1, "no refresh after a failed upload");
}

#[tokio::test]
async fn upload_failure_reasons_fall_back_in_order() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([]));
    let panel = mounted(transport.clone()).await;
    panel.uploads().set_title("Report");
    panel.uploads().set_file(report_pdf()).expect("accepted");

    transport.push_post(Ok(HttpReply {
        status: 500,
        reason: Some("Internal Server Error".into()),
        body: b"<html>oops</html>".to_vec(),
    }));
    panel.uploads().submit().await;
    assert_eq!(
        status_text(&panel).as_deref(),
        Some("Upload failed: 500 Internal Server Error")
    );

    transport.push_post(Err(TransportError::Timeout));
    assert_eq!(
        panel.uploads().submit().await,
        SubmitOutcome::Failed(ErrorKind::Transport)
    );
    assert_eq!(status_text(&panel).as_deref(), Some("Upload failed"));
    assert_eq!(panel.snapshot().title, "Report");
}

#[tokio::test]
async fn second_submit_while_uploading_is_rejected_but_list_stays_usable() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(ScriptedTransport::with_upload_gate(gate.clone()));
    transport.push_list(json!([]));
    let panel = Arc::new(mounted(transport.clone()).await);

    panel.uploads().set_title("Report");
    panel.uploads().set_file(report_pdf()).expect("accepted");
    transport.push_post(Ok(HttpReply::json(200, &json!({"success": true}))));

    let mut rx = panel.subscribe();
    let first = tokio::spawn({
        let panel = panel.clone();
        async move { panel.uploads().submit().await }
    });
    rx.wait_for(|state| state.upload_busy)
        .await
        .expect("upload starts");

    assert_eq!(panel.uploads().submit().await, SubmitOutcome::Rejected);

    transport.push_list(json!([document_json(4, "Older", "https://store.test/documents/o.pdf")]));
    assert_eq!(panel.documents().fetch().await, FetchOutcome::Loaded(1));
    assert!(panel.snapshot().upload_busy);

    transport.push_list(json!([]));
    gate.notify_one();
    assert_eq!(first.await.expect("join"), SubmitOutcome::Uploaded(None));
    assert_eq!(transport.posted().len(), 1);
    assert!(!panel.snapshot().upload_busy);
}

#[tokio::test]
async fn upload_finishing_during_mount_fetch_still_lists_the_new_document() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(ScriptedTransport::with_first_get_gate(gate.clone()));
    let stored = document_json(1, "Report", "https://store.test/media/r.pdf");
    transport.push_list(json!([]));
    transport.push_post(Ok(HttpReply::json(
        201,
        &json!({"success": true, "document": stored}),
    )));
    transport.push_list(json!([stored]));

    let panel = crate::DocumentPanel::mount(&crate::test_support::test_settings(), transport.clone());
    panel
        .subscribe()
        .wait_for(|state| state.list_busy)
        .await
        .expect("mount fetch starts");

    panel.uploads().set_title("Report");
    panel.uploads().set_file(report_pdf()).expect("accepted");
    let outcome = panel.uploads().submit().await;
    assert!(matches!(outcome, SubmitOutcome::Uploaded(Some(ref document)) if document.title == "Report"));
    assert!(panel.snapshot().documents.is_empty());
    assert_eq!(transport.get_count(), 1, "refresh waits for the mount fetch");

    gate.notify_one();
    assert_eq!(panel.initial_load().await, Some(FetchOutcome::Loaded(1)));

    let state = panel.snapshot();
    assert!(!state.list_busy);
    assert_eq!(state.documents.len(), 1);
    assert_eq!(state.documents[0].title, "Report");
    assert_eq!(transport.get_count(), 2);
    assert_eq!(state.status.map(|m| m.kind), Some(StatusKind::Success));
}

#[tokio::test(start_paused = true)]
async fn cancelled_submit_releases_the_upload_guard() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(ScriptedTransport::with_upload_gate(gate));
    transport.push_list(json!([]));
    let panel = mounted(transport.clone()).await;

    panel.uploads().set_title("Report");
    panel.uploads().set_file(report_pdf()).expect("accepted");
    let timed_out = tokio::time::timeout(Duration::from_millis(50), panel.uploads().submit()).await;
    assert!(timed_out.is_err());

    let state = panel.snapshot();
    assert!(!state.upload_busy);
    assert_eq!(state.title, "Report");
    assert_eq!(state.file, Some(report_pdf()));
    assert_eq!(transport.posted().len(), 1);
}

#[tokio::test]
async fn unmount_during_mount_fetch_releases_the_list_guard() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(ScriptedTransport::with_first_get_gate(gate));
    let panel = crate::DocumentPanel::mount(&crate::test_support::test_settings(), transport.clone());
    panel
        .subscribe()
        .wait_for(|state| state.list_busy)
        .await
        .expect("mount fetch starts");
    assert_eq!(panel.documents().fetch().await, FetchOutcome::Rejected);

    panel.unmount();
    panel
        .subscribe()
        .wait_for(|state| !state.list_busy)
        .await
        .expect("aborted mount fetch settles");

    transport.push_list(json!([document_json(5, "Late", "https://store.test/documents/l.pdf")]));
    assert_eq!(panel.documents().fetch().await, FetchOutcome::Loaded(1));
    assert_eq!(panel.snapshot().documents[0].title, "Late");
}

#[tokio::test]
async fn fetch_failure_keeps_collection_and_offers_retry() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([document_json(1, "Kept", "https://store.test/documents/k.pdf")]));
    let panel = mounted(transport.clone()).await;

    transport.push_get(Err(TransportError::Connect("connection refused".into())));
    assert_eq!(
        panel.documents().fetch().await,
        FetchOutcome::Failed(ErrorKind::Transport)
    );

    let state = panel.snapshot();
    assert_eq!(state.documents.len(), 1);
    assert_eq!(state.documents[0].title, "Kept");
    assert!(!state.list_busy);
    let status = state.status.expect("error");
    assert_eq!(status.text, "Failed to load documents");
    assert_eq!(status.action, Some(StatusAction::RetryFetch));
}

#[tokio::test]
async fn retry_replaces_error_only_once_resolved() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_get(Ok(HttpReply::json(
        200,
        &json!({"success": false, "message": "store offline"}),
    )));
    let panel = mounted(transport.clone()).await;
    assert_eq!(status_text(&panel).as_deref(), Some("store offline"));

    transport.push_get(Ok(HttpReply {
        status: 503,
        reason: Some("Service Unavailable".into()),
        body: Vec::new(),
    }));
    assert_eq!(
        panel.documents().retry().await,
        FetchOutcome::Failed(ErrorKind::Application)
    );
    assert_eq!(
        status_text(&panel).as_deref(),
        Some("Failed to load documents: 503 Service Unavailable")
    );

    transport.push_list(json!([document_json(2, "Back", "https://store.test/documents/b.pdf")]));
    assert_eq!(panel.documents().retry().await, FetchOutcome::Loaded(1));

    let state = panel.snapshot();
    assert!(state.status.is_none());
    assert_eq!(state.retry_token, 2);
    assert_eq!(state.documents[0].title, "Back");
}

#[tokio::test]
async fn download_links_resolve_through_store_and_rewrite() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_list(json!([document_json(3, "Spec", "https://cdn.test/documents/s.pdf")]));
    let panel = mounted(transport.clone()).await;
    let document = panel.snapshot().documents[0].clone();

    transport.push_get(Ok(HttpReply::json(
        200,
        &json!({"success": true, "file_url": "https://cdn.test/media/s.pdf"}),
    )));
    assert_eq!(
        panel.documents().resolve_download(&document.id).await.as_deref(),
        Some("https://cdn.test/documents/s.pdf")
    );
    assert_eq!(
        transport.get_urls().last().map(String::as_str),
        Some("https://store.test/api/documents/3/download/")
    );

    transport.push_get(Ok(HttpReply {
        status: 404,
        reason: Some("Not Found".into()),
        body: br#"{"success": false, "message": "Document not found"}"#.to_vec(),
    }));
    assert!(panel.documents().resolve_download(&document.id).await.is_none());
    assert_eq!(status_text(&panel).as_deref(), Some("Document not found"));

    assert_eq!(download_link(&document, false), "https://cdn.test/documents/s.pdf");
    assert_eq!(
        download_link(&document, true),
        "https://cdn.test/documents/s.pdf?download=true"
    );
}
