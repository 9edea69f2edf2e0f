//! Orchestration tests
//!
//! Exercise the GenerationOrchestrator against scripted and gated clients:
//! - Slice proposals (summarize, regenerate, extend) and their cleanup
//! - Document extension seeding, splitting and appending
//! - Failure recovery and the per-slice in-flight guard
//! - Late responses after delete and cancel

use async_trait::async_trait;
use mockall::mock;
use pretty_assertions::assert_eq;
use quill_core::prelude::*;
use quill_core::{
    ClientError, CleanupOptions, DocumentEvent, GenerationAction, SliceAction,
    DEFAULT_PROMPT_PREFIX,
};
use quill_test_utils::{seeded, text_payload, GatedClient, ScriptedClient};
use serde_json::{json, Value};

mock! {
    pub Client {}

    #[async_trait]
    impl GenerationClient for Client {
        async fn generate(&self, request: GenerationRequest) -> Result<Value, ClientError>;
    }
}

#[tokio::test]
async fn empty_document_seeds_from_prefixed_prompt() {
    let mut client = MockClient::new();
    client
        .expect_generate()
        .withf(|req| req.action == GenerationAction::Generate && req.prompt == "Write about Cats.")
        .times(1)
        .returning(|_| Ok(text_payload("Cats purr.")));

    let config = QuillConfig::new().with_prompt_prefix("Write about ");
    let quill = GenerationOrchestrator::with_prompt(client, config, "Cats");

    let outcome = quill.extend_document().await.unwrap();
    assert_eq!(outcome.appended().len(), 1);
    assert_eq!(quill.export_text(), "Cats purr.");
}

#[tokio::test]
async fn extend_chains_from_last_slice() {
    let client = ScriptedClient::new().with_text("Third.");
    let quill = seeded(client, &["First.", "Second."]);

    quill.extend_document().await.unwrap();

    let requests = quill.client().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, GenerationAction::Generate);
    assert_eq!(requests[0].prompt, "Second.");
    assert_eq!(quill.export_text(), "First.\n\nSecond.\n\nThird.");
}

#[tokio::test]
async fn extend_splits_paragraphs_into_new_slices() {
    let client = ScriptedClient::new().with_text("Para one.\n\nPara two.");
    let quill = seeded(client, &["Existing."]);
    let before = quill.slice_ids();

    let outcome = quill.extend_document().await.unwrap();
    let appended = outcome.appended().to_vec();

    assert_eq!(appended.len(), 2);
    assert_ne!(appended[0], appended[1]);
    assert!(!before.contains(&appended[0]) && !before.contains(&appended[1]));

    let snapshot = quill.snapshot();
    let texts: Vec<_> = snapshot.slices.iter().map(|s| s.current_text.as_str()).collect();
    assert_eq!(texts, vec!["Existing.", "Para one.", "Para two."]);
    assert!(snapshot.slices.iter().all(|s| s.state == SliceState::Idle));
}

#[tokio::test]
async fn extend_with_blank_result_inserts_nothing() {
    let client = ScriptedClient::new().with_text(" \n\n  \n");
    let quill = seeded(client, &["Only."]);

    let outcome = quill.extend_document().await.unwrap();
    assert_eq!(outcome, ExtendOutcome::Ignored(Ignored::EmptyResult));
    assert_eq!(quill.slice_ids().len(), 1);
}

#[tokio::test]
async fn extend_failure_leaves_document_unchanged() {
    let client = ScriptedClient::new().with_error(ClientError::Transport("offline".to_string()));
    let quill = seeded(client, &["Only."]);
    let mut events = quill.subscribe();

    let err = quill.extend_document().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(quill.export_text(), "Only.");
    assert!(!quill.is_extending());

    assert_eq!(events.recv().await.unwrap(), DocumentEvent::ExtendStarted);
    assert_eq!(events.recv().await.unwrap(), DocumentEvent::ExtendFinished);
}

#[tokio::test]
async fn extend_never_reads_unrecognised_payload() {
    let client = ScriptedClient::new().with_payload(json!({ "generations": [{ "text": "x" }] }));
    let quill = seeded(client, &["Only."]);

    let err = quill.extend_document().await.unwrap_err();
    assert!(matches!(err, QuillError::Generation(ClientError::Malformed(_))));
    assert_eq!(quill.slice_ids().len(), 1);
}

#[tokio::test]
async fn concurrent_extend_is_ignored() {
    let quill = seeded(GatedClient::new(), &["Start."]);

    let (first, second) = tokio::join!(quill.extend_document(), async {
        quill.client().wait_for_requests(1).await;
        assert!(quill.is_extending());
        let second = quill.extend_document().await;
        quill.client().release_text("More.");
        second
    });

    assert_eq!(first.unwrap().appended().len(), 1);
    assert_eq!(second.unwrap(), ExtendOutcome::Ignored(Ignored::ExtendInFlight));
    assert_eq!(quill.export_text(), "Start.\n\nMore.");
}

#[tokio::test]
async fn summarize_and_regenerate_propose_cleaned_text() {
    let client = ScriptedClient::new()
        .with_text("  A-short summary.  ")
        .with_text("\nA re-written version.\n");
    let quill = seeded(client, &["Original text."]);
    let id = quill.slice_ids()[0];

    quill.summarize(id).await.unwrap();
    assert_eq!(
        quill.view(id).unwrap().pending_text.as_deref(),
        Some("Ashort summary.")
    );
    assert!(quill.discard(id).is_applied());

    quill.regenerate(id).await.unwrap();
    assert_eq!(
        quill.view(id).unwrap().pending_text.as_deref(),
        Some("A rewritten version.")
    );

    let requests = quill.client().requests();
    assert_eq!(requests[0].action, GenerationAction::Summarize);
    assert_eq!(requests[1].action, GenerationAction::Regenerate);
    assert!(requests.iter().all(|r| r.prompt == "Original text."));
}

#[tokio::test]
async fn dash_stripping_can_be_disabled() {
    let client = ScriptedClient::new().with_text("well-known");
    let config = QuillConfig::new()
        .with_cleanup(CleanupOptions::default().with_strip_artifact_dashes(false));
    let document = DocumentModel::from_paragraphs(None, ["Text."]);
    let quill = GenerationOrchestrator::with_document(client, config, document);
    let id = quill.slice_ids()[0];

    quill.regenerate(id).await.unwrap();
    assert_eq!(quill.view(id).unwrap().pending_text.as_deref(), Some("well-known"));
}

#[tokio::test]
async fn extend_slice_appends_to_current_text() {
    let client = ScriptedClient::new().with_text(" And then more. ");
    let quill = seeded(client, &["It began."]);
    let id = quill.slice_ids()[0];

    quill.extend_slice(id).await.unwrap();
    assert_eq!(
        quill.view(id).unwrap().pending_text.as_deref(),
        Some("It began.\nAnd then more.")
    );

    quill.accept(id);
    assert_eq!(quill.export_text(), "It began.\nAnd then more.");
}

#[tokio::test]
async fn failed_slice_request_restores_idle() {
    let client = ScriptedClient::new().with_error(ClientError::Transport("503".to_string()));
    let quill = seeded(client, &["Stable."]);
    let id = quill.slice_ids()[0];

    let err = quill.summarize(id).await.unwrap_err();
    assert!(err.is_retryable());

    let view = quill.view(id).unwrap();
    assert_eq!(view.state, SliceState::Idle);
    assert_eq!(view.current_text, "Stable.");
    assert_eq!(view.pending_text, None);
}

#[tokio::test]
async fn empty_slice_response_is_a_noop() {
    let client = ScriptedClient::new().with_text("  -  ");
    let quill = seeded(client, &["Stable."]);
    let id = quill.slice_ids()[0];

    let outcome = quill.summarize(id).await.unwrap();
    assert_eq!(outcome, ActionOutcome::Ignored(Ignored::EmptyResult));
    assert_eq!(quill.view(id).unwrap().state, SliceState::Idle);
}

#[tokio::test]
async fn second_action_on_loading_slice_is_rejected() {
    let quill = seeded(GatedClient::new(), &["Busy."]);
    let id = quill.slice_ids()[0];

    let (first, second) = tokio::join!(quill.summarize(id), async {
        quill.client().wait_for_requests(1).await;
        let second = quill.regenerate(id).await;
        quill.client().release_text("Summary.");
        second
    });

    assert_eq!(first.unwrap(), ActionOutcome::Applied(Some(SliceState::Proposed)));
    assert_eq!(
        second.unwrap(),
        ActionOutcome::Ignored(Ignored::InvalidTransition {
            state: SliceState::Loading,
            action: SliceAction::Regenerate,
        })
    );
    assert_eq!(quill.client().pending(), 0);
    assert_eq!(quill.view(id).unwrap().pending_text.as_deref(), Some("Summary."));
}

#[tokio::test]
async fn delete_while_loading_drops_late_response() {
    let quill = seeded(GatedClient::new(), &["Doomed.", "Survivor."]);
    let ids = quill.slice_ids();

    let (outcome, _) = tokio::join!(quill.regenerate(ids[0]), async {
        quill.client().wait_for_requests(1).await;
        assert_eq!(quill.delete(ids[0]), ActionOutcome::Applied(None));
        quill.client().release_text("Resurrected?");
    });

    assert!(matches!(
        outcome.unwrap(),
        ActionOutcome::Ignored(Ignored::StaleResponse(_))
    ));
    assert!(quill.view(ids[0]).is_none());
    assert_eq!(quill.slice_ids(), vec![ids[1]]);
    assert_eq!(quill.export_text(), "Survivor.");
}

#[tokio::test]
async fn cancel_while_loading_drops_late_response() {
    let quill = seeded(GatedClient::new(), &["Keep me."]);
    let id = quill.slice_ids()[0];

    let (outcome, _) = tokio::join!(quill.summarize(id), async {
        quill.client().wait_for_requests(1).await;
        assert_eq!(quill.cancel(id), ActionOutcome::Applied(Some(SliceState::Idle)));
        quill.client().release_text("Too late.");
    });

    assert!(matches!(
        outcome.unwrap(),
        ActionOutcome::Ignored(Ignored::StaleResponse(_))
    ));
    let view = quill.view(id).unwrap();
    assert_eq!(view.state, SliceState::Idle);
    assert_eq!(view.pending_text, None);
}

#[tokio::test]
async fn slices_load_independently() {
    let quill = seeded(GatedClient::new(), &["A.", "B."]);
    let ids = quill.slice_ids();

    let (a, b, _) = tokio::join!(quill.summarize(ids[0]), quill.summarize(ids[1]), async {
        quill.client().wait_for_requests(2).await;
        let first = quill.client().release_text("Short A.").unwrap();
        assert_eq!(first.prompt, "A.");
        quill.client().release_text("Short B.");
    });

    assert!(a.unwrap().is_applied());
    assert!(b.unwrap().is_applied());
    quill.accept(ids[1]);
    quill.accept(ids[0]);
    assert_eq!(quill.export_text(), "Short A.\n\nShort B.");
}

#[tokio::test]
async fn edit_accept_flow() {
    let quill = seeded(ScriptedClient::new(), &["Draft text."]);
    let id = quill.slice_ids()[0];

    assert!(quill.edit(id).is_applied());
    let view = quill.view(id).unwrap();
    assert_eq!(view.state, SliceState::Editing);
    assert_eq!(view.pending_text.as_deref(), Some("Draft text."));

    quill.on_edit_input(id, "  Polished text.  ");
    assert_eq!(quill.export_text(), "Draft text.");

    assert_eq!(quill.accept(id), ActionOutcome::Applied(Some(SliceState::Idle)));
    assert_eq!(quill.export_text(), "Polished text.");
}

#[tokio::test]
async fn discard_then_accept_is_noop() {
    let client = ScriptedClient::new().with_text("Alternative.");
    let quill = seeded(client, &["Original."]);
    let id = quill.slice_ids()[0];

    quill.regenerate(id).await.unwrap();
    assert!(quill.discard(id).is_applied());

    let outcome = quill.accept(id);
    assert_eq!(
        outcome,
        ActionOutcome::Ignored(Ignored::InvalidTransition {
            state: SliceState::Idle,
            action: SliceAction::Accept,
        })
    );
    assert_eq!(quill.export_text(), "Original.");
}

#[tokio::test]
async fn generation_rejected_while_editing() {
    let quill = seeded(ScriptedClient::new().with_text("unused"), &["Text."]);
    let id = quill.slice_ids()[0];

    quill.edit(id);
    let outcome = quill.summarize(id).await.unwrap();
    assert!(!outcome.is_applied());
    assert!(quill.client().requests().is_empty());
}

#[tokio::test]
async fn bootstrap_records_topic_and_title() {
    let client = ScriptedClient::new().with_payload(json!({
        "body": {
            "generations": [{ "text": "Dogs are loyal.\n\nDogs are fun." }],
            "prompt": "Write about Dogs."
        }
    }));

    let quill = GenerationOrchestrator::bootstrap(client, QuillConfig::new(), "Dogs")
        .await
        .unwrap();

    assert_eq!(quill.client().requests()[0].prompt, format!("{DEFAULT_PROMPT_PREFIX}Dogs."));
    assert_eq!(quill.snapshot().prompt.as_deref(), Some("Dogs"));
    assert_eq!(quill.title().as_deref(), Some("Dogs"));
    assert_eq!(quill.slice_ids().len(), 2);
}

#[tokio::test]
async fn commit_events_follow_accept() {
    let client = ScriptedClient::new().with_text("New.");
    let quill = seeded(client, &["Old."]);
    let id = quill.slice_ids()[0];
    let mut events = quill.subscribe();

    quill.summarize(id).await.unwrap();
    quill.accept(id);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            DocumentEvent::SliceStateChanged { id, state: SliceState::Loading },
            DocumentEvent::SliceStateChanged { id, state: SliceState::Proposed },
            DocumentEvent::SliceCommitted { id, text: "New.".to_string() },
            DocumentEvent::SliceStateChanged { id, state: SliceState::Idle },
        ]
    );
}
