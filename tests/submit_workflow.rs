//! Submission workflow against an in-memory forge, repository and editor

mod common;

use common::{
    Call, MockPlatformService, MockRepository, Reply, ScriptedEditor, approved_by, github_config,
    make_client, make_config, make_draft, make_request,
};
use revstack::config::Config;
use revstack::error::{Error, ErrorClass, Result};
use revstack::stack::DetectionRule;
use revstack::submit::{NoopProgress, SubmitAction, SubmitOptions, SubmitOutcome, SubmitReport, Workflow};
use revstack::template::DraftStore;
use revstack::types::{ReviewRequestUpdate, ReviewerSet};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// main: m1 <- a1 (feature/a) <- b1 (feature/b, checked out)
fn repo() -> MockRepository {
    MockRepository::new("feature/b")
        .commit("m1", &[], "initial")
        .commit("a1", &["m1"], "feat: add storage")
        .commit("b1", &["a1"], "feat: add widgets\n\nAdds the widget API.")
        .branch("main", "m1")
        .branch("feature/a", "a1")
        .branch("feature/b", "b1")
}

/// Forge with feature/a open against main
fn forge() -> MockPlatformService {
    let mock = MockPlatformService::with_config(github_config());
    mock.add_open(make_request(1, "feature/a", "a1", "main", "m1"));
    mock
}

async fn submit(
    mock: &MockPlatformService,
    repo: &MockRepository,
    editor: &ScriptedEditor,
    config: &Config,
    options: &SubmitOptions,
) -> Result<SubmitOutcome> {
    let client = make_client(mock);
    let store = DraftStore::new(config.drafts_dir());
    Workflow::new(&client, repo, editor, &store, config, &NoopProgress)
        .execute(options)
        .await
}

fn submitted(outcome: SubmitOutcome) -> SubmitReport {
    match outcome {
        SubmitOutcome::Submitted(report) => *report,
        SubmitOutcome::Cancelled => panic!("expected a submission, got a cancel"),
    }
}

#[tokio::test]
async fn test_creates_stacked_request_with_reviewers() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.set_reviews(1, vec![approved_by("carol")]);
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::fill(
        "Ran cargo test",
        "@alice @me @acme/platform",
    )]);

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::Created);
    assert_eq!(report.number, 100);
    assert_eq!(report.base, "feature/a");
    assert_eq!(report.stack.rule, DetectionRule::Ancestry);
    assert_eq!(report.stack.context.parent.as_ref().map(|p| p.number), Some(1));
    assert!(report.warnings.is_empty());

    let creates = mock.creates();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].head, "feature/b");
    assert_eq!(creates[0].base, "feature/a");
    assert_eq!(creates[0].title, "feat: add widgets");
    assert!(!creates[0].draft);
    assert!(creates[0].body.contains("Adds the widget API."));
    assert!(creates[0].body.contains("## Test Plan\n\nRan cargo test"));

    assert_eq!(
        mock.reviewer_requests(),
        vec![(
            100,
            ReviewerSet {
                users: vec!["alice".to_string()],
                teams: vec!["platform".to_string()],
            }
        )]
    );
    assert_eq!(repo.pushes(), vec!["feature/b"]);

    let shown = &editor.seen()[0];
    assert!(shown.contains("# Stacked on #1 (feature/a)"));
    assert!(shown.contains("# suggested: @carol"));
    assert!(shown.contains("# base-branch: feature/a (read-only)"));
}

#[tokio::test]
async fn test_fast_path_pushes_once_without_editor() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_request(5, "feature/b", "b0", "feature/a", "a1"));
    let repo = repo();
    let editor = ScriptedEditor::default();

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::FastPath);
    assert_eq!(report.number, 5);
    assert!(!report.stack.base_updated);
    assert!(!report.stack.rebase_detected);
    assert_eq!(repo.pushes(), vec!["feature/b"]);
    assert_eq!(editor.calls(), 0);
    assert!(mock.creates().is_empty());
    assert!(mock.updates().is_empty());
}

#[tokio::test]
async fn test_renamed_base_is_retargeted() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_request(5, "feature/b", "b0", "main", "m1"));
    let repo = repo();
    let editor = ScriptedEditor::default();

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::FastPath);
    assert!(report.stack.base_updated);
    assert_eq!(report.base, "feature/a");
    assert_eq!(mock.updates(), vec![(5, ReviewRequestUpdate::base("feature/a"))]);
    assert_eq!(repo.pushes(), vec!["feature/b"]);
}

#[tokio::test]
async fn test_rebased_base_is_reported_without_writes() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    // The forge last saw feature/a at a commit that was since rewritten
    mock.add_open(make_request(5, "feature/b", "b0", "feature/a", "a0"));
    let repo = repo();
    let editor = ScriptedEditor::default();

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;
    let report = submitted(assert_ok!(outcome));

    assert!(report.stack.rebase_detected);
    assert!(!report.stack.base_updated);
    assert!(mock.updates().is_empty());
}

#[tokio::test]
async fn test_reviewer_failure_becomes_warning() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.fail("request_reviewers", 422);
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::fill("Ran cargo test", "@alice")]);

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::Created);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("could not request reviewers on #100"));
    assert_eq!(mock.count("request_reviewers"), 1);
}

#[tokio::test]
async fn test_validation_failure_then_continue() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = repo();

    // Saved without a test plan
    let first_editor = ScriptedEditor::new(vec![Reply::Keep]);
    let err = assert_err!(
        submit(&mock, &repo, &first_editor, &config, &SubmitOptions::default()).await
    );
    let (errors, draft) = match err {
        Error::Validation { errors, draft } => (errors, draft),
        other => panic!("expected a validation error, got {other:?}"),
    };
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Test Plan is required"));
    assert!(errors[0].contains("#1 (feature/a)"));
    assert!(draft.exists());
    assert!(repo.pushes().is_empty());
    assert!(mock.creates().is_empty());

    let saved = std::fs::read_to_string(&draft).unwrap();
    let second_editor = ScriptedEditor::new(vec![Reply::fill_test_plan("Manual QA")]);
    let resume = SubmitOptions {
        continue_mode: true,
        ..SubmitOptions::default()
    };
    let outcome = submit(&mock, &repo, &second_editor, &config, &resume).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(second_editor.seen(), vec![saved]);
    assert_eq!(report.action, SubmitAction::Created);
    assert!(mock.creates()[0].body.contains("Manual QA"));
    assert!(!draft.exists());
}

#[tokio::test]
async fn test_continue_without_saved_template_fails() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = repo();
    let editor = ScriptedEditor::default();
    let resume = SubmitOptions {
        continue_mode: true,
        ..SubmitOptions::default()
    };

    let err = assert_err!(submit(&mock, &repo, &editor, &config, &resume).await);
    assert!(matches!(err, Error::Editor(_)), "got {err:?}");
    assert_eq!(editor.calls(), 0);
}

#[tokio::test]
async fn test_editor_cancel_changes_nothing() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::Cancel]);

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;

    assert!(matches!(assert_ok!(outcome), SubmitOutcome::Cancelled));
    assert!(repo.pushes().is_empty());
    assert!(mock.creates().is_empty());
    assert_eq!(editor.calls(), 1);
}

#[tokio::test]
async fn test_trunk_branch_is_rejected() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = MockRepository::new("main")
        .commit("m1", &[], "initial")
        .branch("main", "m1");
    let editor = ScriptedEditor::default();

    let err = assert_err!(
        submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await
    );
    assert!(matches!(err, Error::Detection(_)), "got {err:?}");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_default_branch_is_a_detection_error() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = repo().without_default_branch();
    let editor = ScriptedEditor::default();

    let err = assert_err!(submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await);

    assert_eq!(err.class(), ErrorClass::Detection);
    assert!(mock.calls().is_empty());
    assert!(repo.pushes().is_empty());
}

#[tokio::test]
async fn test_ready_marks_existing_draft() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_draft(5, "feature/b", "b0", "feature/a", "a1"));
    let repo = repo();
    let editor = ScriptedEditor::default();
    let ready = SubmitOptions {
        ready: true,
        ..SubmitOptions::default()
    };

    let outcome = submit(&mock, &repo, &editor, &config, &ready).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::FastPath);
    assert!(mock.calls().contains(&Call::MarkReady(5)));
    assert_eq!(mock.request(5).map(|r| r.draft), Some(false));
}

#[tokio::test]
async fn test_draft_flag_sets_template_default() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::fill_test_plan("Ran cargo test")]);
    let draft = SubmitOptions {
        draft: true,
        ..SubmitOptions::default()
    };

    let outcome = submit(&mock, &repo, &editor, &config, &draft).await;
    submitted(assert_ok!(outcome));

    assert!(editor.seen()[0].contains("[draft]\ntrue\n"));
    assert!(mock.creates()[0].draft);
}

#[tokio::test]
async fn test_edit_flag_updates_existing_metadata() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let mut existing = make_request(5, "feature/b", "b0", "feature/a", "a1");
    existing.title = "Widgets, take two".to_string();
    mock.add_open(existing);
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::fill_test_plan("Ran cargo test")]);
    let edit = SubmitOptions {
        force_edit: true,
        ..SubmitOptions::default()
    };

    let outcome = submit(&mock, &repo, &editor, &config, &edit).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::Updated);
    assert!(editor.seen()[0].contains("[title]\nWidgets, take two\n"));
    let updates = mock.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, 5);
    assert_eq!(updates[0].1.title.as_deref(), Some("Widgets, take two"));
    assert!(updates[0].1.base.is_none());
    assert!(mock.creates().is_empty());
}

fn edit() -> SubmitOptions {
    SubmitOptions {
        force_edit: true,
        ..SubmitOptions::default()
    }
}

#[tokio::test]
async fn test_cancel_leaves_renamed_base_untouched() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_request(5, "feature/b", "b0", "main", "m1"));
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::Cancel]);

    let outcome = submit(&mock, &repo, &editor, &config, &edit()).await;

    assert!(matches!(assert_ok!(outcome), SubmitOutcome::Cancelled));
    assert!(editor.seen()[0].contains("feature/a"));
    assert!(mock.updates().is_empty());
    assert!(repo.pushes().is_empty());
}

#[tokio::test]
async fn test_validation_failure_leaves_renamed_base_untouched() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_request(5, "feature/b", "b0", "main", "m1"));
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::Keep]);

    let err = assert_err!(submit(&mock, &repo, &editor, &config, &edit()).await);

    assert!(matches!(err, Error::Validation { .. }), "got {err:?}");
    assert!(mock.updates().is_empty());
    assert!(repo.pushes().is_empty());
}

#[tokio::test]
async fn test_edit_retargets_in_the_metadata_update() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_request(5, "feature/b", "b0", "main", "m1"));
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::fill_test_plan("Ran cargo test")]);

    let outcome = submit(&mock, &repo, &editor, &config, &edit()).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::Updated);
    assert!(report.stack.base_updated);
    assert_eq!(report.base, "feature/a");
    let updates = mock.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, 5);
    assert_eq!(updates[0].1.base.as_deref(), Some("feature/a"));
    assert!(updates[0].1.body.as_deref().is_some_and(|b| b.contains("Ran cargo test")));
    assert_eq!(mock.request(5).unwrap().base.name, "feature/a");
}

#[tokio::test]
async fn test_no_edit_submits_generated_template() {
    let drafts = TempDir::new().unwrap();
    let config = Config {
        require_test_plan: false,
        ..make_config(drafts.path())
    };
    let mock = forge();
    let repo = repo();
    let editor = ScriptedEditor::default();
    let no_edit = SubmitOptions {
        skip_editor: true,
        ..SubmitOptions::default()
    };

    let outcome = submit(&mock, &repo, &editor, &config, &no_edit).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.action, SubmitAction::Created);
    assert_eq!(editor.calls(), 0);
    assert_eq!(mock.creates()[0].title, "feat: add widgets");
}

#[tokio::test]
async fn test_dependents_are_listed_in_template() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    mock.add_open(make_request(7, "feature/c", "c1", "feature/b", "b1"));
    let repo = repo();
    let editor = ScriptedEditor::new(vec![Reply::fill_test_plan("Ran cargo test")]);

    let outcome = submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await;
    let report = submitted(assert_ok!(outcome));

    assert_eq!(report.stack.context.dependents.len(), 1);
    assert!(report.stack.context.dependents[0].is_enriched());
    assert!(mock.calls().contains(&Call::ListReviews(7)));
    assert!(editor.seen()[0].contains("# WARNING: 1 open request(s) are based on 'feature/b':"));
}

#[tokio::test]
async fn test_push_failure_stops_before_forge_writes() {
    let drafts = TempDir::new().unwrap();
    let config = make_config(drafts.path());
    let mock = forge();
    let repo = repo().failing_push();
    let editor = ScriptedEditor::new(vec![Reply::fill_test_plan("Ran cargo test")]);

    let err = assert_err!(
        submit(&mock, &repo, &editor, &config, &SubmitOptions::default()).await
    );
    assert!(matches!(err, Error::Git(_)), "got {err:?}");
    assert!(mock.creates().is_empty());
}
