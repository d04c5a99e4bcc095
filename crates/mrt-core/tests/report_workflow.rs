//! Reporting workflow state machine against real stores.

use chrono::Utc;

use mrt_core::memory::{FailingReportStore, MemoryReportStore};
use mrt_core::report::{ReportReason, ReportWorkflow, WorkflowState};

#[tokio::test]
async fn submit_without_reason_attempts_no_store_write() {
    let store = MemoryReportStore::new();
    let mut wf = ReportWorkflow::new("5551234", Some("u1".to_string()), None);

    assert!(wf.submit(&store).await.is_err());
    assert!(store.all().await.is_empty());
    assert_eq!(wf.state(), WorkflowState::Idle);
}

#[tokio::test]
async fn submit_without_user_attempts_no_store_write() {
    let store = MemoryReportStore::new();
    let mut wf = ReportWorkflow::new("5551234", None, None);
    wf.choose(ReportReason::Spam).unwrap();

    assert!(wf.submit(&store).await.is_err());
    assert!(store.all().await.is_empty());
    // The chosen reason survives; only sign-in is missing.
    assert_eq!(wf.state(), WorkflowState::ReasonChosen(ReportReason::Spam));
}

#[tokio::test]
async fn successful_submit_persists_one_record_with_server_timestamp() {
    let store = MemoryReportStore::new();
    let start = Utc::now();
    let mut wf = ReportWorkflow::new(
        "5551234",
        Some("u1".to_string()),
        Some("visit http://bit.ly/x".to_string()),
    );
    wf.choose(ReportReason::Spam).unwrap();

    let report = wf.submit(&store).await.unwrap();
    assert_eq!(report.number, "5551234");
    assert_eq!(report.reason, ReportReason::Spam);
    assert_eq!(report.reported_by, "u1");
    assert!(report.reported_at >= start);
    assert_eq!(wf.state(), WorkflowState::Submitted);

    let persisted = store.all().await;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].body.as_deref(), Some("visit http://bit.ly/x"));
}

#[tokio::test]
async fn double_submit_cannot_double_write() {
    let store = MemoryReportStore::new();
    let mut wf = ReportWorkflow::new("5551234", Some("u1".to_string()), None);
    wf.choose(ReportReason::Fraud).unwrap();

    wf.submit(&store).await.unwrap();
    assert!(wf.submit(&store).await.is_err());
    assert!(wf.choose(ReportReason::Spam).is_err());
    assert_eq!(store.all().await.len(), 1);
}

#[tokio::test]
async fn store_failure_keeps_the_workflow_retryable() {
    let failing = FailingReportStore;
    let working = MemoryReportStore::new();
    let mut wf = ReportWorkflow::new("5551234", Some("u1".to_string()), None);
    wf.choose(ReportReason::Threat).unwrap();

    assert!(wf.submit(&failing).await.is_err());
    // No partial record; the workflow stays at ReasonChosen.
    assert_eq!(wf.state(), WorkflowState::ReasonChosen(ReportReason::Threat));

    // A fresh user-initiated submit succeeds.
    let report = wf.submit(&working).await.unwrap();
    assert_eq!(report.reason, ReportReason::Threat);
    assert_eq!(working.all().await.len(), 1);
}

#[tokio::test]
async fn report_history_filters_by_reporter_equality() {
    use mrt_core::report::{ReportDraft, ReportStore};

    let store = MemoryReportStore::new();
    for (user, number) in [("u1", "111"), ("u2", "222"), ("u1", "333")] {
        store
            .submit(ReportDraft {
                number: number.to_string(),
                reason: ReportReason::Spam,
                reported_by: user.to_string(),
                body: None,
            })
            .await
            .unwrap();
    }

    let mine = store.list_by_reporter(&"u1".to_string()).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|r| r.reported_by == "u1"));
}
