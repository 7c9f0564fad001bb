//! End-to-end session tests against a scripted backend.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use rulewatch_core::response::{ScoreBand, Severity};
use rulewatch_core::session::FALLBACK_NOTICE;
use rulewatch_core::{
    AgentResponse, Attachment, BackendError, Capability, ResponseKind, Role, Session,
    SessionState,
};
use rulewatch_test_utils::backend::ScriptedBackend;
use rulewatch_test_utils::config::TestConfigBuilder;
use rulewatch_test_utils::fixtures::{compliance_reply, extraction_reply, qa_reply, sample_catalog};
use rulewatch_test_utils::tracing_setup::init_test_tracing;

fn session(backend: Arc<ScriptedBackend>) -> Session {
    let config = TestConfigBuilder::new().short_capability_ids().build();
    Session::new(backend, config.backend.capabilities, sample_catalog())
}

#[tokio::test]
async fn test_three_capabilities_in_one_conversation() {
    init_test_tracing();
    let backend = ScriptedBackend::new()
        .reply(extraction_reply())
        .reply(compliance_reply(0))
        .reply(qa_reply("Cash is capped at 10% of NAV."));
    let mut session = session(backend.clone());

    let pdf = Attachment::new("IMA_Guidelines_Dec2024.pdf", b"%PDF-1.7".to_vec());
    session.submit("Here is the new guideline", Some(pdf)).await.unwrap();
    session.submit("Check portfolio compliance", None).await.unwrap();
    session.submit("What are current cash limits?", None).await.unwrap();

    let sent: Vec<String> = backend
        .requests()
        .into_iter()
        .map(|r| r.capability_id)
        .collect();
    assert_eq!(sent, vec!["extract", "check", "answer"]);
    assert!(backend.requests()[0].attachment.is_some());

    let kinds: Vec<Option<ResponseKind>> = session
        .log()
        .turns()
        .iter()
        .map(|t| t.response.as_ref().map(AgentResponse::kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            None,
            Some(ResponseKind::RuleExtraction),
            None,
            Some(ResponseKind::ComplianceCheck),
            None,
            Some(ResponseKind::QuestionAnswer),
        ]
    );
    assert_eq!(
        session.log().turns()[0].content,
        "Here is the new guideline [Attached: IMA_Guidelines_Dec2024.pdf]"
    );
}

#[tokio::test]
async fn test_zero_score_report_details() {
    let backend = ScriptedBackend::new().reply(compliance_reply(0));
    let mut session = session(backend);

    let turn = session.submit("compliance please", None).await.unwrap();
    let Some(AgentResponse::ComplianceCheck(report)) = &session.log().get(turn).unwrap().response
    else {
        panic!("expected a compliance report");
    };
    assert_eq!(report.band(), ScoreBand::Critical);
    assert_eq!(report.breach_report[0].severity(), Severity::High);
    assert_eq!(report.rebalancing_actions.len(), 1);
}

#[tokio::test]
async fn test_failure_then_recovery() {
    let backend = ScriptedBackend::new()
        .fail(BackendError::Timeout)
        .reply(qa_reply("ok"));
    let mut session = session(backend);

    let failed = session.submit("hello", None).await.unwrap();
    assert_eq!(session.log().get(failed).unwrap().content, FALLBACK_NOTICE);
    assert_eq!(session.state(), SessionState::Idle);

    let ok = session.submit("hello again", None).await.unwrap();
    assert_eq!(session.log().get(ok).unwrap().content, "ok");
}

#[tokio::test]
async fn test_late_reply_after_cancel_is_dropped() {
    let backend = ScriptedBackend::new().reply(qa_reply("late"));
    let mut session = session(backend.clone());

    let pending = session.begin("what changed?", None).unwrap();
    assert_eq!(pending.capability, Capability::AnswerQuestion);
    session.cancel();

    let outcome = session.backend().call(&pending.request).await;
    assert!(session.complete(pending.ticket, outcome).is_none());

    let roles: Vec<Role> = session.log().turns().iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User]);
}

#[tokio::test]
async fn test_spawned_call_completes_in_order() {
    let backend = ScriptedBackend::new().reply(qa_reply("done"));
    let mut session = session(backend);

    let pending = session.begin("what is the cash limit", None).unwrap();
    let handle = {
        let backend = session.backend();
        let request = pending.request.clone();
        tokio::spawn(async move { backend.call(&request).await })
    };

    assert!(session.begin("impatient second question", None).is_err());

    let outcome = handle.await.unwrap();
    let turn = session.complete(pending.ticket, outcome).unwrap();
    assert_eq!(session.log().last().unwrap().id, turn);
    assert_eq!(session.log().len(), 2);
}

#[test]
fn test_active_version_defaults_to_latest() {
    let mut session = session(ScriptedBackend::new());
    assert_eq!(session.active_version().unwrap().id, "v4");

    session.select_version("v2").unwrap();
    assert_eq!(session.active_version().unwrap().label, "v2024.2");
}
