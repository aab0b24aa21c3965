//! Promotion gate tests

use chrono::Utc;

use relman::errors::ManifestError;
use relman::manager::{CreateOptions, RedeployDecision};
use relman::manifest::environment::Environment;

use crate::common::{FakeRegistry, FakeSourceControl, Harness, RecordingPipeline};

async fn deploy_and_validate_qa(h: &Harness, version: &str) {
    h.manager
        .record_deployment(version, "qa", Utc::now(), None)
        .await
        .unwrap();
    h.manager
        .record_validation(version, "qa", "qa-team", Utc::now(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_promote_release_end_to_end() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    assert!(h.manager.validate_version("1.2.0").await.unwrap().passed);

    let qa = h
        .manager
        .promote("1.2.0", "qa", RedeployDecision::Decline)
        .await
        .unwrap();
    assert_eq!(qa.environment, Environment::Qa);
    assert!(!qa.redeploy);

    deploy_and_validate_qa(&h, "1.2.0").await;
    h.manager
        .record_approval("1.2.0", "lead", Utc::now(), Some("CAB-42".to_string()))
        .await
        .unwrap();

    let prod = h
        .manager
        .promote("1.2.0", "prod", RedeployDecision::Decline)
        .await
        .unwrap();
    assert_eq!(prod.environment, Environment::Prod);
    assert_eq!(prod.handle.backend, "fake");

    let prod_calls: Vec<_> = h
        .pipeline
        .calls()
        .into_iter()
        .filter(|(_, env)| *env == Environment::Prod)
        .collect();
    assert_eq!(prod_calls, vec![("1.2.0".to_string(), Environment::Prod)]);

    h.cleanup().await;
}

#[tokio::test]
async fn test_promote_does_not_modify_manifest() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    let before = h.stored_text("1.2.0").await;

    h.manager
        .promote("1.2.0", "qa", RedeployDecision::Decline)
        .await
        .unwrap();
    assert_eq!(h.stored_text("1.2.0").await, before);

    h.cleanup().await;
}

#[tokio::test]
async fn test_promote_unknown_environment() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    for env in ["staging", "PROD", ""] {
        let err = h
            .manager
            .promote("1.2.0", env, RedeployDecision::Confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEnvironment(_)), "{env}");
    }
    assert!(h.pipeline.calls().is_empty());

    h.cleanup().await;
}

#[tokio::test]
async fn test_promote_unknown_version() {
    let h = Harness::new().await;

    let err = h
        .manager
        .promote("9.9.9", "qa", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::NotFound(_)));
    assert!(h.pipeline.calls().is_empty());

    h.cleanup().await;
}

#[tokio::test]
async fn test_promote_draft_is_refused() {
    let h = Harness::offline().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    let err = h
        .manager
        .promote("1.2.0", "qa", RedeployDecision::Confirm)
        .await
        .unwrap_err();
    match err {
        ManifestError::ValidationFailed(issues) => {
            assert!(issues
                .iter()
                .any(|i| i.field == "components.aap_configuration.commit"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.pipeline.calls().is_empty());

    h.cleanup().await;
}

#[tokio::test]
async fn test_prod_requires_qa_validation() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    let err = h
        .manager
        .promote("1.2.0", "prod", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::QaNotValidated(_)));

    // Approval does not substitute for QA sign-off
    h.manager
        .record_approval("1.2.0", "lead", Utc::now(), None)
        .await
        .unwrap();
    h.manager
        .record_deployment("1.2.0", "qa", Utc::now(), None)
        .await
        .unwrap();
    let err = h
        .manager
        .promote("1.2.0", "prod", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::QaNotValidated(_)));
    assert!(h.pipeline.calls().is_empty());

    h.cleanup().await;
}

#[tokio::test]
async fn test_prod_requires_approval() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    deploy_and_validate_qa(&h, "1.2.0").await;

    let err = h
        .manager
        .promote("1.2.0", "prod", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::NotApproved(_)));
    assert!(h.pipeline.calls().is_empty());

    h.cleanup().await;
}

#[tokio::test]
async fn test_prod_without_approval_requirement() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    deploy_and_validate_qa(&h, "1.2.0").await;

    let mut manifest = h.manager.load("1.2.0").await.unwrap();
    manifest.validation.approval_required = false;
    h.manager.store().update(&manifest).await.unwrap();

    h.manager
        .promote("1.2.0", "prod", RedeployDecision::Decline)
        .await
        .unwrap();
    assert_eq!(h.pipeline.calls().len(), 1);

    h.cleanup().await;
}

#[tokio::test]
async fn test_redeploy_needs_confirmation() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    h.manager
        .record_deployment("1.2.0", "qa", Utc::now(), None)
        .await
        .unwrap();
    assert!(h.manager.is_redeploy("1.2.0", "qa").await.unwrap());
    let before = h.stored_text("1.2.0").await;

    let err = h
        .manager
        .promote("1.2.0", "qa", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::RedeployDeclined { .. }));
    assert!(h.pipeline.calls().is_empty());
    assert_eq!(h.stored_text("1.2.0").await, before);

    let outcome = h
        .manager
        .promote("1.2.0", "qa", RedeployDecision::Confirm)
        .await
        .unwrap();
    assert!(outcome.redeploy);
    assert_eq!(h.pipeline.calls().len(), 1);

    h.cleanup().await;
}

#[tokio::test]
async fn test_check_promotion_is_dry_run() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    let plan = h
        .manager
        .check_promotion("1.2.0", "qa", RedeployDecision::Decline)
        .await
        .unwrap();
    assert_eq!(plan.environment, Environment::Qa);
    assert!(!plan.warnings.is_empty());
    assert!(h.pipeline.calls().is_empty());

    h.cleanup().await;
}

#[tokio::test]
async fn test_pipeline_failure_is_reported() {
    let h = Harness::with(
        FakeSourceControl::reachable(),
        FakeRegistry::reachable(),
        RecordingPipeline {
            fail: true,
            ..Default::default()
        },
    )
    .await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    let before = h.stored_text("1.2.0").await;

    let err = h
        .manager
        .promote("1.2.0", "qa", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::CollaboratorUnavailable { .. }));
    assert_eq!(h.stored_text("1.2.0").await, before);

    h.cleanup().await;
}
