//! Deployment, sign-off and approval recording tests

use chrono::{TimeZone, Utc};

use relman::errors::ManifestError;
use relman::manager::{CreateOptions, RedeployDecision};
use relman::manifest::environment::Environment;
use relman::manifest::model::ComponentRef;

use crate::common::Harness;

#[tokio::test]
async fn test_record_deployment_and_validation() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    let deployed_at = Utc.with_ymd_and_hms(2024, 11, 4, 10, 30, 0).unwrap();
    h.manager
        .record_deployment("1.2.0", "qa", deployed_at, Some("run-17".to_string()))
        .await
        .unwrap();
    h.manager
        .record_validation("1.2.0", "qa", "qa-team", Utc::now(), None)
        .await
        .unwrap();

    let manifest = h.manager.load("1.2.0").await.unwrap();
    let qa = manifest.environment(Environment::Qa).unwrap();
    assert_eq!(qa.deployed, Some(deployed_at));
    assert!(qa.validated);
    assert_eq!(qa.validated_by.as_deref(), Some("qa-team"));
    assert_eq!(qa.notes.as_deref(), Some("run-17"));
    assert!(!manifest.is_deployed(Environment::Prod));

    h.cleanup().await;
}

#[tokio::test]
async fn test_validation_requires_deployment() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    let before = h.stored_text("1.2.0").await;

    let err = h
        .manager
        .record_validation("1.2.0", "qa", "qa-team", Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::NotDeployed { .. }));
    assert_eq!(h.stored_text("1.2.0").await, before);

    h.cleanup().await;
}

#[tokio::test]
async fn test_record_requires_a_name() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    h.manager
        .record_deployment("1.2.0", "qa", Utc::now(), None)
        .await
        .unwrap();

    let err = h
        .manager
        .record_validation("1.2.0", "qa", "  ", Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::InvalidInput(_)));

    let err = h
        .manager
        .record_approval("1.2.0", "", Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::InvalidInput(_)));

    h.cleanup().await;
}

#[tokio::test]
async fn test_record_unknown_environment() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    let err = h
        .manager
        .record_deployment("1.2.0", "staging", Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::InvalidEnvironment(_)));

    h.cleanup().await;
}

#[tokio::test]
async fn test_record_approval() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    let manifest = h
        .manager
        .record_approval("1.2.0", "lead", Utc::now(), Some("CAB-42".to_string()))
        .await
        .unwrap();
    assert_eq!(manifest.validation.approved_by.as_deref(), Some("lead"));
    assert!(manifest.validation.is_approved());

    let stored = h.manager.load("1.2.0").await.unwrap();
    assert_eq!(stored, manifest);

    h.cleanup().await;
}

#[tokio::test]
async fn test_record_test_passed_once() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();

    h.manager
        .record_test_passed("1.2.0", "smoke-tests")
        .await
        .unwrap();
    let manifest = h
        .manager
        .record_test_passed("1.2.0", "smoke-tests")
        .await
        .unwrap();

    assert_eq!(manifest.validation.tests_passed, vec!["smoke-tests".to_string()]);
    assert_eq!(
        manifest.validation.pending_tests(),
        vec!["integration-tests", "security-scan"]
    );

    h.cleanup().await;
}

#[tokio::test]
async fn test_components_are_immutable() {
    let h = Harness::new().await;
    h.manager
        .create("1.2.0", CreateOptions::default())
        .await
        .unwrap();
    let before = h.stored_text("1.2.0").await;

    let mut manifest = h.manager.load("1.2.0").await.unwrap();
    manifest.components.insert(
        "aap_configuration".to_string(),
        ComponentRef::source(
            "https://git.example.com/aap-config.git",
            "1111111111111111111111111111111111111111",
            "main",
        ),
    );

    let err = h.manager.store().update(&manifest).await.unwrap_err();
    assert!(matches!(err, ManifestError::ImmutableField { ref field, .. } if field == "components"));
    assert_eq!(h.stored_text("1.2.0").await, before);

    h.cleanup().await;
}

#[tokio::test]
async fn test_list_and_summary() {
    let h = Harness::new().await;
    for version in ["1.10.0", "1.2.0", "1.3.0"] {
        h.manager
            .create(version, CreateOptions::default())
            .await
            .unwrap();
    }
    h.dir.file("notes.txt").write_string("ignored").await.unwrap();

    assert_eq!(
        h.manager.list().await.unwrap(),
        vec!["1.10.0".to_string(), "1.2.0".to_string(), "1.3.0".to_string()]
    );

    let summary = h.manager.summary("1.2.0").await.unwrap();
    assert_eq!(summary.version, "1.2.0");
    assert_eq!(summary.components.len(), 3);
    assert!(summary.components.iter().all(|c| !c.draft));
    assert_eq!(summary.environments.len(), 2);
    assert!(summary.approval_required);
    assert!(summary.approved_by.is_none());
    assert!(summary.validation.passed);

    h.cleanup().await;
}

#[tokio::test]
async fn test_document_must_match_its_file_name() {
    let h = Harness::new().await;
    h.manager
        .create("1.1.0", CreateOptions::default())
        .await
        .unwrap();
    let original = h.stored_text("1.1.0").await;
    h.dir
        .file("release-1.2.0.yaml")
        .write_string(&original)
        .await
        .unwrap();

    let err = h
        .manager
        .record_approval("1.2.0", "lead", Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::MalformedDocument(_)));

    let err = h
        .manager
        .promote("1.2.0", "qa", RedeployDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::MalformedDocument(_)));

    let err = h.manager.validate_version("1.2.0").await.unwrap_err();
    assert!(matches!(err, ManifestError::MalformedDocument(_)));

    assert!(h.pipeline.calls().is_empty());
    assert_eq!(h.stored_text("1.1.0").await, original);
    assert_eq!(h.stored_text("1.2.0").await, original);

    h.cleanup().await;
}
