use anyhow::{Result, anyhow};

use certificate_creator_lib::core::types::{CertificateStatus, ChangeAction};
use certificate_creator_lib::{CertificateError, CertificateResult, create_certificate};

use super::test_utils::{
    FakeAuthority, FakeDns, RecordingSink, config, services, tags, validation_record_name,
    validation_record_value, zone,
};

#[tokio::test(start_paused = true)]
async fn single_domain_gets_one_create_batch_then_waits() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let config = config("app.example.com", &["Z1"]);

    let record = create_certificate(services(&authority, &dns, &sink), &config)
        .await?
        .ok_or_else(|| anyhow!("expected a certificate"))?;

    assert_eq!(record.status, CertificateStatus::Issued);
    assert_eq!(record.validation_options.len(), 1);

    let batches = dns.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].zone_id, "Z1");
    assert_eq!(
        batches[0].comment,
        "DNS validation for certificate app.example.com"
    );
    let change = &batches[0].changes[0];
    assert_eq!(batches[0].changes.len(), 1);
    assert_eq!(change.action, ChangeAction::Create);
    assert_eq!(change.name, validation_record_name("app.example.com"));
    assert_eq!(change.values, vec![validation_record_value("app.example.com")]);
    assert_eq!(change.record_type, "CNAME");
    assert_eq!(change.ttl, 60);

    assert_eq!(authority.calls("wait_until_validated"), 1);
    assert_eq!(
        sink.results(),
        vec![CertificateResult {
            certificate_arn: record.arn.clone(),
            domain: "app.example.com".to_string(),
        }]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn second_run_reuses_the_certificate() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1"]);
    config.tags = tags(&[("team", "edge")]);

    let first = create_certificate(services(&authority, &dns, &sink), &config).await?;
    let records_after_first = dns.records("Z1");
    let second = create_certificate(services(&authority, &dns, &sink), &config).await?;

    let first = first.ok_or_else(|| anyhow!("first run returned nothing"))?;
    let second = second.ok_or_else(|| anyhow!("second run returned nothing"))?;
    assert_eq!(first.arn, second.arn);
    assert_eq!(authority.certificate_count(), 1);
    assert_eq!(authority.calls("request_certificate"), 1);
    assert_eq!(dns.batches().len(), 1);
    assert_eq!(dns.records("Z1"), records_after_first);
    assert_eq!(authority.tags_of(&first.arn), tags(&[("team", "edge")]));
    assert_eq!(sink.results().len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn idempotency_token_is_sent_with_the_request() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1"]);
    config.idempotency_token = Some("deploy42".to_string());

    create_certificate(services(&authority, &dns, &sink), &config).await?;

    let requests = authority.state().requests.clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].idempotency_token.as_deref(), Some("deploy42"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn alternative_names_are_routed_to_their_own_zones() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com"), zone("Z2", "other.org")]);
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1", "Z2"]);
    config.subject_alternative_names = vec![
        "*.app.example.com".to_string(),
        "api.other.org".to_string(),
    ];

    create_certificate(services(&authority, &dns, &sink), &config).await?;

    let batches = dns.batches();
    assert_eq!(batches.len(), 2);
    let z1 = batches
        .iter()
        .find(|batch| batch.zone_id == "Z1")
        .ok_or_else(|| anyhow!("no batch for Z1"))?;
    let z2 = batches
        .iter()
        .find(|batch| batch.zone_id == "Z2")
        .ok_or_else(|| anyhow!("no batch for Z2"))?;

    // The wildcard shares the base name's record.
    assert_eq!(z1.changes.len(), 1);
    assert_eq!(z1.changes[0].name, validation_record_name("app.example.com"));
    assert_eq!(z2.changes.len(), 1);
    assert_eq!(z2.changes[0].name, validation_record_name("api.other.org"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn longest_matching_zone_wins() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "b.com"), zone("Z2", "a.b.com")]);
    let sink = RecordingSink::default();
    let mut config = config("x.a.b.com", &["Z1", "Z2"]);
    config.subject_alternative_names = vec!["y.b.com".to_string()];

    create_certificate(services(&authority, &dns, &sink), &config).await?;

    let z1 = dns.records("Z1");
    let z2 = dns.records("Z2");
    assert_eq!(z1.len(), 1);
    assert_eq!(z1[0].name, validation_record_name("y.b.com"));
    assert_eq!(z2.len(), 1);
    assert_eq!(z2[0].name, validation_record_name("x.a.b.com"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn uncovered_name_fails_before_any_mutation() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1"]);
    config.subject_alternative_names = vec!["api.other.org".to_string()];

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("uncovered name must fail");

    assert!(matches!(err, CertificateError::Configuration(_)));
    assert!(err.to_string().contains("api.other.org"));
    assert_eq!(authority.calls("request_certificate"), 0);
    assert_eq!(authority.calls("add_tags"), 0);
    assert!(dns.batches().is_empty());
    assert!(sink.results().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_zone_is_a_configuration_error() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let config = config("app.example.com", &["Z9"]);

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("missing zone must fail");

    assert!(err.to_string().contains("no hosted zone for domain app.example.com found"));
    assert_eq!(authority.calls("request_certificate"), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn tags_are_replaced_not_merged() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let arn = authority.seed("app.example.com", CertificateStatus::Issued);
    authority
        .state()
        .tags
        .insert(arn.clone(), tags(&[("A", "1"), ("B", "2")]));

    let mut config = config("app.example.com", &["Z1"]);
    config.tags = tags(&[("B", "3"), ("C", "4")]);
    create_certificate(services(&authority, &dns, &sink), &config).await?;

    assert_eq!(authority.tags_of(&arn), tags(&[("B", "3"), ("C", "4")]));
    assert_eq!(authority.calls("remove_tags"), 1);
    assert_eq!(authority.calls("add_tags"), 1);
    assert_eq!(authority.calls("request_certificate"), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn existing_record_conflicts_without_rewrite() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    dns.add_record(
        "Z1",
        &validation_record_name("app.example.com"),
        "CNAME",
        "stale.acm-validations.aws.",
        60,
    );
    let config = config("app.example.com", &["Z1"]);

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("CREATE over an existing record must fail");

    assert!(matches!(err, CertificateError::Service { .. }));
    assert_eq!(dns.batches()[0].changes[0].action, ChangeAction::Create);
    assert_eq!(authority.calls("wait_until_validated"), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rewrite_upserts_existing_record() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    dns.add_record(
        "Z1",
        &validation_record_name("app.example.com"),
        "CNAME",
        "stale.acm-validations.aws.",
        60,
    );
    let mut config = config("app.example.com", &["Z1"]);
    config.rewrite_records = true;

    create_certificate(services(&authority, &dns, &sink), &config).await?;

    assert_eq!(dns.batches()[0].changes[0].action, ChangeAction::Upsert);
    let records = dns.records("Z1");
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].values,
        vec![validation_record_value("app.example.com")]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pending_certificate_resumes_with_missing_records_only() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let arn = authority.seed("app.example.com", CertificateStatus::PendingValidation);
    let config = config("app.example.com", &["Z1"]);

    let record = create_certificate(services(&authority, &dns, &sink), &config)
        .await?
        .ok_or_else(|| anyhow!("expected a certificate"))?;

    assert_eq!(record.arn, arn);
    assert_eq!(record.status, CertificateStatus::Issued);
    assert_eq!(authority.calls("request_certificate"), 0);
    assert_eq!(authority.calls("wait_until_validated"), 1);
    assert_eq!(dns.batches().len(), 1);
    assert_eq!(dns.records("Z1").len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pending_certificate_with_records_in_place_only_waits() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    authority.seed("app.example.com", CertificateStatus::PendingValidation);
    dns.add_record(
        "Z1",
        &validation_record_name("app.example.com"),
        "CNAME",
        &validation_record_value("app.example.com"),
        60,
    );
    let config = config("app.example.com", &["Z1"]);

    create_certificate(services(&authority, &dns, &sink), &config).await?;

    assert!(dns.batches().is_empty());
    assert_eq!(authority.calls("wait_until_validated"), 1);
    assert_eq!(sink.results().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_certificate_is_returned_as_is() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    authority.seed("app.example.com", CertificateStatus::Failed);
    let config = config("app.example.com", &["Z1"]);

    let record = create_certificate(services(&authority, &dns, &sink), &config)
        .await?
        .ok_or_else(|| anyhow!("expected a certificate"))?;

    assert_eq!(record.status, CertificateStatus::Failed);
    assert_eq!(authority.calls("request_certificate"), 0);
    assert_eq!(authority.calls("wait_until_validated"), 0);
    assert!(dns.batches().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn existing_certificate_is_found_past_the_first_page() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    authority.seed("a.example.com", CertificateStatus::Issued);
    authority.seed("b.example.com", CertificateStatus::Issued);
    let arn = authority.seed("app.example.com", CertificateStatus::Issued);
    authority.state().page_size = 1;
    let config = config("app.example.com", &["Z1"]);

    let record = create_certificate(services(&authority, &dns, &sink), &config)
        .await?
        .ok_or_else(|| anyhow!("expected a certificate"))?;

    assert_eq!(record.arn, arn);
    assert_eq!(authority.calls("list_certificates"), 3);
    assert_eq!(authority.calls("request_certificate"), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn missing_validation_metadata_is_a_service_error() -> Result<()> {
    let authority = FakeAuthority::default();
    authority.state().omit_validation_options = true;
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let config = config("app.example.com", &["Z1"]);

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("missing validation options must fail");

    assert!(matches!(err, CertificateError::Service { .. }));
    assert!(dns.batches().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_validation_is_propagated() -> Result<()> {
    let authority = FakeAuthority::default();
    authority.state().fail_validation = true;
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let config = config("app.example.com", &["Z1"]);

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("validation failure must fail the run");

    assert!(err.to_string().contains("FAILED"));
    assert!(sink.results().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sink_failure_fails_the_run_and_next_run_reuses_certificate() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let failing = RecordingSink::failing();
    let config = config("app.example.com", &["Z1"]);

    let err = create_certificate(services(&authority, &dns, &failing), &config)
        .await
        .expect_err("sink failure must fail the run");
    assert!(matches!(err, CertificateError::ResultSink(_)));
    assert_eq!(authority.certificate_count(), 1);

    let sink = RecordingSink::default();
    create_certificate(services(&authority, &dns, &sink), &config).await?;
    assert_eq!(authority.calls("request_certificate"), 1);
    assert_eq!(sink.results().len(), 1);
    Ok(())
}

#[tokio::test]
async fn disabled_configuration_does_nothing() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1"]);
    config.enabled = false;

    let record = create_certificate(services(&authority, &dns, &sink), &config).await?;

    assert!(record.is_none());
    assert!(authority.state().calls.is_empty());
    assert!(dns.batches().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn configured_tags_travel_with_the_request() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1"]);
    config.tags = tags(&[("env", "prod"), ("team", "edge")]);

    create_certificate(services(&authority, &dns, &sink), &config).await?;

    let requests = authority.state().requests.clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tags, tags(&[("env", "prod"), ("team", "edge")]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pending_certificate_with_changed_names_is_a_configuration_error() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com")]);
    let sink = RecordingSink::default();
    authority.seed("app.example.com", CertificateStatus::PendingValidation);
    let mut config = config("app.example.com", &["Z1"]);
    config.subject_alternative_names = vec!["www.example.com".to_string()];

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("names differing from the pending certificate must fail");

    assert!(matches!(err, CertificateError::Configuration(_)));
    assert!(err.to_string().contains("www.example.com"));
    assert_eq!(authority.calls("request_certificate"), 0);
    assert_eq!(authority.calls("wait_until_validated"), 0);
    assert!(dns.batches().is_empty());
    assert!(sink.results().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_zone_stops_the_run_before_waiting() -> Result<()> {
    let authority = FakeAuthority::default();
    let dns = FakeDns::with_zones(vec![zone("Z1", "example.com"), zone("Z2", "other.org")]);
    dns.state().rejected_zones.push("Z2".to_string());
    let sink = RecordingSink::default();
    let mut config = config("app.example.com", &["Z1", "Z2"]);
    config.subject_alternative_names = vec!["api.other.org".to_string()];

    let err = create_certificate(services(&authority, &dns, &sink), &config)
        .await
        .expect_err("a rejected zone must fail the run");

    assert!(matches!(err, CertificateError::Service { .. }));
    assert!(err.to_string().contains("Z2"));
    assert!(dns.batches().iter().any(|batch| batch.zone_id == "Z1"));
    assert_eq!(authority.calls("wait_until_validated"), 0);
    assert!(sink.results().is_empty());
    Ok(())
}
