//! Full runs of the `walle` stack against a mocked wallet backend

use std::sync::Arc;
use std::time::Duration;
use walle_http::{ClientConfig, HttpWalletClient};
use walle_runtime::{LoadRunner, RunnerConfig};
use walle_workload::{journeys, Archetype, ThinkTime, WorkloadProfile};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn new_user_profile(host: &str) -> WorkloadProfile {
    let archetype = Archetype::new(
        "new_user",
        journeys::new_user().unwrap(),
        1.0,
        ThinkTime::between_secs(0.05, 0.1).unwrap(),
    )
    .unwrap();

    WorkloadProfile {
        archetypes: vec![archetype],
        ..WorkloadProfile::mixed().unwrap()
    }
    .with_users(2)
    .with_spawn_rate(20.0)
    .with_run_time(Duration::from_millis(1500))
    .with_host(host)
}

fn runner_for(server: &MockServer) -> LoadRunner {
    let client = HttpWalletClient::new(ClientConfig::for_host(&server.uri()).unwrap()).unwrap();
    let config = RunnerConfig {
        seed: Some(3),
        host: server.uri(),
        ..RunnerConfig::default()
    };
    LoadRunner::new(Arc::new(client), new_user_profile(&server.uri()), config).unwrap()
}

#[tokio::test]
async fn test_rejected_login_skips_every_step() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/wallet/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let report = runner_for(&server).run().await.unwrap();
    let stats = &report.statistics;

    // Only registrations succeed; every login attempt is a failure
    assert!(stats.total_requests >= 4);
    assert_eq!(stats.total_failures, stats.total_requests - 2);
    assert!(stats.skipped > 0);
    assert!(report
        .failure_breakdown
        .keys()
        .all(|key| key.starts_with("/auth/login")));
}

#[tokio::test]
async fn test_healthy_backend_passes_without_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "access_token=jwt-e2e; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "balance": "250.50" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/wallet/(topup/manual|deposit)$"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let report = runner_for(&server).run().await.unwrap();
    let stats = &report.statistics;

    assert!(stats.total_requests > 4);
    assert_eq!(stats.total_failures, 0);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.peak_users, 2);
    assert!(report.failure_breakdown.is_empty());
    let names: Vec<&str> = report.endpoints.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"/auth/register"));
    assert!(names.contains(&"/auth/login"));
}
