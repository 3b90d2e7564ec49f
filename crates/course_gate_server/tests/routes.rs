use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use course_gate_client::config::Config;
use course_gate_client::fallback::FallbackDataProvider;
use course_gate_client::health::{HealthChecker, HealthProbe};
use course_gate_client::{CourseQuery, Paginated, Pagination};
use course_gate_server::{AppState, router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reqwest::{Client, StatusCode};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(backend: &str) -> Config {
    Config {
        api_base_url: backend.to_string(),
        probe_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

async fn spawn_app(cfg: &Config) -> SocketAddr {
    spawn_app_with(cfg, PrometheusBuilder::new().build_recorder().handle()).await
}

async fn spawn_app_with(cfg: &Config, metrics: PrometheusHandle) -> SocketAddr {
    let state = Arc::new(AppState::from_config(cfg, metrics).expect("state"));

    // bind to ephemeral port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::serve(listener, router(state).into_make_service());
    tokio::spawn(async move {
        server.await.ok();
    });
    addr
}

async fn mount_backend_health(backend: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(backend)
        .await;
}

#[tokio::test]
async fn backend_down_serves_bundled_catalogue() {
    let backend = MockServer::start().await;
    mount_backend_health(&backend, 503).await;
    let addr = spawn_app(&config_for(&backend.uri())).await;
    let http = Client::new();

    let res = http
        .get(format!("http://{addr}/api/courses?page=1&limit=12"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], false);

    let report: serde_json::Value = http
        .get(format!("http://{addr}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["status"], "degraded");
    assert_eq!(report["services"]["backend"]["status"], "unhealthy");

    let cats: serde_json::Value = http
        .get(format!("http://{addr}/api/courses/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cats.as_array().map(Vec::len), Some(4));

    let featured: serde_json::Value = http
        .get(format!("http://{addr}/api/courses/featured?limit=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(featured.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_course_is_404_naming_the_id() {
    let backend = MockServer::start().await;
    mount_backend_health(&backend, 503).await;
    let addr = spawn_app(&config_for(&backend.uri())).await;

    let res = Client::new()
        .get(format!("http://{addr}/api/courses/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("does-not-exist")
    );
}

#[tokio::test]
async fn healthy_backend_is_proxied() {
    let backend = MockServer::start().await;
    mount_backend_health(&backend, 200).await;
    let mut course = FallbackDataProvider::bundled()
        .course_by_id("2")
        .expect("bundled");
    course.id = "live-9".into();
    let live = Paginated {
        items: vec![course],
        pagination: Pagination::compute(1, 12, 1),
    };
    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&live))
        .expect(1)
        .mount(&backend)
        .await;
    let addr = spawn_app(&config_for(&backend.uri())).await;
    let http = Client::new();

    let page: Paginated<course_gate_client::Course> = http
        .get(format!("http://{addr}/api/courses"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.items[0].id, "live-9");

    let report: serde_json::Value = http
        .get(format!("http://{addr}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["status"], "ok");
    assert_eq!(report["services"]["backend"]["status"], "healthy");
}

#[tokio::test]
async fn malformed_query_is_400_json() {
    let backend = MockServer::start().await;
    mount_backend_health(&backend, 503).await;
    let addr = spawn_app(&config_for(&backend.uri())).await;

    let res = Client::new()
        .get(format!("http://{addr}/api/courses?page=abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn liveness_and_metrics_respond() {
    let backend = MockServer::start().await;
    let addr = spawn_app(&config_for(&backend.uri())).await;
    let http = Client::new();

    let res = http.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = http.get(format!("http://{addr}/metrics")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn checker_reads_this_services_health_report() {
    let backend = MockServer::start().await;
    mount_backend_health(&backend, 200).await;
    let addr = spawn_app(&config_for(&backend.uri())).await;

    // Direct tier points nowhere, so only the local report can vouch for the backend.
    let local = format!("http://{addr}");
    let checker = HealthChecker::new(
        "http://127.0.0.1:9",
        Some(local.as_str()),
        Duration::from_millis(500),
    )
    .expect("checker");
    assert!(checker.probe().await);

    let mut cfg = config_for("http://127.0.0.1:9");
    cfg.local_base_url = Some(local);
    let client = course_gate_client::resilient::ResilientCourseClient::from_config(&cfg)
        .expect("client");
    // Gate says healthy, the live call fails, the bundled page comes back.
    let page = course_gate_client::CourseApi::list_courses(&client, &CourseQuery::default())
        .await
        .expect("courses");
    assert!(client.health().await.healthy);
    assert_eq!(page.pagination.total, 3);
}

#[tokio::test]
async fn slow_unhealthy_backend_still_gets_bundled_catalogue() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(1500)))
        .mount(&backend)
        .await;
    // The health answer arrives well after request_timeout but inside probe_timeout.
    let cfg = Config {
        api_base_url: backend.uri(),
        probe_timeout: Duration::from_secs(3),
        request_timeout: Duration::from_millis(500),
        ..Config::default()
    };
    let addr = spawn_app(&cfg).await;

    let res = Client::new()
        .get(format!("http://{addr}/api/courses"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 3);
}

fn counter_line<'a>(rendered: &'a str, name: &str, labels: &[&str]) -> Option<&'a str> {
    rendered
        .lines()
        .filter(|l| l.starts_with(&format!("{name}{{")))
        .find(|l| labels.iter().all(|label| l.contains(label)))
}

/// Counters land in a recorder scoped to this thread; the current-thread
/// runtime keeps the server, client and gate on it.
fn scrape_after<F, Fut>(scenario: F) -> String
where
    F: FnOnce(PrometheusHandle) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    metrics::with_local_recorder(&recorder, || {
        rt.block_on(async {
            scenario(handle.clone()).await;
        })
    });
    handle.render()
}

#[test]
fn fallback_and_probe_counters_are_exported() {
    let rendered = scrape_after(|handle| async move {
        let backend = MockServer::start().await;
        mount_backend_health(&backend, 503).await;
        let addr = spawn_app_with(&config_for(&backend.uri()), handle).await;
        let http = Client::new();

        let res = http
            .get(format!("http://{addr}/api/courses"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let exported = http
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(exported.contains("course_gate_fallback_total"));
    });

    let fallback = counter_line(
        &rendered,
        "course_gate_fallback_total",
        &[r#"operation="list_courses""#, r#"reason="unhealthy""#],
    )
    .expect("fallback counter");
    assert!(fallback.ends_with(" 1"), "{fallback}");
    assert!(
        counter_line(
            &rendered,
            "course_gate_health_probes_total",
            &[r#"tier="remote""#, r#"outcome="failed""#],
        )
        .is_some()
    );
    assert!(counter_line(&rendered, "course_gate_live_total", &[]).is_none());
}

#[test]
fn live_counter_is_exported() {
    let rendered = scrape_after(|handle| async move {
        let backend = MockServer::start().await;
        mount_backend_health(&backend, 200).await;
        let live = Paginated::<course_gate_client::Course> {
            items: Vec::new(),
            pagination: Pagination::compute(1, 12, 0),
        };
        Mock::given(method("GET"))
            .and(path("/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&live))
            .mount(&backend)
            .await;
        let addr = spawn_app_with(&config_for(&backend.uri()), handle).await;

        let res = Client::new()
            .get(format!("http://{addr}/api/courses"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    });

    let live = counter_line(
        &rendered,
        "course_gate_live_total",
        &[r#"operation="list_courses""#],
    )
    .expect("live counter");
    assert!(live.ends_with(" 1"), "{live}");
    assert!(
        counter_line(
            &rendered,
            "course_gate_health_probes_total",
            &[r#"tier="remote""#, r#"outcome="healthy""#],
        )
        .is_some()
    );
    assert!(counter_line(&rendered, "course_gate_fallback_total", &[]).is_none());
}
