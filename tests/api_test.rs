use axum::http::StatusCode;
use sharekeeper::api;
use sharekeeper::config::{Config, EventLogLocation};
use sharekeeper::datasource::{EventLogSource, MockEventLog};
use sharekeeper::db::init_db;
use sharekeeper::domain::{ChatId, Decimal, Investor, RequestKind};
use sharekeeper::notify::{Notifier, RecordingNotifier};
use sharekeeper::orchestration::{Poller, PollerSettings};
use sharekeeper::Repository;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    config: Config,
    _temp: TempDir,
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        telegram_bot_token: "test-token".to_string(),
        telegram_api_url: "http://example.invalid".to_string(),
        event_log: EventLogLocation::Path("events.csv".to_string()),
        admin_ids: BTreeSet::from([1000]),
        reference_bank: dec("1000"),
        share_fraction: dec("0.30"),
        poll_interval: Duration::from_secs(10),
        replay_history: false,
        deposit_address: None,
        deposit_network: "TRC20".to_string(),
    };

    let app = api::create_router(api::AppState::new(repo.clone(), config.clone()));

    TestApp {
        app,
        repo,
        config,
        _temp: temp_dir,
    }
}

async fn request(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body)
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

async fn seed(t: &TestApp) {
    for (id, name, deposit, active) in [
        (101, "Alice", "600", true),
        (202, "Bob", "400", true),
        (303, "Carol", "0", false),
    ] {
        let mut inv = Investor::new(ChatId::new(id), name);
        inv.deposit = dec(deposit);
        inv.active = active;
        t.repo.upsert_investor(&inv).await.unwrap();
    }

    // Open one position and close another through the real poll path.
    let log = Arc::new(MockEventLog::new());
    let source: Arc<dyn EventLogSource> = log.clone();
    let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
    let poller = Poller::new(
        t.repo.clone(),
        source,
        notifier,
        PollerSettings {
            reference_bank: t.config.reference_bank,
            share_fraction: t.config.share_fraction,
            replay_history: false,
        },
    );
    poller.poll_once().await.unwrap();
    log.push("OPEN", "S1", "100", "");
    log.push("TP_HIT", "S1", "100", "50");
    log.push("OPEN", "S2", "250", "");
    poller.poll_once().await.unwrap();
}

#[tokio::test]
async fn test_health_and_ready() {
    let t = setup_test_app().await;

    let (status, body) = request(t.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");

    let (status, body) = request(t.app.clone(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ready");
}

#[tokio::test]
async fn test_ready_reports_unavailable_when_store_closed() {
    let t = setup_test_app().await;
    t.repo.pool().close().await;

    let (status, body) = request(t.app.clone(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json(&body)["error"].as_str().unwrap().contains("database"));
}

#[tokio::test]
async fn test_state_reports_cursor_and_totals() {
    let t = setup_test_app().await;
    seed(&t).await;

    let (status, body) = request(t.app.clone(), "/v1/state").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["lastRow"], 4);
    assert_eq!(v["initialized"], true);
    assert_eq!(v["profitTotal"], "15");
    assert_eq!(v["openPositions"], 1);
    assert_eq!(v["activeInvestors"], 2);
    assert_eq!(v["totalActiveDeposit"], "1000");
    assert_eq!(v["shareFraction"], "0.3");
}

#[tokio::test]
async fn test_positions_lists_cohorts() {
    let t = setup_test_app().await;
    seed(&t).await;

    let (status, body) = request(t.app.clone(), "/v1/positions").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    let positions = v["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["signalId"], "S2");
    assert_eq!(positions[0]["cumMargin"], "250");
    assert_eq!(positions[0]["totalEntryDeposit"], "1000");
    assert_eq!(positions[0]["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_investors_list_and_active_filter() {
    let t = setup_test_app().await;
    seed(&t).await;

    let (status, body) = request(t.app.clone(), "/v1/investors").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["investors"].as_array().unwrap().len(), 3);

    let (status, body) = request(t.app.clone(), "/v1/investors?activeOnly=true").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    let investors = v["investors"].as_array().unwrap();
    assert_eq!(investors.len(), 2);
    let alice = investors.iter().find(|i| i["chatId"] == 101).unwrap();
    assert_eq!(alice["bonusAccrued"], "9");
    assert_eq!(alice["availableBonus"], "9");
}

#[tokio::test]
async fn test_investor_detail_includes_requests_and_ledger() {
    let t = setup_test_app().await;
    seed(&t).await;
    let alice = t.repo.get_investor(ChatId::new(101)).await.unwrap().unwrap();
    t.repo
        .create_request(&alice, RequestKind::WithdrawBonus, dec("5"))
        .await
        .unwrap();

    let (status, body) = request(t.app.clone(), "/v1/investors/101").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["investor"]["name"], "Alice");
    assert_eq!(v["openRequests"].as_array().unwrap().len(), 1);
    assert_eq!(v["openRequests"][0]["kind"], "withdraw_bonus");
    let ledger = v["ledger"].as_array().unwrap();
    assert_eq!(ledger[0]["kind"], "REQUEST_WITHDRAW_BONUS");
    assert!(ledger.iter().any(|e| e["kind"] == "BONUS_ACCRUED"));
}

#[tokio::test]
async fn test_investor_detail_errors() {
    let t = setup_test_app().await;

    let (status, _) = request(t.app.clone(), "/v1/investors/555").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(t.app.clone(), "/v1/investors/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().is_some());
}
