//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for both the community site and the
//! Steam Web API, and run the full crawl cycle end-to-end against a real
//! SQLite database.

use serde_json::json;
use std::path::Path;
use steam_ripple::config::{Config, CrawlerConfig, OutputConfig, SteamConfig, UserAgentConfig};
use steam_ripple::crawler::run_crawl;
use steam_ripple::storage::{NewNode, NodeStore, RunStatus, SqliteStorage};
use steam_ripple::{FlagStatus, NodeId, NodeStatus};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALICE: &str = "76561197960000001";
const BOB: &str = "76561197960000002";
const CAROL: &str = "76561197960000003";

/// Creates a test configuration pointing both Steam endpoints at the mock server
fn create_test_config(server_uri: &str, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            worker_id: "test-worker".to_string(),
            seed: None,
            request_timeout_secs: 5,
            max_retries: 0,
            retry_base_delay_ms: 1,
            request_delay_ms: 0,
            stale_after_secs: 3600,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        steam: SteamConfig {
            api_key: Some("test-key".to_string()),
            community_url: server_uri.to_string(),
            api_url: server_uri.to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
        },
    }
}

fn friends_page(links: &[String]) -> String {
    let blocks: String = links
        .iter()
        .map(|href| {
            format!(
                r#"<div class="friend_block_v2"><a class="selectable_overlay" href="{}"></a></div>"#,
                href
            )
        })
        .collect();
    format!(
        "<html><body><div id=\"search_results\">{}</div></body></html>",
        blocks
    )
}

async fn mount_friends(server: &MockServer, id: &str, links: &[String]) {
    Mock::given(method("GET"))
        .and(path(format!("/profiles/{}/friends/", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(friends_page(links))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Mounts summary and ban lookups for one player, each expected exactly once
async fn mount_player(server: &MockServer, id: &str, name: &str, vac_banned: bool) {
    let vac_bans = u32::from(vac_banned);

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
        .and(query_param("key", "test-key"))
        .and(query_param("steamids", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "players": [ { "steamid": id, "personaname": name } ] }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerBans/v1/"))
        .and(query_param("key", "test-key"))
        .and(query_param("steamids", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "players": [ {
                "SteamId": id,
                "CommunityBanned": false,
                "VACBanned": vac_banned,
                "NumberOfVACBans": vac_bans,
                "DaysSinceLastBan": 0,
                "NumberOfGameBans": 0,
                "EconomyBan": "none"
            } ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn open(db_path: &Path) -> SqliteStorage {
    SqliteStorage::new(db_path).expect("Failed to open database")
}

#[tokio::test]
async fn test_full_crawl_from_seed() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    // Alice links to Bob by id and to Carol by vanity name
    mount_friends(
        &mock_server,
        ALICE,
        &[
            format!("{}/profiles/{}/", base, BOB),
            format!("{}/id/carol/", base),
        ],
    )
    .await;
    mount_friends(&mock_server, BOB, &[format!("{}/profiles/{}/", base, ALICE)]).await;
    mount_friends(&mock_server, CAROL, &[]).await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/ResolveVanityURL/v1/"))
        .and(query_param("vanityurl", "carol"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "success": 1, "steamid": CAROL }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_player(&mock_server, ALICE, "alice", false).await;
    mount_player(&mock_server, BOB, "bob", true).await;
    mount_player(&mock_server, CAROL, "carol", false).await;

    let config = create_test_config(&base, &db_path);
    let summary = run_crawl(&config, "test-hash", Some(ALICE))
        .await
        .expect("Crawl failed");

    assert_eq!(summary.nodes_processed, 3);
    assert_eq!(summary.neighbors_inserted, 2);
    assert_eq!(summary.neighbors_known, 1);
    assert!(!summary.cancelled);

    let storage = open(&db_path);
    assert_eq!(storage.count_total().unwrap(), 3);
    assert_eq!(storage.count_by_status(NodeStatus::Done).unwrap(), 3);

    let bob = storage.get_node(&NodeId::new(BOB)).unwrap().unwrap();
    assert_eq!(bob.display_name.as_deref(), Some("bob"));
    assert_eq!(bob.flag_status, FlagStatus::VacBanned);
    assert_eq!(bob.origin_worker, "test-worker");

    let carol = storage.get_node(&NodeId::new(CAROL)).unwrap().unwrap();
    assert_eq!(carol.display_name.as_deref(), Some("carol"));
    assert_eq!(carol.flag_status, FlagStatus::Clean);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_resumes_from_stored_frontier() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    // A previous run left Bob pending
    {
        let mut storage = open(&db_path);
        storage
            .insert_new(&NewNode {
                id: NodeId::new(BOB),
                display_name: Some("bob".to_string()),
                flag_status: FlagStatus::Clean,
                origin_worker: "earlier-worker".to_string(),
            })
            .unwrap();
    }

    mount_friends(&mock_server, BOB, &[format!("{}/profiles/{}/", base, CAROL)]).await;
    mount_friends(&mock_server, CAROL, &[]).await;
    mount_player(&mock_server, CAROL, "carol", false).await;

    let config = create_test_config(&base, &db_path);
    let summary = run_crawl(&config, "test-hash", None)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.nodes_processed, 2);

    let storage = open(&db_path);
    let bob = storage.get_node(&NodeId::new(BOB)).unwrap().unwrap();
    assert_eq!(bob.status, NodeStatus::Done);
    assert_eq!(bob.origin_worker, "earlier-worker");
    assert_eq!(
        storage.get_node(&NodeId::new(CAROL)).unwrap().unwrap().status,
        NodeStatus::Done
    );
}

#[tokio::test]
async fn test_extraction_failure_marks_node_done() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    Mock::given(method("GET"))
        .and(path(format!("/profiles/{}/friends/", ALICE)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_player(&mock_server, ALICE, "alice", false).await;

    let config = create_test_config(&base, &db_path);
    let summary = run_crawl(&config, "test-hash", Some(ALICE))
        .await
        .expect("Crawl failed");

    assert_eq!(summary.extraction_failures, 1);
    assert_eq!(summary.nodes_processed, 1);

    let storage = open(&db_path);
    assert_eq!(storage.count_total().unwrap(), 1);
    assert_eq!(
        storage.get_node(&NodeId::new(ALICE)).unwrap().unwrap().status,
        NodeStatus::Done
    );
}

#[tokio::test]
async fn test_unknown_vanity_is_skipped() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    mount_friends(
        &mock_server,
        ALICE,
        &[
            format!("{}/id/ghost/", base),
            format!("{}/profiles/{}/", base, BOB),
        ],
    )
    .await;
    mount_friends(&mock_server, BOB, &[]).await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/ResolveVanityURL/v1/"))
        .and(query_param("vanityurl", "ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "success": 42, "message": "No match" }
        })))
        .mount(&mock_server)
        .await;

    mount_player(&mock_server, ALICE, "alice", false).await;
    mount_player(&mock_server, BOB, "bob", false).await;

    let config = create_test_config(&base, &db_path);
    let summary = run_crawl(&config, "test-hash", Some(ALICE))
        .await
        .expect("Crawl failed");

    assert_eq!(summary.references_skipped, 1);
    assert_eq!(summary.neighbors_inserted, 1);
    assert_eq!(open(&db_path).count_total().unwrap(), 2);
}

#[tokio::test]
async fn test_enrichment_failure_stores_unknowns() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    mount_friends(&mock_server, ALICE, &[format!("{}/profiles/{}/", base, BOB)]).await;
    mount_friends(&mock_server, BOB, &[]).await;
    mount_player(&mock_server, ALICE, "alice", false).await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
        .and(query_param("steamids", BOB))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerBans/v1/"))
        .and(query_param("steamids", BOB))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "players": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base, &db_path);
    let summary = run_crawl(&config, "test-hash", Some(ALICE))
        .await
        .expect("Crawl failed");

    assert_eq!(summary.neighbors_inserted, 1);

    let bob = open(&db_path).get_node(&NodeId::new(BOB)).unwrap().unwrap();
    assert_eq!(bob.display_name, None);
    assert_eq!(bob.flag_status, FlagStatus::Unknown);
    assert_eq!(bob.status, NodeStatus::Done);
}

#[tokio::test]
async fn test_unreachable_database_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("missing-dir").join("crawl.db");

    let config = create_test_config("http://127.0.0.1:9", &db_path);
    let result = run_crawl(&config, "test-hash", Some(ALICE)).await;

    assert!(matches!(result, Err(steam_ripple::RippleError::Storage(_))));
}
