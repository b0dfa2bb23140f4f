//! End-to-end tests against mocked Z.ai and Instagram HTTP endpoints.

mod common;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use common::{ConfigBuilder, OptionsBuilder, TestHarness};
use newsgram::{JobStatus, ScheduledStatus};

const ACCOUNT_ID: &str = "17841400000";

const CAPTION: &str = "Inflasi turun! Simak faktanya. #ekonomi #inflasi #Ekonomi";

fn mock_zai(server: &mut ServerGuard) {
    server
        .mock("POST", "/tools/web-search")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "query": "berita terbaru ekonomi Indonesia"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "results": [
                    {"title": "Inflasi turun", "url": "https://news.id/inflasi", "summary": "s1"},
                    {"title": "Rupiah menguat", "url": "https://news.id/rupiah"},
                    {"title": "Ekspor naik", "url": "https://news.id/ekspor"}
                ]
            })
            .to_string(),
        )
        .create();

    server
        .mock("POST", "/tools/web-reader")
        .match_body(Matcher::PartialJson(json!({"url": "https://news.id/inflasi"})))
        .with_status(200)
        .with_body(json!({"content": "Inflasi bulan ini turun ke 2,1 persen."}).to_string())
        .create();
    server
        .mock("POST", "/tools/web-reader")
        .match_body(Matcher::PartialJson(json!({"url": "https://news.id/rupiah"})))
        .with_status(200)
        .with_body(json!({"content": "Rupiah menguat terhadap dolar."}).to_string())
        .create();

    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": CAPTION}}]}).to_string())
        .create();

    server
        .mock("POST", "/images/generations")
        .match_body(Matcher::PartialJson(json!({"size": "1024x1024"})))
        .with_status(200)
        .with_body(json!({"data": [{"url": "https://cdn.test/post.png"}]}).to_string())
        .create();
}

#[test]
fn test_generates_posts_over_http() {
    let mut server = Server::new();
    mock_zai(&mut server);
    let h = TestHarness::http(ConfigBuilder::new().zai(&server.url()).build());

    let record = h.run(&["ekonomi"], OptionsBuilder::new().max_posts(2).build());

    assert_eq!(record.status, JobStatus::Completed, "{:?}", record.error);
    assert_eq!(record.total_posts, Some(2));
    assert!(record.warnings.is_empty());

    let posts = h.service.get_result(&record.id).unwrap();
    assert_eq!(posts[0].source_url, "https://news.id/inflasi");
    assert_eq!(posts[1].source_url, "https://news.id/rupiah");
    assert_eq!(posts[0].caption, CAPTION);
    assert_eq!(posts[0].hashtags, vec!["#ekonomi", "#inflasi"]);
    assert_eq!(posts[0].image_url, "https://cdn.test/post.png");
    assert!(!posts[0].auto_posted());
}

#[test]
fn test_failed_extraction_skips_candidate() {
    let mut server = Server::new();
    mock_zai(&mut server);
    // The third article is only reachable when the cap allows it.
    server
        .mock("POST", "/tools/web-reader")
        .match_body(Matcher::PartialJson(json!({"url": "https://news.id/ekspor"})))
        .with_status(404)
        .with_body("not found")
        .create();
    let h = TestHarness::http(ConfigBuilder::new().zai(&server.url()).build());

    let record = h.run(&["ekonomi"], OptionsBuilder::new().max_posts(3).build());

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.total_posts, Some(2));
    assert_eq!(record.warnings.len(), 1);
    assert!(record.warnings[0].contains("https://news.id/ekspor"));
}

#[test]
fn test_search_outage_fails_job() {
    let mut server = Server::new();
    server
        .mock("POST", "/tools/web-search")
        .with_status(503)
        .with_body("upstream down")
        .create();
    let h = TestHarness::http(ConfigBuilder::new().zai(&server.url()).build());

    let record = h.run(&["ekonomi"], OptionsBuilder::new().build());

    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(
        record.error.as_deref(),
        Some("No posts were generated for any of the 1 topic(s)")
    );
    assert!(record.warnings.iter().any(|w| w.contains("ekonomi")));
}

#[test]
fn test_auto_post_publishes_to_instagram() {
    let mut server = Server::new();
    mock_zai(&mut server);
    let account = server
        .mock("GET", format!("/{}", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"id": ACCOUNT_ID, "username": "beritakini"}).to_string())
        .expect(1)
        .create();
    let containers = server
        .mock("POST", format!("/{}/media", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"id": "c-1"}).to_string())
        .expect(2)
        .create();
    let publish = server
        .mock("POST", format!("/{}/media_publish", ACCOUNT_ID).as_str())
        .match_query(Matcher::UrlEncoded("creation_id".into(), "c-1".into()))
        .with_status(200)
        .with_body(json!({"id": "m-1"}).to_string())
        .expect(2)
        .create();
    // Slots at 08:00 and 09:00 UTC today are due at the harness clock's 10:00.
    let h = TestHarness::http(
        ConfigBuilder::new()
            .zai(&server.url())
            .instagram(&server.url(), ACCOUNT_ID)
            .optimal_hours(&[8, 9])
            .day_offset(0)
            .build(),
    );

    let record = h.run(&["ekonomi"], OptionsBuilder::new().max_posts(2).auto_post().build());

    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.warnings.is_empty(), "{:?}", record.warnings);
    let posts = h.service.get_result(&record.id).unwrap();
    assert!(posts.iter().all(|p| p.auto_posted()));
    assert_eq!(posts[0].media_id(), Some("m-1"));
    assert!(h.scheduled_posts().is_empty());
    account.assert();
    containers.assert();
    publish.assert();

    let path = h.export(&record.id);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json[1]["auto_posted"], true);
}

#[test]
fn test_future_slots_create_containers_only() {
    let mut server = Server::new();
    mock_zai(&mut server);
    server
        .mock("GET", format!("/{}", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"id": ACCOUNT_ID, "username": "beritakini"}).to_string())
        .create();
    let containers = server
        .mock("POST", format!("/{}/media", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"id": "c-7"}).to_string())
        .expect(2)
        .create();
    let publish = server
        .mock("POST", format!("/{}/media_publish", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .expect(0)
        .create();
    let h = TestHarness::http(
        ConfigBuilder::new()
            .zai(&server.url())
            .instagram(&server.url(), ACCOUNT_ID)
            .build(),
    );

    let record = h.run(&["ekonomi"], OptionsBuilder::new().max_posts(2).auto_post().build());

    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.warnings.is_empty(), "{:?}", record.warnings);
    containers.assert();
    publish.assert();

    let scheduled = h.scheduled_posts();
    assert_eq!(scheduled.len(), 2);
    assert!(scheduled
        .iter()
        .all(|entry| entry.creation_id.as_deref() == Some("c-7")
            && entry.status == ScheduledStatus::Scheduled));
    assert_eq!(scheduled[0].image_url, "https://cdn.test/post.png");
    assert_eq!(scheduled[0].caption, CAPTION);
}

#[test]
fn test_url_job_reads_given_article() {
    let mut server = Server::new();
    let search = server
        .mock("POST", "/tools/web-search")
        .expect(0)
        .create();
    let reader = server
        .mock("POST", "/tools/web-reader")
        .match_body(Matcher::PartialJson(json!({"url": "https://news.id/manual"})))
        .with_status(200)
        .with_body(json!({"content": "Harga beras stabil di pasar induk."}).to_string())
        .expect(1)
        .create();
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": CAPTION}}]}).to_string())
        .create();
    server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(json!({"data": [{"url": "https://cdn.test/post.png"}]}).to_string())
        .create();
    let h = TestHarness::http(ConfigBuilder::new().zai(&server.url()).build());

    let record = h.run_url("https://news.id/manual", "pangan", OptionsBuilder::new().build());

    assert_eq!(record.status, JobStatus::Completed, "{:?}", record.error);
    assert_eq!(record.total_posts, Some(1));
    search.assert();
    reader.assert();
    let posts = h.service.get_result(&record.id).unwrap();
    assert_eq!(posts[0].topic, "pangan");
    assert_eq!(posts[0].source_url, "https://news.id/manual");
    assert_eq!(posts[0].hashtags, vec!["#ekonomi", "#inflasi"]);
}

#[test]
fn test_rejected_instagram_token_keeps_posts() {
    let mut server = Server::new();
    mock_zai(&mut server);
    server
        .mock("GET", format!("/{}", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(json!({"error": {"message": "Invalid OAuth access token"}}).to_string())
        .create();
    let publish = server
        .mock("POST", format!("/{}/media_publish", ACCOUNT_ID).as_str())
        .match_query(Matcher::Any)
        .expect(0)
        .create();
    let h = TestHarness::http(
        ConfigBuilder::new()
            .zai(&server.url())
            .instagram(&server.url(), ACCOUNT_ID)
            .build(),
    );

    let record = h.run(&["ekonomi"], OptionsBuilder::new().max_posts(1).auto_post().build());

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.total_posts, Some(1));
    assert!(record.warnings[0].starts_with("Auto-post disabled: Instagram verification failed"));
    assert!(!h.service.get_result(&record.id).unwrap()[0].auto_posted());
    publish.assert();
}
