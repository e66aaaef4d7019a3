use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ragdb_core::config::SourceConfig;
use ragdb_core::normalize::FailurePolicy;
use ragdb_core::traits::RecordSource;
use ragdb_core::Error;
use ragdb_source::{load_records, DirSource, MemorySource, UpstashSource};

fn reserved() -> Vec<String> {
    SourceConfig::default().excluded()
}

#[tokio::test]
async fn upstash_lists_fetches_and_skips_reserved_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!(["KEYS", "*"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": ["team", "agent_config", "legacy", "rag_config"]
        })))
        .mount(&server)
        .await;
    let team = json!({ "0": json!([
        { "id": "t1", "properties": { "name": "Alice", "role": "engineer" } },
        { "properties": { "name": "Bob" } }
    ]).to_string() });
    Mock::given(method("GET"))
        .and(path("/get/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": team.to_string() })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get/legacy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "{\"title\": \"no marker\"}" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get/agent_config"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let source = UpstashSource::new(format!("{}/", server.uri()), "secret").expect("source");
    let loaded = load_records(&source, &reserved(), 2, FailurePolicy::Skip).await.expect("load");
    assert_eq!(loaded.keys, vec!["team".to_string(), "legacy".to_string()]);
    assert_eq!(loaded.skipped, vec!["legacy".to_string()]);
    assert_eq!(loaded.records.len(), 2);
    assert_eq!(loaded.records[0].id, "t1");
    assert_eq!(loaded.records[1].id, "");
    assert!(loaded.records.iter().all(|r| r.source_key == "team"));
}

#[tokio::test]
async fn upstash_server_failure_is_a_transient_source_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;
    let source = UpstashSource::new(server.uri(), "t").expect("source");
    let err = source.list_keys().await.expect_err("503");
    assert!(matches!(err, Error::Source(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn rejected_token_is_a_config_error_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;
    let source = UpstashSource::new(server.uri(), "bad").expect("source");

    let err = source.list_keys().await.expect_err("401");
    assert!(matches!(err, Error::InvalidConfig(_)), "{err}");
    assert!(!err.is_transient());
    let err = source.fetch_collection("team").await.expect_err("403");
    assert!(matches!(err, Error::InvalidConfig(_)), "{err}");
}

#[tokio::test]
async fn keys_are_sent_as_one_encoded_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get/team%20a%2Fb%3Fx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": json!([{ "id": "k1", "properties": { "n": 1 } }]).to_string()
        })))
        .expect(1)
        .mount(&server)
        .await;
    let source = UpstashSource::new(server.uri(), "t").expect("source");
    let records = source.fetch_collection("team a/b?x").await.expect("fetch").expect("collection");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_key, "team a/b?x");
}

#[test]
fn unparseable_source_url_is_a_config_error() {
    assert!(matches!(UpstashSource::new("not a url", "t"), Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn null_value_is_an_empty_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&server)
        .await;
    let source = UpstashSource::new(server.uri(), "t").expect("source");
    assert_eq!(source.fetch_collection("empty").await.expect("fetch"), Some(vec![]));
}

#[tokio::test]
async fn dir_source_reads_json_files_by_stem() {
    let tmp = tempfile::tempdir().expect("tmp");
    std::fs::write(tmp.path().join("people.json"), json!([{ "id": "p1", "properties": { "n": 1 } }]).to_string())
        .expect("write");
    std::fs::create_dir(tmp.path().join("nested")).expect("mkdir");
    std::fs::write(tmp.path().join("nested/places.json"), json!({ "0": [{ "id": "x1", "properties": {} }] }).to_string())
        .expect("write");
    std::fs::write(tmp.path().join("rag_config.json"), "{}").expect("write");
    std::fs::write(tmp.path().join("readme.txt"), "ignored").expect("write");

    let source = DirSource::new(tmp.path());
    let keys = source.list_keys().await.expect("keys");
    assert_eq!(keys, vec!["people".to_string(), "places".to_string(), "rag_config".to_string()]);

    let loaded = load_records(&source, &reserved(), 4, FailurePolicy::Skip).await.expect("load");
    let ids: Vec<&str> = loaded.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["p1", "x1"]);
}

#[tokio::test]
async fn dir_fetches_resolve_against_the_last_listing() {
    let tmp = tempfile::tempdir().expect("tmp");
    std::fs::write(tmp.path().join("people.json"), json!([{ "id": "p1", "properties": {} }]).to_string())
        .expect("write");
    let source = DirSource::new(tmp.path());
    assert_eq!(source.list_keys().await.expect("keys"), vec!["people".to_string()]);

    // Files added after the listing are not picked up by a fetch.
    std::fs::write(tmp.path().join("late.json"), json!([{ "id": "l1", "properties": {} }]).to_string())
        .expect("write");
    assert_eq!(source.fetch_collection("late").await.expect("fetch"), Some(vec![]));
    assert_eq!(source.fetch_collection("people").await.expect("fetch").map(|r| r.len()), Some(1));

    // The next listing sees them.
    assert_eq!(source.list_keys().await.expect("keys"), vec!["late".to_string(), "people".to_string()]);
    assert_eq!(source.fetch_collection("late").await.expect("fetch").map(|r| r.len()), Some(1));
}

#[tokio::test]
async fn wrong_shaped_collection_depends_on_policy() {
    let source = MemorySource::new()
        .with("good", json!([{ "id": "g", "properties": { "a": 1 } }]))
        .with("bad", json!({ "0": 42 }));

    let skipped = load_records(&source, &[], 4, FailurePolicy::Skip).await.expect("skip");
    assert_eq!(skipped.records.len(), 1);
    assert_eq!(skipped.skipped, vec!["bad".to_string()]);
    assert!(matches!(skipped.errors[0], Error::MalformedRecord { .. }));

    let failed = load_records(&source, &[], 4, FailurePolicy::FailFast).await;
    assert!(matches!(failed, Err(Error::MalformedRecord { .. })));
}
