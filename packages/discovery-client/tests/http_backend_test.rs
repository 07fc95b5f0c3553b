//! HTTP mapping of the discovery backend, verified against a mock server.

use std::sync::Arc;

use discovery::testing::InMemoryStore;
use discovery::{
    DiscoveryEngine, MemberStatus, Phase, SearchBackend, SearchFilter, SessionKey, ShortlistQuery,
};
use discovery_client::{ClientConfig, ClientError, HttpBackend};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(ClientConfig::new(server.uri()).unwrap())
}

fn search_body(total: u64) -> serde_json::Value {
    json!({
        "results": [
            { "id": "c-1", "handle": "jo.runs", "followers": 48200, "engagement_rate": 0.042 },
            { "id": "c-2", "handle": "mia.eats", "verified": true }
        ],
        "total": total,
        "offset": 0,
        "limit": 5
    })
}

#[tokio::test]
async fn test_search_posts_filter_and_parses_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/discovery/search"))
        .and(body_partial_json(json!({
            "platform": "instagram",
            "creator_locations": ["US"],
            "offset": 0,
            "limit": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(12)))
        .expect(1)
        .mount(&server)
        .await;

    let filter = SearchFilter {
        platform: Some("instagram".into()),
        creator_locations: vec!["US".into()],
        ..Default::default()
    }
    .page(0, 5);

    let response = backend(&server).post_search(&filter).await.unwrap();
    assert_eq!(response.total, 12);
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].followers, Some(48_200));
    // Unknown result fields are kept
    assert_eq!(response.results[1].extra.get("verified"), Some(&json!(true)));
}

#[tokio::test]
async fn test_bearer_token_sent_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discovery/platforms"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "platforms": [
                { "id": "instagram", "name": "Instagram", "supports_reel_view_filter": true },
                { "id": "tiktok", "name": "TikTok" }
            ],
            "active_platform_id": "instagram"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).unwrap().with_token("s3cret");
    let list = HttpBackend::new(config).fetch_platforms().await.unwrap();

    assert_eq!(list.platforms.len(), 2);
    assert!(list.platforms[0].supports_reel_view_filter);
    assert!(!list.platforms[1].supports_reel_view_filter);
    assert_eq!(list.active_platform_id.as_deref(), Some("instagram"));
}

#[tokio::test]
async fn test_members_query_parameters() {
    let server = MockServer::start().await;
    let campaign = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/campaigns/{}/members", campaign)))
        .and(query_param("status", "active"))
        .and(query_param("search", "yoga"))
        .and(query_param("offset", "20"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [
                {
                    "id": "m-1",
                    "status": "active",
                    "creator": { "id": "c-9", "handle": "yoga.with.ana" }
                }
            ],
            "total": 21
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ShortlistQuery {
        status: MemberStatus::Active,
        search: Some("yoga".into()),
        offset: 20,
        ..Default::default()
    };
    let page = backend(&server).fetch_members(campaign, &query).await.unwrap();

    assert_eq!(page.total, 21);
    assert_eq!(page.members[0].creator.handle, "yoga.with.ana");
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/discovery/search"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .post_search(&SearchFilter::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discovery/platforms"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = backend(&server).fetch_platforms().await.unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));
}

#[tokio::test]
async fn test_trait_errors_carry_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/discovery/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let err = SearchBackend::search(&backend, &SearchFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ClientError>(),
        Some(ClientError::Api { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_engine_runs_against_http_backend() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discovery/platforms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "platforms": [{ "id": "tiktok", "name": "TikTok" }],
            "active_platform_id": "tiktok"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/discovery/search"))
        .and(body_partial_json(json!({ "platform": "tiktok", "limit": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(2)))
        .expect(1)
        .mount(&server)
        .await;

    let (engine, handle) = DiscoveryEngine::builder(
        SessionKey::Campaign(Uuid::new_v4()),
        Arc::new(backend(&server)),
        Arc::new(InMemoryStore::new()),
    )
    .build();
    let task = tokio::spawn(engine.run());

    let snapshot = handle
        .wait_until(|s| s.phase == Phase::Ready && !s.is_loading())
        .await
        .unwrap();
    assert_eq!(snapshot.session.results.len(), 2);
    assert_eq!(snapshot.remaining, 0);
    // The wire filter never carries the reel block for this platform
    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path() == "/discovery/search")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert!(sent.get("platform_options").is_none());

    handle.unmount().unwrap();
    task.await.unwrap();
}
