//! Pagination integration tests: each addressing scheme against a mock API.
//!
//! Run: cargo test --test pagination_tests

use std::time::Duration;

use futures::StreamExt;
use orbital_client::{
    CancellationToken, Client, CursorPage, FlatPage, NumberedPage, OffsetWindow, Paginator,
    StaticAuth,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .auth(StaticAuth::api_key("k"))
        .build()
        .unwrap()
}

fn orders(client: &Client) -> Paginator<'_, String, Option<String>> {
    Paginator::cursor(move |cursor| {
        client
            .get("/orders")
            .query_opt("cursor", cursor)
            .send::<CursorPage<String>>()
    })
}

async fn mount_page(server: &MockServer, cursor: Option<&str>, body: serde_json::Value, calls: u64) {
    let mock = Mock::given(method("GET")).and(path("/orders"));
    let mock = match cursor {
        Some(cursor) => mock.and(query_param("cursor", cursor)),
        None => mock.and(query_param_is_missing("cursor")),
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

// =============================================================================
// Cursor
// =============================================================================

#[tokio::test]
async fn test_cursor_until_empty_cursor() {
    let server = MockServer::start().await;
    mount_page(&server, None, json!({"data": ["a"], "cursor": "x"}), 1).await;
    mount_page(&server, Some("x"), json!({"data": ["b"], "cursor": ""}), 1).await;

    let client = client(&server);
    let items = orders(&client).collect_all().await.unwrap();
    assert_eq!(items, vec!["a", "b"]);
}

#[tokio::test]
async fn test_consumer_stop_halts_fetching() {
    let server = MockServer::start().await;
    mount_page(&server, None, json!({"data": ["a", "b"], "cursor": "x"}), 1).await;
    mount_page(&server, Some("x"), json!({"data": ["c"]}), 0).await;

    let client = client(&server);
    let mut items = orders(&client).items();
    assert_eq!(items.next().await.unwrap().unwrap(), "a");
    drop(items);
}

#[tokio::test]
async fn test_take_reads_only_needed_pages() {
    let server = MockServer::start().await;
    mount_page(&server, None, json!({"data": ["a"], "cursor": "x"}), 1).await;
    mount_page(&server, Some("x"), json!({"data": ["b"], "cursor": "y"}), 1).await;
    mount_page(&server, Some("y"), json!({"data": ["c"]}), 0).await;

    let client = client(&server);
    let first_two: Vec<_> = orders(&client).items().take(2).collect().await;
    assert_eq!(first_two.len(), 2);
}

#[tokio::test]
async fn test_empty_and_null_first_page() {
    for body in [json!({"data": [], "cursor": "x"}), json!({"data": null})] {
        let server = MockServer::start().await;
        mount_page(&server, None, body, 1).await;
        mount_page(&server, Some("x"), json!({"data": ["never"]}), 0).await;

        let client = client(&server);
        assert!(orders(&client).collect_all().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_first_fetch_error_yields_single_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let results: Vec<_> = orders(&client).items().collect().await;
    assert_eq!(results.len(), 1);
    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.api_error().unwrap().message, "boom");
}

#[tokio::test]
async fn test_error_mid_stream_stops_after_partial_results() {
    let server = MockServer::start().await;
    mount_page(&server, None, json!({"data": ["a", "b"], "cursor": "x"}), 1).await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("cursor", "x"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let results: Vec<_> = orders(&client).items().collect().await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok() && results[1].is_ok());
    assert!(results[2].as_ref().unwrap_err().is_forbidden());
}

#[tokio::test]
async fn test_pages_stream() {
    let server = MockServer::start().await;
    mount_page(&server, None, json!({"data": ["a", "b"], "cursor": "x"}), 1).await;
    mount_page(&server, Some("x"), json!({"data": ["c"]}), 1).await;

    let client = client(&server);
    let pages: Vec<Vec<String>> = orders(&client)
        .pages()
        .map(|page| page.unwrap())
        .collect()
        .await;
    assert_eq!(pages, vec![vec!["a", "b"], vec!["c"]]);
}

#[tokio::test]
async fn test_cancel_during_page_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": ["a"]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let client = client(&server);
    let started = std::time::Instant::now();
    let results: Vec<_> = orders(&client).cancel_on(cancel).items().collect().await;
    assert_eq!(results.len(), 1);
    assert!(results[0].as_ref().unwrap_err().is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(2));
}

// =============================================================================
// Page number
// =============================================================================

#[tokio::test]
async fn test_numbered_pages() {
    let server = MockServer::start().await;
    for (page, items) in [(1, json!(["s1", "s2"])), (2, json!(["s3"]))] {
        Mock::given(method("GET"))
            .and(path("/catalog/scenes"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": items,
                "currentPage": page,
                "totalPages": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client(&server);
    let scenes: Vec<String> = Paginator::numbered(|page| {
        client
            .get("/catalog/scenes")
            .query("page", page)
            .send::<NumberedPage<String>>()
    })
    .collect_all()
    .await
    .unwrap();
    assert_eq!(scenes, vec!["s1", "s2", "s3"]);
}

// =============================================================================
// Offset / limit
// =============================================================================

async fn mount_window(server: &MockServer, offset: usize, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/assets"))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn assets(client: &Client) -> Paginator<'_, String, OffsetWindow> {
    Paginator::offset(2, move |window: OffsetWindow| {
        client
            .get("/assets")
            .query("offset", window.offset)
            .query("limit", window.limit)
            .send::<FlatPage<String>>()
    })
}

#[tokio::test]
async fn test_offset_exact_multiple_needs_extra_fetch() {
    let server = MockServer::start().await;
    mount_window(&server, 0, json!(["a", "b"])).await;
    mount_window(&server, 2, json!(["c", "d"])).await;
    mount_window(&server, 4, json!([])).await;

    let client = client(&server);
    let items = assets(&client).collect_all().await.unwrap();
    assert_eq!(items, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_offset_short_page_ends() {
    let server = MockServer::start().await;
    mount_window(&server, 0, json!(["a", "b"])).await;
    mount_window(&server, 2, json!(["c"])).await;

    let client = client(&server);
    let items = assets(&client).collect_all().await.unwrap();
    assert_eq!(items, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_offset_null_page() {
    let server = MockServer::start().await;
    mount_window(&server, 0, serde_json::Value::Null).await;

    let client = client(&server);
    assert!(assets(&client).collect_all().await.unwrap().is_empty());
}
