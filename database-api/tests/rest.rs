use database_api::{ClientParams, Database, DatabaseError, Filter, RestDatabase, Row, Select, StatusCode};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE: &str = "card_generations";
const TABLE_PATH: &str = "/rest/v1/card_generations";

fn client(server: &MockServer) -> RestDatabase {
    RestDatabase::new(ClientParams {
        url: Url::parse(&server.uri()).unwrap(),
        key: "test-key".into(),
    })
    .unwrap()
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_insert_posts_rows_and_returns_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "test-key"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!([{"titles": ["A"], "video_type": "youtube"}])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 1,
            "titles": ["A"],
            "video_type": "youtube",
            "created_at": "2024-05-01T09:00:00.123456+00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client(&server)
        .insert(TABLE, vec![row(json!({"titles": ["A"], "video_type": "youtube"}))])
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(1));
    assert_eq!(rows[0]["created_at"], json!("2024-05-01T09:00:00.123456+00:00"));
}

#[tokio::test]
async fn test_select_sends_order_and_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "*"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "50"))
        .and(header("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "created_at": "2024-05-01T09:00:01Z"},
            {"id": 1, "created_at": "2024-05-01T09:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = Select::builder().order_desc("created_at").limit(50).build();
    let rows = client(&server).select(TABLE, &query).await.unwrap();

    let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(2), json!(1)]);
}

#[tokio::test]
async fn test_select_by_text_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.007"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let query = Select::builder().eq("id", "007").limit(2).build();
    assert!(client(&server).select(TABLE, &query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_counts_returned_rows() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.3"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "created_at": "2024-05-01T09:00:00Z"},
            {"id": 3, "created_at": "2024-05-01T09:00:05Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let removed = client(&server).delete(TABLE, &[Filter::eq("id", 3)]).await.unwrap();
    assert_eq!(removed, 2);
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let removed = client(&server).delete(TABLE, &[Filter::eq("id", 404)]).await.unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_unauthorized_body_without_code() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid API key",
            "hint": "Double check your Supabase `anon` or `service_role` API key."
        })))
        .mount(&server)
        .await;

    let err = client(&server).select(TABLE, &Select::all()).await.unwrap_err();
    match &err {
        DatabaseError::Api { status, code, hint, .. } => {
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
            assert_eq!(*code, None);
            assert!(hint.is_some());
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.to_string(), "Invalid API key");
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_conflict_body_decodes_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "details": "Key (id)=(1) already exists.",
            "hint": null,
            "message": "duplicate key value violates unique constraint \"card_generations_pkey\""
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .insert(TABLE, vec![row(json!({"id": 1}))])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Api { status: StatusCode::CONFLICT, .. }));
    assert_eq!(
        err.to_string(),
        "duplicate key value violates unique constraint \"card_generations_pkey\" (code 23505)"
    );
}

#[tokio::test]
async fn test_gateway_html_decodes_to_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_string("<html><body>502 Bad Gateway</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let err = client(&server).select(TABLE, &Select::all()).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Http(StatusCode::BAD_GATEWAY)));
}

#[tokio::test]
async fn test_malformed_success_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"a list\"}"))
        .mount(&server)
        .await;

    let err = client(&server).select(TABLE, &Select::all()).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Deserialize(_)));
}
