use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, ServerStatus};
use tower::ServiceExt;

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- index ---

#[tokio::test]
async fn index_serves_fixed_html() {
    let app = app();
    let resp = app.oneshot(get_request("/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "text/html; charset=UTF-8"
    );
    let body = body_string(resp).await;
    assert!(body.contains("Example Domain"));
}

// --- hits ---

#[tokio::test]
async fn hits_counter_increments_per_request() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/hits"))
        .await
        .unwrap();
    assert_eq!(body_string(resp).await, "1");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/hits"))
        .await
        .unwrap();
    assert_eq!(body_string(resp).await, "2");
}

// --- status ---

#[tokio::test]
async fn status_reports_service_and_hits() {
    let app = app();
    let resp = app.oneshot(get_request("/status")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let status: ServerStatus = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status.service, "mock-server");
    assert_eq!(status.hits, 0);
}

// --- echo ---

#[tokio::test]
async fn echo_returns_body_and_content_type() {
    let app = app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"para1":"val1"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    assert_eq!(body_string(resp).await, r#"{"para1":"val1"}"#);
}

// --- soap ---

#[tokio::test]
async fn soap_endpoint_returns_an_envelope() {
    let app = app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/soap")
                .body("<SOAP-ENV:Envelope/>".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("<NumberToWordsResult>twelve</NumberToWordsResult>"));
}
