use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// Shared hit counter; lets tests prove a replayed call never reached us.
pub type Hits = Arc<RwLock<u64>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerStatus {
    pub service: String,
    pub hits: u64,
}

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(0));
    Router::new()
        .route("/", get(index))
        .route("/hits", get(count_hit))
        .route("/status", get(status))
        .route("/echo", post(echo))
        .route("/soap", post(soap))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn index() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=UTF-8")],
        "<html><body><h1>Example Domain</h1></body></html>",
    )
}

async fn count_hit(State(hits): State<Hits>) -> String {
    let mut count = hits.write().await;
    *count += 1;
    count.to_string()
}

async fn status(State(hits): State<Hits>) -> Json<ServerStatus> {
    let count = hits.read().await;
    Json(ServerStatus {
        service: "mock-server".to_string(),
        hits: *count,
    })
}

async fn echo(headers: HeaderMap, body: String) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn soap(_body: String) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/soap+xml; charset=utf-8")],
        "<SOAP-ENV:Envelope><SOAP-ENV:Body><NumberToWordsResponse>\
         <NumberToWordsResult>twelve</NumberToWordsResult>\
         </NumberToWordsResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_status_serializes_to_json() {
        let status = ServerStatus {
            service: "mock-server".to_string(),
            hits: 3,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["service"], "mock-server");
        assert_eq!(json["hits"], 3);
    }
}
