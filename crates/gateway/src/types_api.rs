//! Single- and multi-valued pipeline endpoints.
//!
//! - `GET /api/types/mono-no-wait` — value transformed inside the pipeline
//! - `GET /api/types/mono-wait`    — value awaited, then transformed
//! - `GET /api/types/flux-no-wait` — JSON array streamed element by element
//! - `GET /api/types/flux-wait`    — JSON array realized before responding

use axum::{
    Json, Router,
    body::Body,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::stream::{self, StreamExt};
use std::convert::Infallible;

use ctxbridge_core::{Pipeline, Sequence};

use crate::error::ApiError;

const VALUE: &str = "I am a value";

pub fn router() -> Router {
    Router::new()
        .route("/mono-no-wait", get(mono_no_wait_handler))
        .route("/mono-wait", get(mono_wait_handler))
        .route("/flux-no-wait", get(flux_no_wait_handler))
        .route("/flux-wait", get(flux_wait_handler))
}

fn names() -> Sequence<&'static str> {
    Sequence::from_items(["Steve", "Mary", "Peter"])
}

async fn mono_no_wait_handler() -> Result<String, ApiError> {
    let changed = Pipeline::just(VALUE)
        .map(|s| format!("{s} and i was changed"))
        .await_single()
        .await?;
    Ok(changed)
}

async fn mono_wait_handler() -> Result<String, ApiError> {
    let value = Pipeline::just(VALUE).await_single().await?;
    Ok(format!("{value} and i was changed in a nicer way"))
}

async fn flux_no_wait_handler() -> Response {
    let items = names()
        .into_stream()
        .enumerate()
        .map(|(i, name)| {
            let sep = if i == 0 { "" } else { "," };
            format!("{sep}{}", serde_json::Value::from(name))
        });
    let chunks = stream::once(async { "[".to_string() })
        .chain(items)
        .chain(stream::once(async { "]".to_string() }))
        .map(Ok::<_, Infallible>);

    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(chunks),
    )
        .into_response()
}

async fn flux_wait_handler() -> Result<Json<Vec<&'static str>>, ApiError> {
    Ok(Json(names().collect_list().await_single().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_body(uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn mono_endpoints() {
        let (status, body) = get_body("/mono-no-wait").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"I am a value and i was changed");

        let (_, body) = get_body("/mono-wait").await;
        assert_eq!(body, b"I am a value and i was changed in a nicer way");
    }

    #[tokio::test]
    async fn streamed_and_collected_sequences_match() {
        let (status, streamed) = get_body("/flux-no-wait").await;
        assert_eq!(status, StatusCode::OK);
        let (_, collected) = get_body("/flux-wait").await;

        let streamed: Vec<String> = serde_json::from_slice(&streamed).unwrap();
        let collected: Vec<String> = serde_json::from_slice(&collected).unwrap();
        assert_eq!(streamed, vec!["Steve", "Mary", "Peter"]);
        assert_eq!(streamed, collected);
    }
}
