// Chunked newline-delimited JSON feed of session updates
use crate::application::session::SessionUpdate;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Slow readers skip the updates they lagged behind on and keep going
pub fn update_lines(
    rx: broadcast::Receiver<SessionUpdate>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(update) => Some(serialize_line(&update)),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "update stream subscriber lagged");
                None
            }
        }
    })
}

fn serialize_line(update: &SessionUpdate) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(update).map_err(std::io::Error::other)?;
    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Helper to create a streaming response from a subscription
pub fn stream_from_receiver(rx: broadcast::Receiver<SessionUpdate>) -> impl IntoResponse {
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(update_lines(rx)));

    match response {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
