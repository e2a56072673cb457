use crate::engine::{ExecutionEvent, WireFormat, encode};
use axum::{
    body::Body,
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Stream `rx` as server-sent events. Dropping the body drops `rx`, which stops the run.
pub(super) fn sse_response(mut rx: mpsc::Receiver<ExecutionEvent>) -> Response {
    let frames = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match encode(&event, WireFormat::Sse) {
                Ok(frame) => yield Ok::<String, Infallible>(frame),
                Err(e) => tracing::warn!("dropping event: {e}"),
            }
        }
    };

    (
        [
            (header::CONTENT_TYPE, WireFormat::Sse.content_type()),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}
