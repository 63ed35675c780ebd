//! Per-request access log, grounded on the teacher's habit of logging
//! each RPC call through `ckb_logger` rather than staying silent.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let response = next.run(request).await;
    log::info!(
        target: "fincore_api",
        "{method} {uri} -> {} ({:?})",
        response.status().as_u16(),
        start.elapsed()
    );
    response
}
