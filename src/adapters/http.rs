//! HTTP surface.
//!
//! Every request goes through a single fallback handler that asks the
//! [`Dispatcher`] and renders its verdict:
//!
//! | Dispatch           | Status | Body / headers                 |
//! |--------------------|--------|--------------------------------|
//! | `Accepted`         | 202    | empty                          |
//! | `Busy`             | 503    | `action already in progress`   |
//! | `MethodNotAllowed` | 405    | `Allow: POST`                  |
//! | `NotFound`         | 404    | empty                          |

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;

use crate::app::dispatcher::{BUSY_MESSAGE, Dispatch, Dispatcher};

/// Router serving every configured plant path.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().fallback(handle).with_state(dispatcher)
}

async fn handle(State(dispatcher): State<Arc<Dispatcher>>, method: Method, uri: Uri) -> Response {
    render(dispatcher.dispatch(&method, uri.path()))
}

fn render(outcome: Dispatch) -> Response {
    match outcome {
        Dispatch::Accepted { .. } => StatusCode::ACCEPTED.into_response(),
        Dispatch::Busy { .. } => (StatusCode::SERVICE_UNAVAILABLE, BUSY_MESSAGE).into_response(),
        Dispatch::MethodNotAllowed => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "POST")],
        )
            .into_response(),
        Dispatch::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
