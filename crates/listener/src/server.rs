use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// In-flight requests finish before this returns. Queued hook runs are not
/// waited for here; the caller owns the dispatcher.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "listening for webhooks");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("listener stopped");
    Ok(())
}
