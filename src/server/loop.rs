// Server loop module
// Accepts connections until shutdown, then drains deferred work

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::logger;

/// How long shutdown waits for in-flight connections and deferred tasks
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Accept connections until `shutdown` fires.
///
/// After the listener closes, open connections get [`SHUTDOWN_GRACE`] to
/// finish and every pending deferred task (cache write-backs) is awaited
/// within the same window.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownSignal>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.wait() => {
                break;
            }
        }
    }

    drop(listener);
    logger::log_info("[SHUTDOWN] Listener closed, draining in-flight work");

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while state.active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        state.deferred.drain().await;
    })
    .await;

    match drained {
        Ok(()) => logger::log_info("[SHUTDOWN] All work drained"),
        Err(_) => logger::log_warning(&format!(
            "[SHUTDOWN] Grace period elapsed with {} connection(s) and {} deferred task(s) pending",
            state.active_connections.load(Ordering::SeqCst),
            state.deferred.pending()
        )),
    }
    Ok(())
}
