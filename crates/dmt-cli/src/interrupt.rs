//! Ctrl-C handling.
//!
//! The first interrupt fires the run's [`CancelToken`], which ends a lock
//! wait with `LockInterrupted` and lets the run roll back normally. A second
//! interrupt exits at once; DuckDB discards the uncommitted transaction.

use dmt_db::CancelToken;

/// Exit status after a second interrupt (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

/// Token cancelled by Ctrl-C.
///
/// Signals are watched on a background thread with a single-threaded tokio
/// runtime. If the watcher cannot start, the token still works but is never
/// fired and Ctrl-C keeps its default behaviour.
pub(crate) fn cancel_on_interrupt() -> CancelToken {
    let token = CancelToken::new();
    let watcher = token.clone();

    let spawned = std::thread::Builder::new()
        .name("dmt-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::warn!("Ctrl-C handling unavailable: {e}");
                    return;
                }
            };
            runtime.block_on(watch(watcher));
        });
    if let Err(e) = spawned {
        log::warn!("Ctrl-C handling unavailable: {e}");
    }

    token
}

async fn watch(token: CancelToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    log::warn!("Interrupt received, stopping. Press Ctrl-C again to exit immediately.");
    token.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(EXIT_INTERRUPTED);
    }
}
