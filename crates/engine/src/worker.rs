use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use common::{EventLevel, FetchError, OrderIntent, RunStatus, TradingMode};

use crate::controller::Shared;

/// Poll loop, spawned once per `start`.
///
/// The cancellation flag is checked once per iteration and during pauses; an
/// in-flight fetch is never interrupted.
pub(crate) async fn run(shared: Arc<Shared>, epoch: u64, mut cancel_rx: watch::Receiver<bool>) {
    let config = &shared.config;
    let market = config.market.as_str();
    let max_failures = config.max_consecutive_failures;
    debug!(%market, epoch, "Worker started");

    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let fetched = shared.source.fetch(market).await.and_then(|price| {
            if price.is_finite() {
                Ok(price)
            } else {
                Err(FetchError::Decode(format!("non-finite price {price}")))
            }
        });

        match fetched {
            Ok(price) => {
                let mut inner = shared.inner.lock().await;
                if inner.epoch != epoch {
                    return;
                }

                let signal = shared.strategy.signal(inner.snapshot.last_price, price);
                inner.snapshot.iteration += 1;
                inner.snapshot.last_price = Some(price);
                inner.snapshot.last_signal = signal;
                inner.snapshot.consecutive_failures = 0;
                inner.snapshot.touch();

                let iteration = inner.snapshot.iteration;
                shared.record(
                    &mut inner,
                    EventLevel::Info,
                    format!("tick={iteration} price={price:.0} signal={signal}"),
                );

                if signal.is_actionable() {
                    let intent = OrderIntent::recorded(
                        market,
                        signal,
                        config.order_amount_krw,
                        TradingMode::from_paper_flag(config.paper_mode),
                    );
                    shared.sink.record_order(&intent);
                }
                drop(inner);

                if pause(&mut cancel_rx, config.poll_interval).await {
                    break;
                }
            }
            Err(err) => {
                let mut inner = shared.inner.lock().await;
                if inner.epoch != epoch {
                    return;
                }

                inner.snapshot.consecutive_failures += 1;
                let failures = inner.snapshot.consecutive_failures;
                inner.snapshot.last_error = Some(err.to_string());
                inner.snapshot.touch();
                shared.record(
                    &mut inner,
                    EventLevel::Error,
                    format!("Loop error ({failures}/{max_failures}): {err}"),
                );

                // Stop already requested: exit cleanly instead of entering Error.
                if inner.snapshot.status != RunStatus::Running {
                    break;
                }

                if failures >= max_failures {
                    inner.snapshot.status = RunStatus::Error;
                    inner.snapshot.worker_alive = false;
                    inner.snapshot.touch();
                    shared.record(
                        &mut inner,
                        EventLevel::Error,
                        "Engine switched to ERROR due to repeated failures",
                    );
                    return;
                }
                drop(inner);

                if pause(&mut cancel_rx, config.failure_backoff()).await {
                    break;
                }
            }
        }
    }

    let mut inner = shared.inner.lock().await;
    if inner.epoch != epoch {
        return;
    }
    inner.snapshot.status = RunStatus::Idle;
    inner.snapshot.worker_alive = false;
    inner.snapshot.touch();
    shared.record(&mut inner, EventLevel::Info, "Engine stopped");
}

/// Sleep for `duration` or until cancellation. Returns true if cancelled.
async fn pause(cancel_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    // `changed` only errors once the sender is gone, which also means stop.
    let woken = tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel_rx.changed() => true,
    };
    woken || *cancel_rx.borrow()
}
