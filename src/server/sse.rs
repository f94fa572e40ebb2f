//! Live statistics over server-sent events.
//!
//! Every tick sends a `live` event; every `full_every`-th tick follows it
//! with the full `stats` snapshot. After `max_duration` the stream emits a
//! final `reconnect` event and closes, so clients re-open it periodically.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::warn;

use super::AppState;
use crate::stats::StatsRecorder;
use crate::types::ErrorEnvelope;

pub async fn live_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let live = state.live.clone();
    let stats = state.huginn.stats.clone();

    let mut interval = tokio::time::interval(live.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let events = IntervalStream::new(interval)
        .enumerate()
        .take_until(tokio::time::sleep(live.max_duration))
        .then(move |(i, _)| {
            let stats = stats.clone();
            let full_every = live.full_every;
            async move { tick_events(&stats, i as u64 + 1, full_every).await }
        })
        .flat_map(stream::iter)
        .chain(stream::once(async {
            Ok(Event::default()
                .event("reconnect")
                .data("stream duration limit reached"))
        }));

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn tick_events(
    stats: &StatsRecorder,
    tick: u64,
    full_every: u64,
) -> Vec<Result<Event, axum::Error>> {
    let live = match stats.live().await {
        Ok(snapshot) => Event::default().event("live").json_data(snapshot),
        Err(e) => {
            warn!(error = %e, "live statistics unavailable");
            Event::default()
                .event("error")
                .json_data(ErrorEnvelope::from(&e))
        }
    };
    let mut events = vec![live];
    if full_every > 0 && tick % full_every == 0 {
        events.push(Event::default().event("stats").json_data(stats.stats().await));
    }
    events
}
