//! Server-Sent Events support.

use axum::response::sse::{Event, KeepAlive, Sse};
use folio_core::{Actor, Bus};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

/// Stream the actor's own change events from the bus.
pub fn create_event_stream(
    bus: Bus,
    actor: Actor,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let mut rx = bus.subscribe_all();

        loop {
            match rx.recv().await {
                Ok(bus_event) => {
                    if !bus_event.visible_to(&actor.id) {
                        continue;
                    }
                    let event = Event::default()
                        .event(&bus_event.event_type)
                        .data(bus_event.payload.to_string());

                    yield Ok(event);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(actor = %actor.id, "SSE stream lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
