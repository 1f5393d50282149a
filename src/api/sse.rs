//! Server-Sent Events support
//!
//! Each connection gets its own forwarding task. It relays store events and
//! owns the connection's new-intel observer, so flashes are per consumer.

use crate::intel::{IntelFlash, IntelObserver, FLASH_HOLD};
use crate::store::{SessionStore, SessionSummary, StoreEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

const CONNECTION_BUFFER: usize = 64;

/// Events sent to one dashboard connection
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        sessions: Vec<SessionSummary>,
        active_session_id: Option<String>,
    },
    Store(StoreEvent),
    IntelFlash(IntelFlash),
    IntelFlashCleared {
        session_id: String,
    },
}

/// Stream `init`, then this connection's events
pub fn sse_stream(
    store: SessionStore,
    init_event: SseEvent,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before the task starts so nothing after `init` is missed
    let store_rx = store.subscribe();
    let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
    tokio::spawn(forward_events(store, store_rx, tx));

    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });
    let updates = ReceiverStream::new(rx).map(|event| Ok(sse_event_to_axum(event)));

    Sse::new(init.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn forward_events(
    store: SessionStore,
    mut store_rx: broadcast::Receiver<StoreEvent>,
    tx: mpsc::Sender<SseEvent>,
) {
    let mut observer = IntelObserver::new(FLASH_HOLD);
    let mut flash_rx = observer.subscribe();
    observe_active(&store, &mut observer).await;

    let mut shown: Option<IntelFlash> = None;
    loop {
        tokio::select! {
            received = store_rx.recv() => match received {
                Ok(event) => {
                    let refresh = event.touches_intel();
                    if tx.send(SseEvent::Store(event)).await.is_err() {
                        break;
                    }
                    if refresh {
                        observe_active(&store, &mut observer).await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "SSE consumer lagged behind store events");
                    observe_active(&store, &mut observer).await;
                }
                Err(RecvError::Closed) => break,
            },
            changed = flash_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = flash_rx.borrow_and_update().clone();
                let event = match (&current, &shown) {
                    (Some(flash), _) => SseEvent::IntelFlash(flash.clone()),
                    (None, Some(previous)) => SseEvent::IntelFlashCleared {
                        session_id: previous.session_id.clone(),
                    },
                    (None, None) => continue,
                };
                shown = current;
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            () = tx.closed() => break,
        }
    }
    tracing::debug!("SSE connection closed");
}

async fn observe_active(store: &SessionStore, observer: &mut IntelObserver) {
    let active = store.active_intel_count().await;
    observer.observe(active.as_ref().map(|(id, count)| (id.as_str(), *count)));
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = match event {
        SseEvent::Init {
            sessions,
            active_session_id,
        } => (
            "init",
            json!({
                "type": "init",
                "sessions": sessions,
                "active_session_id": active_session_id
            }),
        ),
        SseEvent::Store(event) => (
            event.event_type(),
            serde_json::to_value(&event).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to serialize store event");
                json!({ "type": event.event_type() })
            }),
        ),
        SseEvent::IntelFlash(flash) => (
            "intel_flash",
            json!({
                "type": "intel_flash",
                "session_id": flash.session_id,
                "new_entities": flash.new_entities,
                "total": flash.total
            }),
        ),
        SseEvent::IntelFlashCleared { session_id } => (
            "intel_flash_cleared",
            json!({
                "type": "intel_flash_cleared",
                "session_id": session_id
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
