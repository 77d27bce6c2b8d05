use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    dto::sse::{EVENT_HANDSHAKE, ServerEvent, SessionHandshake},
    error::ServiceError,
    services::session_service,
    state::{SharedState, identity::Caller},
};

/// Subscribe to a session stream. The handshake carries the session as the caller sees it.
pub async fn subscribe_session(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
) -> Result<(ServerEvent, broadcast::Receiver<ServerEvent>), ServiceError> {
    let session = session_service::get_session(state, caller, session_id).await?;
    let receiver = state.session_streams().hub(session_id).subscribe();

    let handshake = SessionHandshake {
        message: "session stream connected".into(),
        degraded: state.is_degraded(),
        session: session.session,
    };
    let handshake = ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &handshake)
        .map_err(|err| ServiceError::Internal(format!("cannot encode handshake: {err}")))?;
    Ok((handshake, receiver))
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, sending `handshake` first and
/// forwarding events until the client disconnects or the session hub is closed.
pub fn to_sse_stream(
    session_id: Uuid,
    handshake: ServerEvent,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if tx.send(Ok(to_event(handshake))).await.is_ok() {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    recv_result = receiver.recv() => {
                        match recv_result {
                            Ok(payload) => {
                                if tx.send(Ok(to_event(payload))).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Closed) => break,
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::debug!(%session_id, skipped, "session SSE subscriber lagged");
                                continue;
                            }
                        }
                    }
                }
            }
        }
        tracing::info!(%session_id, "session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
