//! Event collection helpers

use micrise_common::RiseEvent;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::time::timeout;

/// Upper bound on (simulated) time to wait for any one event
const EVENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Receive the next event, panicking on timeout or a closed bus
pub async fn next_event(rx: &mut broadcast::Receiver<RiseEvent>) -> RiseEvent {
    match timeout(EVENT_TIMEOUT, rx.recv()).await {
        Ok(Ok(event)) => event,
        Ok(Err(RecvError::Lagged(n))) => panic!("test receiver lagged by {} events", n),
        Ok(Err(RecvError::Closed)) => panic!("event bus closed"),
        Err(_) => panic!("no event within {:?}", EVENT_TIMEOUT),
    }
}

/// Receive events until one matches `done`; returns all of them, the match last
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<RiseEvent>, mut done: F) -> Vec<RiseEvent>
where
    F: FnMut(&RiseEvent) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let matched = done(&event);
        seen.push(event);
        if matched {
            return seen;
        }
    }
}

/// Everything already queued, without waiting
pub fn drain(rx: &mut broadcast::Receiver<RiseEvent>) -> Vec<RiseEvent> {
    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => seen.push(event),
            Err(TryRecvError::Lagged(n)) => panic!("test receiver lagged by {} events", n),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return seen,
        }
    }
}
