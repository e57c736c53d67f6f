//! Listener capture and polling helpers.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use riptide_core::{ChannelEvent, Listener};

/// How long [`wait_for`] polls before giving up.
const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between [`wait_for`] polls.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Listener that appends every received event to the returned log.
pub fn collecting_listener() -> (Listener, Arc<Mutex<Vec<ChannelEvent>>>) {
    let log: Arc<Mutex<Vec<ChannelEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let listener: Listener = Arc::new(move |event| {
        sink.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    });
    (listener, log)
}

/// Listener that appends `tag` to the shared log on every invocation, for
/// asserting dispatch order across multiple listeners.
pub fn tagging_listener(tag: impl Into<String>, log: &Arc<Mutex<Vec<String>>>) -> Listener {
    let tag = tag.into();
    let sink = Arc::clone(log);
    Arc::new(move |_| {
        sink.lock().unwrap_or_else(PoisonError::into_inner).push(tag.clone());
    })
}

/// Poll `predicate` until it holds or a short timeout elapses; returns
/// whether it held. Use after injecting transport events: the client's
/// event loop runs on its own task, so effects land asynchronously.
pub async fn wait_for(predicate: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }
    predicate()
}
