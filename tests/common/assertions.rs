//! Event collection and assertions for scenario tests

use autoreel::{Event, TaskId};
use tokio::sync::broadcast;

/// Drain every event already delivered to `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Progress percentages reported for `id`, in emission order
pub fn progress_of(events: &[Event], id: &TaskId) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { id: event_id, percent } if event_id == id => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Assert progress never moves backwards and ends at 100
pub fn assert_progress_monotonic(progress: &[f64]) {
    assert!(!progress.is_empty(), "no progress events");
    for pair in progress.windows(2) {
        assert!(
            pair[0] <= pair[1],
            "progress went backwards: {} -> {} in {:?}",
            pair[0],
            pair[1],
            progress
        );
    }
    assert_eq!(progress.last().copied(), Some(100.0));
}
