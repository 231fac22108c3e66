//! Event-deferred dispatch
//!
//! A request that names a defer event is parked here until that event is
//! broadcast. There is at most one pending dispatch per event name: arming
//! again replaces the earlier one. Broadcasting consumes the entry.
//!
//! Broadcasts requested with a delay wait in a [`TriggerSchedule`], ordered
//! by due time and then by scheduling order. Each engine keeps one, and so
//! does the registry for broadcasts that reach every engine.

use crate::types::{ElementId, Timestamp, TrackingRequest};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Work captured when a deferred dispatch is armed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDispatch {
    /// Send the captured request as-is
    Track(TrackingRequest),
    /// Radio selection; group guards are updated only when it fires
    Radio {
        radio: ElementId,
        request: TrackingRequest,
        /// Guard value seen when the dispatch was armed
        already_tracked: bool,
    },
}

/// `now` moved forward by `millis`, saturating at the latest instant
pub fn after_millis(now: Timestamp, millis: u64) -> Timestamp {
    let delay = Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX));
    now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone)]
struct ScheduledTrigger {
    event: String,
    due: Timestamp,
    seq: u64,
}

/// Named broadcasts waiting for their due time
#[derive(Debug, Default)]
pub struct TriggerSchedule {
    scheduled: Vec<ScheduledTrigger>,
    next_seq: u64,
}

impl TriggerSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a broadcast of `event` at `due`
    pub fn schedule(&mut self, event: &str, due: Timestamp) {
        self.scheduled.push(ScheduledTrigger {
            event: event.to_string(),
            due,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Remove and return every broadcast due at or before `now`
    pub fn due(&mut self, now: Timestamp) -> Vec<String> {
        let (mut ready, waiting): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|t| t.due <= now);
        self.scheduled = waiting;
        ready.sort_by_key(|t| (t.due, t.seq));
        ready.into_iter().map(|t| t.event).collect()
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    pub fn clear(&mut self) {
        self.scheduled.clear();
    }
}

/// Pending-callback registry keyed by event name
#[derive(Debug, Default)]
pub struct DispatchGate {
    pending: HashMap<String, PendingDispatch>,
    schedule: TriggerSchedule,
}

impl DispatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a dispatch for `event`, returning the one it replaced
    pub fn arm(&mut self, event: &str, dispatch: PendingDispatch) -> Option<PendingDispatch> {
        let replaced = self.pending.insert(event.to_string(), dispatch);
        if replaced.is_some() {
            log::debug!("Re-armed deferred dispatch for '{}', previous one discarded", event);
        } else {
            log::debug!("Armed deferred dispatch for '{}'", event);
        }
        replaced
    }

    /// Consume the dispatch armed for `event`
    pub fn take(&mut self, event: &str) -> Option<PendingDispatch> {
        self.pending.remove(event)
    }

    pub fn is_armed(&self, event: &str) -> bool {
        self.pending.contains_key(event)
    }

    /// Event names with a dispatch waiting, sorted
    pub fn armed_events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.pending.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }

    /// Schedule a broadcast of `event` at `due`
    pub fn schedule(&mut self, event: &str, due: Timestamp) {
        self.schedule.schedule(event, due);
    }

    /// Remove and return every scheduled broadcast due at or before `now`
    pub fn due(&mut self, now: Timestamp) -> Vec<String> {
        self.schedule.due(now)
    }

    pub fn scheduled_count(&self) -> usize {
        self.schedule.len()
    }

    /// Drop everything pending
    pub fn clear(&mut self) {
        self.pending.clear();
        self.schedule.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(label: &str) -> TrackingRequest {
        TrackingRequest {
            label: Some(label.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_last_arm_wins() {
        let mut gate = DispatchGate::new();
        assert!(gate.arm("X", PendingDispatch::Track(request("first"))).is_none());
        let replaced = gate.arm("X", PendingDispatch::Track(request("second")));
        assert_eq!(replaced, Some(PendingDispatch::Track(request("first"))));

        assert_eq!(gate.take("X"), Some(PendingDispatch::Track(request("second"))));
        assert_eq!(gate.take("X"), None);
    }

    #[test]
    fn test_events_are_independent() {
        let mut gate = DispatchGate::new();
        gate.arm("b", PendingDispatch::Track(request("1")));
        gate.arm("a", PendingDispatch::Track(request("2")));
        assert_eq!(gate.armed_events(), vec!["a", "b"]);

        gate.take("a");
        assert!(!gate.is_armed("a"));
        assert!(gate.is_armed("b"));
    }

    #[test]
    fn test_scheduled_order() {
        let mut gate = DispatchGate::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        gate.schedule("late", start + Duration::milliseconds(500));
        gate.schedule("early", start + Duration::milliseconds(100));
        gate.schedule("early-too", start + Duration::milliseconds(100));

        assert!(gate.due(start).is_empty());
        assert_eq!(
            gate.due(start + Duration::milliseconds(100)),
            vec!["early".to_string(), "early-too".to_string()]
        );
        assert_eq!(gate.scheduled_count(), 1);
        assert_eq!(gate.due(start + Duration::seconds(1)), vec!["late".to_string()]);
    }

    #[test]
    fn test_after_millis() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(after_millis(start, 250), start + Duration::milliseconds(250));
        assert_eq!(after_millis(start, 0), start);
    }
}
