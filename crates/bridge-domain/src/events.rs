//! Event naming conventions
//!
//! Events follow the `<namespace>:<action>` convention, e.g.
//! `chat:message:new`. Wildcard configuration keys use `*` per segment
//! and `**` across segments.

/// Segment separator in event names
pub const EVENT_SEPARATOR: char = ':';

/// Emitted by the synchronizer after each completed flush
pub const SYNC_COMPLETED: &str = "bridge:sync:completed";

/// Emitted by the synchronizer when a full resync has been forced
pub const SYNC_RESYNC: &str = "bridge:sync:resync";

/// Emitted by the supervisor after each recovery cycle
pub const RECOVERY_CYCLE: &str = "bridge:recovery:cycle";

/// Emitted by the memory guard when a sweep flags suspects
pub const LEAK_REPORT: &str = "bridge:guard:leak_report";

/// Whether a name is a well-formed `<namespace>:<action>` event name
///
/// At least two non-empty segments, no wildcard characters.
pub fn is_valid_event_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split(EVENT_SEPARATOR).collect();
    segments.len() >= 2
        && segments
            .iter()
            .all(|s| !s.is_empty() && !s.contains('*'))
}

/// Whether a configuration key is a wildcard pattern rather than an exact name
pub fn is_pattern(key: &str) -> bool {
    key.contains('*')
}
