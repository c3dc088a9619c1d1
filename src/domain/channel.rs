// Channel domain model - identifiers, readings and the active-set registry
use chrono::{DateTime, Utc};
use std::fmt;

/// Identifier of one reporting sensor channel.
///
/// Ordering is by numeric value, never by string form: `"10"` sorts after
/// `"9"`. Display and chart dataset indices depend on this being stable
/// across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u32);

impl ChannelId {
    /// Parse a wire key like `"204"` into a channel id.
    pub fn parse(key: &str) -> Option<Self> {
        key.parse::<u32>().ok().map(ChannelId)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One measurement for one channel. `value` is `None` when the server
/// reported the channel without a valid reading; that is rendered as a
/// placeholder and never plotted as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub channel: ChannelId,
    pub value: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(channel: ChannelId, value: Option<f64>, captured_at: DateTime<Utc>) -> Self {
        Self {
            channel,
            value,
            captured_at,
        }
    }
}

/// Result of feeding one batch's keys into the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDiff {
    /// The batch's channel ids, sorted ascending by numeric value.
    pub keys: Vec<ChannelId>,
    /// True when the sorted sequence differs from the previously
    /// registered one (added, removed or reordered channels).
    pub changed: bool,
}

/// Tracks the active channel set, inferred from traffic.
///
/// The channel set is not declared anywhere out-of-band, so every batch is
/// a potential schema-change event. Comparison is a linear scan over the
/// ordered sequence; at dashboard scale nothing faster is warranted.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    active: Vec<ChannelId>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently registered channels in canonical (ascending) order.
    pub fn active(&self) -> &[ChannelId] {
        &self.active
    }

    /// Compare a batch's keys against the registered set, adopting the new
    /// sequence if it differs.
    pub fn observe(&mut self, mut keys: Vec<ChannelId>) -> ChannelDiff {
        keys.sort_unstable();
        let changed = keys != self.active;
        if changed {
            self.active = keys.clone();
        }
        ChannelDiff { keys, changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<ChannelId> {
        raw.iter().copied().map(ChannelId).collect()
    }

    #[test]
    fn test_numeric_ordering_not_lexicographic() {
        let mut registry = ChannelRegistry::new();
        let diff = registry.observe(ids(&[9, 10, 2]));
        assert_eq!(diff.keys, ids(&[2, 9, 10]));
        assert!(diff.changed);
    }

    #[test]
    fn test_identical_set_is_not_a_change() {
        let mut registry = ChannelRegistry::new();
        registry.observe(ids(&[204, 205]));
        let diff = registry.observe(ids(&[205, 204]));
        assert!(!diff.changed);
        assert_eq!(diff.keys, ids(&[204, 205]));
    }

    #[test]
    fn test_superset_and_subset_are_changes() {
        let mut registry = ChannelRegistry::new();
        registry.observe(ids(&[204, 205]));

        let diff = registry.observe(ids(&[204, 205, 206]));
        assert!(diff.changed);

        let diff = registry.observe(ids(&[204]));
        assert!(diff.changed);
        assert_eq!(registry.active(), &ids(&[204])[..]);
    }

    #[test]
    fn test_replaced_channel_is_a_change() {
        let mut registry = ChannelRegistry::new();
        registry.observe(ids(&[204, 205]));
        let diff = registry.observe(ids(&[204, 206]));
        assert!(diff.changed);
        assert_eq!(diff.keys, ids(&[204, 206]));
    }

    #[test]
    fn test_parse_channel_key() {
        assert_eq!(ChannelId::parse("204"), Some(ChannelId(204)));
        assert_eq!(ChannelId::parse("type"), None);
        assert_eq!(ChannelId::parse("-1"), None);
    }
}
