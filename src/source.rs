//! Audio-producing sources as seen by the core.
//!
//! Sources are discovered elsewhere (see the binary's `discovery` module);
//! the core only needs their identity and whether they are audibly playing.

use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier handed out by the discovery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Query the session makes when a source pauses or ends.
pub trait SourceDirectory {
    /// True when some tracked source other than `excluding` is playing and not muted.
    fn is_any_other_source_playing(&self, excluding: SourceId) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceStatus {
    pub playing: bool,
    pub muted: bool,
}

impl SourceStatus {
    pub fn audible(&self) -> bool {
        self.playing && !self.muted
    }
}

/// Tracked sources and their last reported playback status.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceId, SourceStatus>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_playing(&mut self, source: SourceId, muted: bool) {
        self.sources.insert(
            source,
            SourceStatus {
                playing: true,
                muted,
            },
        );
    }

    pub fn mark_stopped(&mut self, source: SourceId) {
        self.sources.entry(source).or_default().playing = false;
    }

    /// Stop tracking a source entirely.
    pub fn forget(&mut self, source: SourceId) {
        self.sources.remove(&source);
    }

    pub fn status(&self, source: SourceId) -> Option<SourceStatus> {
        self.sources.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn audible_count(&self) -> usize {
        self.sources.values().filter(|s| s.audible()).count()
    }
}

impl SourceDirectory for SourceRegistry {
    fn is_any_other_source_playing(&self, excluding: SourceId) -> bool {
        self.sources
            .iter()
            .any(|(id, status)| *id != excluding && status.audible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_sources_do_not_count_as_playing() {
        let mut registry = SourceRegistry::new();
        registry.mark_playing(SourceId(1), true);
        assert!(!registry.is_any_other_source_playing(SourceId(2)));

        registry.mark_playing(SourceId(3), false);
        assert!(registry.is_any_other_source_playing(SourceId(2)));
        assert!(!registry.is_any_other_source_playing(SourceId(3)));
    }

    #[test]
    fn stopped_and_forgotten_sources_are_not_playing() {
        let mut registry = SourceRegistry::new();
        registry.mark_playing(SourceId(1), false);
        registry.mark_playing(SourceId(2), false);
        registry.mark_stopped(SourceId(1));
        registry.forget(SourceId(2));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.audible_count(), 0);
        assert!(!registry.is_any_other_source_playing(SourceId(9)));
    }
}
