//! Media source discovery.
//!
//! MPRIS players are polled on an interval; changes in their playback status
//! become source events for the engine. Player volume 0 counts as muted.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use wavestrip::{Event, SourceId};

/// Playback status of one player at poll time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub playing: bool,
    pub muted: bool,
}

/// Turns successive player snapshots into source events.
#[derive(Debug, Default)]
pub struct PlayerTracker {
    ids: HashMap<String, SourceId>,
    next_id: u32,
    last: HashMap<SourceId, PlayerSnapshot>,
}

impl PlayerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable id for a player bus name.
    pub fn id_for(&mut self, name: &str) -> SourceId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Compare the current players with the previous poll.
    pub fn diff(&mut self, players: &[(String, PlayerSnapshot)]) -> Vec<Event> {
        let mut events = Vec::new();
        let mut seen = HashMap::with_capacity(players.len());

        for (name, snapshot) in players {
            let source = self.id_for(name);
            let previous = self.last.get(&source).copied();
            seen.insert(source, *snapshot);

            if snapshot.playing {
                if previous != Some(*snapshot) {
                    debug!("{} ({}) playing, muted: {}", name, source, snapshot.muted);
                    events.push(Event::Play {
                        source,
                        muted: snapshot.muted,
                    });
                }
            } else if previous.is_some_and(|p| p.playing) {
                debug!("{} ({}) stopped", name, source);
                events.push(Event::PauseOrEnd { source });
            }
        }

        let mut gone: Vec<SourceId> = self
            .last
            .keys()
            .filter(|id| !seen.contains_key(id))
            .copied()
            .collect();
        gone.sort();
        for source in gone {
            debug!("Source {} disappeared", source);
            events.push(Event::Forget { source });
        }

        self.last = seen;
        events
    }
}

#[cfg(feature = "mpris")]
fn poll_players() -> anyhow::Result<Vec<(String, PlayerSnapshot)>> {
    use mpris::{FindingError, PlaybackStatus, PlayerFinder};

    let finder = PlayerFinder::new()?;
    let players = match finder.find_all() {
        Ok(players) => players,
        Err(FindingError::NoPlayerFound) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    Ok(players
        .iter()
        .map(|player| {
            let playing = matches!(player.get_playback_status(), Ok(PlaybackStatus::Playing));
            // players without a volume property are assumed audible
            let muted = player.get_volume().map(|v| v <= 0.0).unwrap_or(false);
            (player.bus_name().to_string(), PlayerSnapshot { playing, muted })
        })
        .collect())
}

/// Start the discovery task in the background.
#[cfg(feature = "mpris")]
pub fn start_discovery(poll_interval: Duration, events: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let mut tracker = PlayerTracker::new();
        let mut ticker = tokio::time::interval(poll_interval);
        info!("Watching MPRIS players every {:?}", poll_interval);

        loop {
            ticker.tick().await;

            let players = match poll_players() {
                Ok(players) => players,
                Err(e) => {
                    debug!("Failed to poll players: {}", e);
                    continue;
                }
            };

            for event in tracker.diff(&players) {
                if events.send(event).await.is_err() {
                    debug!("Render loop gone, stopping discovery");
                    return;
                }
            }
        }
    });
}

/// Without MPRIS the system output is the only source and is always playing.
#[cfg(not(feature = "mpris"))]
pub fn start_discovery(_poll_interval: Duration, events: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let mut tracker = PlayerTracker::new();
        let source = tracker.id_for("system-output");
        info!("Built without MPRIS, visualizing the system output");
        let _ = events
            .send(Event::Play {
                source,
                muted: false,
            })
            .await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, playing: bool, muted: bool) -> (String, PlayerSnapshot) {
        (name.to_string(), PlayerSnapshot { playing, muted })
    }

    #[test]
    fn ids_are_stable_per_bus_name() {
        let mut tracker = PlayerTracker::new();
        let a = tracker.id_for("org.mpris.MediaPlayer2.a");
        let b = tracker.id_for("org.mpris.MediaPlayer2.b");
        assert_ne!(a, b);
        assert_eq!(tracker.id_for("org.mpris.MediaPlayer2.a"), a);
    }

    #[test]
    fn status_changes_become_events_once() {
        let mut tracker = PlayerTracker::new();
        assert!(tracker.diff(&[player("a", false, false)]).is_empty());

        let events = tracker.diff(&[player("a", true, false)]);
        let a = tracker.id_for("a");
        assert_eq!(events, vec![Event::Play { source: a, muted: false }]);
        assert!(tracker.diff(&[player("a", true, false)]).is_empty());

        let events = tracker.diff(&[player("a", false, false)]);
        assert_eq!(events, vec![Event::PauseOrEnd { source: a }]);
        assert!(tracker.diff(&[player("a", false, false)]).is_empty());
    }

    #[test]
    fn mute_toggle_reannounces_play() {
        let mut tracker = PlayerTracker::new();
        tracker.diff(&[player("a", true, false)]);
        let a = tracker.id_for("a");
        assert_eq!(
            tracker.diff(&[player("a", true, true)]),
            vec![Event::Play { source: a, muted: true }]
        );
        assert_eq!(
            tracker.diff(&[player("a", true, false)]),
            vec![Event::Play { source: a, muted: false }]
        );
    }

    #[test]
    fn vanished_players_are_forgotten() {
        let mut tracker = PlayerTracker::new();
        tracker.diff(&[player("a", true, false), player("b", false, false)]);
        let a = tracker.id_for("a");
        let b = tracker.id_for("b");
        let events = tracker.diff(&[]);
        assert_eq!(events, vec![Event::Forget { source: a }, Event::Forget { source: b }]);
        assert!(tracker.diff(&[]).is_empty());
    }
}
