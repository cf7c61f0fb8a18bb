//! Playback control state for the recorded evidence players.
//!
//! The deck never touches media itself. Every operation returns the
//! [`PlayerChange`]s it made so the caller can mirror them onto real media
//! elements and icons.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    Play,
    Pause,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerChange {
    Paused { id: String },
    IconReset { id: String },
    Started { id: String },
    Progress { id: String, percent: f64 },
    Seeked { id: String, position: f64 },
    Finished { id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("no audio player for record {id}")]
    UnknownPlayer { id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioPlayer {
    pub id: String,
    pub playing: bool,
    pub icon: Icon,
    pub position: f64,
    pub duration: Option<f64>,
    pub progress: f64,
}

impl AudioPlayer {
    pub fn new(id: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            id: id.into(),
            playing: false,
            icon: Icon::Play,
            position: 0.0,
            duration,
            progress: 0.0,
        }
    }
}

/// Percentage of `duration` reached at `current`, or `None` while the media
/// has no usable duration.
pub fn progress_percent(current: f64, duration: f64) -> Option<f64> {
    if !current.is_finite() || !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some((current / duration * 100.0).clamp(0.0, 100.0))
}

pub fn seek_fraction(click_x: f64, track_left: f64, track_width: f64) -> Option<f64> {
    if !track_width.is_finite() || track_width <= 0.0 {
        return None;
    }
    let fraction = (click_x - track_left) / track_width;
    if !fraction.is_finite() {
        return None;
    }
    Some(fraction.clamp(0.0, 1.0))
}

#[derive(Clone, Debug, Default)]
pub struct PlayerDeck {
    players: Vec<AudioPlayer>,
}

impl PlayerDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, player: AudioPlayer) {
        if self.index(&player.id).is_none() {
            self.players.push(player);
        }
    }

    pub fn players(&self) -> &[AudioPlayer] {
        &self.players
    }

    pub fn get(&self, id: &str) -> Option<&AudioPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn now_playing(&self) -> Option<&AudioPlayer> {
        self.players.iter().find(|p| p.playing)
    }

    fn index(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn require(&self, id: &str) -> Result<usize, AudioError> {
        self.index(id)
            .ok_or_else(|| AudioError::UnknownPlayer { id: id.to_string() })
    }

    pub fn toggle(&mut self, id: &str) -> Result<Vec<PlayerChange>, AudioError> {
        let idx = self.require(id)?;
        if self.players[idx].playing {
            self.pause(id)
        } else {
            self.play(id)
        }
    }

    /// Pauses every other player and resets every icon before starting `id`.
    pub fn play(&mut self, id: &str) -> Result<Vec<PlayerChange>, AudioError> {
        let idx = self.require(id)?;
        let mut changes = Vec::new();
        for (i, player) in self.players.iter_mut().enumerate() {
            if i != idx && player.playing {
                player.playing = false;
                changes.push(PlayerChange::Paused {
                    id: player.id.clone(),
                });
            }
            if player.icon != Icon::Play {
                player.icon = Icon::Play;
                changes.push(PlayerChange::IconReset {
                    id: player.id.clone(),
                });
            }
        }
        let player = &mut self.players[idx];
        player.playing = true;
        player.icon = Icon::Pause;
        changes.push(PlayerChange::Started {
            id: player.id.clone(),
        });
        Ok(changes)
    }

    pub fn pause(&mut self, id: &str) -> Result<Vec<PlayerChange>, AudioError> {
        let idx = self.require(id)?;
        let player = &mut self.players[idx];
        let mut changes = Vec::new();
        if player.playing {
            player.playing = false;
            changes.push(PlayerChange::Paused {
                id: player.id.clone(),
            });
        }
        if player.icon != Icon::Play {
            player.icon = Icon::Play;
            changes.push(PlayerChange::IconReset {
                id: player.id.clone(),
            });
        }
        Ok(changes)
    }

    pub fn media_loaded(&mut self, id: &str, duration: f64) -> Result<(), AudioError> {
        let idx = self.require(id)?;
        if duration.is_finite() && duration > 0.0 {
            self.players[idx].duration = Some(duration);
        }
        Ok(())
    }

    /// Timeline update; no change is reported while the duration is unknown.
    pub fn time_update(
        &mut self,
        id: &str,
        current_time: f64,
    ) -> Result<Option<PlayerChange>, AudioError> {
        let idx = self.require(id)?;
        let player = &mut self.players[idx];
        if current_time.is_finite() && current_time >= 0.0 {
            player.position = current_time;
        }
        let Some(percent) = player
            .duration
            .and_then(|d| progress_percent(current_time, d))
        else {
            return Ok(None);
        };
        player.progress = percent;
        Ok(Some(PlayerChange::Progress {
            id: player.id.clone(),
            percent,
        }))
    }

    pub fn seek(
        &mut self,
        id: &str,
        click_x: f64,
        track_left: f64,
        track_width: f64,
    ) -> Result<Option<PlayerChange>, AudioError> {
        let fraction = seek_fraction(click_x, track_left, track_width);
        self.seek_to_fraction(id, fraction.unwrap_or(f64::NAN))
    }

    pub fn seek_to_fraction(
        &mut self,
        id: &str,
        fraction: f64,
    ) -> Result<Option<PlayerChange>, AudioError> {
        let idx = self.require(id)?;
        let player = &mut self.players[idx];
        let Some(duration) = player.duration.filter(|d| d.is_finite() && *d > 0.0) else {
            return Ok(None);
        };
        if !fraction.is_finite() {
            return Ok(None);
        }
        let position = fraction.clamp(0.0, 1.0) * duration;
        player.position = position;
        player.progress = fraction.clamp(0.0, 1.0) * 100.0;
        Ok(Some(PlayerChange::Seeked {
            id: player.id.clone(),
            position,
        }))
    }

    pub fn ended(&mut self, id: &str) -> Result<Vec<PlayerChange>, AudioError> {
        let idx = self.require(id)?;
        let player = &mut self.players[idx];
        player.playing = false;
        player.progress = 0.0;
        player.position = 0.0;
        let mut changes = vec![PlayerChange::Finished {
            id: player.id.clone(),
        }];
        if player.icon != Icon::Play {
            player.icon = Icon::Play;
            changes.push(PlayerChange::IconReset {
                id: player.id.clone(),
            });
        }
        changes.push(PlayerChange::Progress {
            id: player.id.clone(),
            percent: 0.0,
        });
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> PlayerDeck {
        let mut deck = PlayerDeck::new();
        deck.add(AudioPlayer::new("a", Some(30.0)));
        deck.add(AudioPlayer::new("b", Some(10.0)));
        deck
    }

    #[test]
    fn playing_b_pauses_a_before_starting() {
        let mut deck = deck();
        deck.play("a").unwrap();
        let changes = deck.play("b").unwrap();
        assert_eq!(
            changes,
            vec![
                PlayerChange::Paused { id: "a".into() },
                PlayerChange::IconReset { id: "a".into() },
                PlayerChange::Started { id: "b".into() },
            ]
        );
        assert!(!deck.get("a").unwrap().playing);
        assert_eq!(deck.get("a").unwrap().icon, Icon::Play);
        assert_eq!(deck.now_playing().unwrap().id, "b");
    }

    #[test]
    fn toggle_pauses_the_playing_player() {
        let mut deck = deck();
        deck.toggle("a").unwrap();
        let changes = deck.toggle("a").unwrap();
        assert_eq!(
            changes,
            vec![
                PlayerChange::Paused { id: "a".into() },
                PlayerChange::IconReset { id: "a".into() },
            ]
        );
        assert!(deck.now_playing().is_none());
        assert_eq!(deck.pause("a").unwrap(), Vec::new());
        assert_eq!(deck.get("a").unwrap().icon, Icon::Play);
    }

    #[test]
    fn progress_is_guarded_and_clamped() {
        assert_eq!(progress_percent(5.0, 10.0), Some(50.0));
        assert_eq!(progress_percent(12.0, 10.0), Some(100.0));
        assert_eq!(progress_percent(1.0, 0.0), None);
        assert_eq!(progress_percent(1.0, f64::NAN), None);
        assert_eq!(progress_percent(1.0, f64::INFINITY), None);

        let mut deck = PlayerDeck::new();
        deck.add(AudioPlayer::new("x", None));
        assert_eq!(deck.time_update("x", 3.0).unwrap(), None);
        deck.media_loaded("x", 6.0).unwrap();
        assert_eq!(
            deck.time_update("x", 3.0).unwrap(),
            Some(PlayerChange::Progress {
                id: "x".into(),
                percent: 50.0
            })
        );
    }

    #[test]
    fn seek_uses_fraction_of_track() {
        let mut deck = deck();
        let change = deck.seek("a", 150.0, 100.0, 200.0).unwrap();
        assert_eq!(
            change,
            Some(PlayerChange::Seeked {
                id: "a".into(),
                position: 7.5
            })
        );
        assert_eq!(deck.seek("a", 150.0, 100.0, 0.0).unwrap(), None);
        assert_eq!(seek_fraction(500.0, 100.0, 200.0), Some(1.0));
        assert_eq!(seek_fraction(0.0, 100.0, 200.0), Some(0.0));
    }

    #[test]
    fn ended_resets_state() {
        let mut deck = deck();
        deck.play("b").unwrap();
        deck.time_update("b", 5.0).unwrap();
        let changes = deck.ended("b").unwrap();
        assert_eq!(
            changes,
            vec![
                PlayerChange::Finished { id: "b".into() },
                PlayerChange::IconReset { id: "b".into() },
                PlayerChange::Progress {
                    id: "b".into(),
                    percent: 0.0
                },
            ]
        );
        let b = deck.get("b").unwrap();
        assert!(!b.playing);
        assert_eq!(b.icon, Icon::Play);
        assert_eq!(b.progress, 0.0);
    }

    #[test]
    fn unknown_player_is_an_error() {
        let mut deck = deck();
        assert_eq!(
            deck.play("zzz"),
            Err(AudioError::UnknownPlayer { id: "zzz".into() })
        );
    }
}
