//! Page-level view state for the dashboard.
//!
//! Every user action and every completed side effect is a [`Command`].
//! [`DashboardView::update`] applies it and returns an [`Update`]: the
//! visible changes it made plus the side effects the caller must perform.
//! The view never performs I/O itself.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::annotation::{self, Annotation};
use crate::audio::{AudioPlayer, PlayerChange, PlayerDeck};
use crate::client::LedgerLookup;
use crate::filter::{FilterMode, FilterState, StatusFilter};
use crate::records::{GrievanceStatus, Record};
use crate::toast::{Severity, Toast, ToastChange, ToastSlot, ToastTiming};

pub const SAVE_LABEL: &str = "Save";
pub const SAVING_LABEL: &str = "Updating...";
pub const SAVED_LABEL: &str = "Saved!";
pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

/// How long the status selector stays highlighted after a change.
pub const SELECTOR_HIGHLIGHT: Duration = Duration::from_millis(1000);

pub const COPIED_TOAST: &str = "Hash copied to clipboard!";
pub const NOT_FOUND_TOAST: &str = "⚠ Not found in blockchain";
pub const MISMATCH_TOAST: &str = "⚠ Hash mismatch on ledger";
pub const VERIFY_FAILED_TOAST: &str = "❌ Verification failed";
pub const NO_HASH_TOAST: &str = "⚠ No integrity hash recorded";

pub const UPDATE_REJECTED_ALERT: &str = "Failed to update status";
pub const UPDATE_ERROR_ALERT: &str = "Error updating status";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter_mode: FilterMode,
    pub toast: ToastTiming,
    /// How long "Saved!" and "Copied!" stay on their controls.
    pub feedback: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::default(),
            toast: ToastTiming::default(),
            feedback: Duration::from_millis(2000),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    Busy,
    Flash { label: &'static str, until: Instant },
}

impl ControlState {
    pub fn label(self, idle: &'static str) -> &'static str {
        match self {
            ControlState::Idle => idle,
            ControlState::Busy => SAVING_LABEL,
            ControlState::Flash { label, .. } => label,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusBadge {
    pub text: String,
    pub class: &'static str,
}

impl StatusBadge {
    fn for_status(status: GrievanceStatus) -> Self {
        Self {
            text: status.label().to_string(),
            class: status.css_class(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordView {
    pub record: Record,
    pub annotation: Annotation,
    pub visible: bool,
    pub badge: StatusBadge,
    /// Current value of the record's status selector.
    pub selected: GrievanceStatus,
    pub save: ControlState,
    pub copy: ControlState,
    /// Set while the selector is highlighted after a change.
    pub selector_highlight_until: Option<Instant>,
}

impl RecordView {
    fn new(record: Record) -> Self {
        Self {
            annotation: annotation::parse(&record.content),
            visible: true,
            badge: StatusBadge::for_status(record.status),
            selected: record.status,
            save: ControlState::Idle,
            copy: ControlState::Idle,
            selector_highlight_until: None,
            record,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateFailure {
    Rejected { status: u16 },
    Network { message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Search(String),
    ClearSearch,
    SelectFilter(StatusFilter),
    SelectStatus { id: String, status: GrievanceStatus },
    SaveStatus { id: String },
    StatusSaved { id: String, ticket: u64, status: GrievanceStatus },
    StatusFailed { id: String, ticket: u64, failure: UpdateFailure },
    Verify { id: String },
    Verified { id: String, lookup: LedgerLookup },
    VerifyFailed { id: String, reason: String },
    CopyHash { id: String },
    HashCopied { id: String },
    CopyFailed { id: String, reason: String },
    TogglePlayback { id: String },
    MediaLoaded { id: String, duration: f64 },
    TimeUpdate { id: String, current_time: f64 },
    Seek { id: String, click_x: f64, track_left: f64, track_width: f64 },
    SeekFraction { id: String, fraction: f64 },
    PlaybackEnded { id: String },
    DismissAlert,
    Tick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownRecord,
    NoPlayer,
    SaveInFlight,
    StaleResponse,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewChange {
    Shown { id: String },
    Hidden { id: String },
    FilterActivated { filter: StatusFilter },
    SelectorChanged { id: String, status: GrievanceStatus },
    SelectorHighlight { id: String, active: bool },
    BadgeUpdated { id: String, text: String, class: &'static str },
    SaveControl { id: String, label: &'static str },
    CopyControl { id: String, label: &'static str },
    Player(PlayerChange),
    Toast(ToastChange),
    Alert { message: String },
    AlertDismissed,
    Ignored { id: String, reason: IgnoreReason },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaEffect {
    Play,
    Pause,
    Seek { position: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    SubmitStatus { id: String, status: GrievanceStatus, ticket: u64 },
    LookupLedger { id: String },
    WriteClipboard { id: String, hash: String },
    Media { id: String, action: MediaEffect },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    pub changes: Vec<ViewChange>,
    pub effects: Vec<Effect>,
}

impl Update {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.effects.is_empty()
    }

    pub fn extend(&mut self, other: Update) {
        self.changes.extend(other.changes);
        self.effects.extend(other.effects);
    }

    fn ignored(id: &str, reason: IgnoreReason) -> Self {
        Self {
            changes: vec![ViewChange::Ignored {
                id: id.to_string(),
                reason,
            }],
            effects: Vec::new(),
        }
    }
}

pub fn verified_message(lookup: &LedgerLookup) -> String {
    let block = lookup
        .block_index
        .map(|b| b.to_string())
        .unwrap_or_else(|| "?".to_string());
    let at = lookup.timestamp.as_deref().unwrap_or("unknown time");
    match lookup.blockchain.as_deref() {
        Some(chain) if !chain.trim().is_empty() => {
            format!("✓ Verified on Block #{block} at {at} ({chain})")
        }
        _ => format!("✓ Verified on Block #{block} at {at}"),
    }
}

#[derive(Clone, Debug)]
pub struct DashboardView {
    records: Vec<RecordView>,
    filter: FilterState,
    deck: PlayerDeck,
    toast: ToastSlot,
    alert: Option<String>,
    feedback: Duration,
    next_ticket: u64,
    in_flight: HashMap<String, u64>,
}

impl DashboardView {
    pub fn new(records: Vec<Record>, options: ViewOptions) -> Self {
        let mut deck = PlayerDeck::new();
        for record in records.iter().filter(|r| r.has_audio()) {
            deck.add(AudioPlayer::new(record.id.clone(), record.audio_duration));
        }
        Self {
            records: records.into_iter().map(RecordView::new).collect(),
            filter: FilterState::new(options.filter_mode),
            deck,
            toast: ToastSlot::new(options.toast),
            alert: None,
            feedback: options.feedback,
            next_ticket: 0,
            in_flight: HashMap::new(),
        }
    }

    pub fn records(&self) -> &[RecordView] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&RecordView> {
        self.records.iter().find(|r| r.record.id == id)
    }

    pub fn visible(&self) -> impl Iterator<Item = &RecordView> {
        self.records.iter().filter(|r| r.visible)
    }

    pub fn visible_ids(&self) -> Vec<&str> {
        self.visible().map(|r| r.record.id.as_str()).collect()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn deck(&self) -> &PlayerDeck {
        &self.deck
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.current()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn is_saving(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn saves_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn index(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.record.id == id)
    }

    pub fn update(&mut self, command: Command, now: Instant) -> Update {
        match command {
            Command::Search(term) => {
                self.filter.set_term(&term);
                self.refresh_visibility()
            }
            Command::ClearSearch => {
                self.filter.set_term("");
                self.refresh_visibility()
            }
            Command::SelectFilter(filter) => self.select_filter(filter),
            Command::SelectStatus { id, status } => {
                let Some(idx) = self.index(&id) else {
                    return Update::ignored(&id, IgnoreReason::UnknownRecord);
                };
                let view = &mut self.records[idx];
                view.selected = status;
                view.selector_highlight_until = Some(now + SELECTOR_HIGHLIGHT);
                Update {
                    changes: vec![
                        ViewChange::SelectorChanged {
                            id: id.clone(),
                            status,
                        },
                        ViewChange::SelectorHighlight { id, active: true },
                    ],
                    effects: Vec::new(),
                }
            }
            Command::SaveStatus { id } => self.save_status(id),
            Command::StatusSaved { id, ticket, status } => self.status_saved(id, ticket, status, now),
            Command::StatusFailed {
                id,
                ticket,
                failure,
            } => self.status_failed(id, ticket, failure),
            Command::Verify { id } => Update {
                changes: Vec::new(),
                effects: vec![Effect::LookupLedger { id }],
            },
            Command::Verified { id, lookup } => self.verified(&id, &lookup, now),
            Command::VerifyFailed { .. } => {
                self.show_toast(VERIFY_FAILED_TOAST, Severity::Error, now)
            }
            Command::CopyHash { id } => self.copy_hash(id, now),
            Command::HashCopied { id } => self.hash_copied(id, now),
            Command::CopyFailed { id, .. } => {
                let Some(idx) = self.index(&id) else {
                    return Update::default();
                };
                self.records[idx].copy = ControlState::Idle;
                Update::default()
            }
            Command::TogglePlayback { id } => {
                let result = self.deck.toggle(&id);
                self.player_update(&id, result)
            }
            Command::MediaLoaded { id, duration } => match self.deck.media_loaded(&id, duration) {
                Ok(()) => Update::default(),
                Err(_) => Update::ignored(&id, IgnoreReason::NoPlayer),
            },
            Command::TimeUpdate { id, current_time } => {
                let result = self
                    .deck
                    .time_update(&id, current_time)
                    .map(|c| c.into_iter().collect());
                self.player_update(&id, result)
            }
            Command::Seek {
                id,
                click_x,
                track_left,
                track_width,
            } => {
                let result = self
                    .deck
                    .seek(&id, click_x, track_left, track_width)
                    .map(|c| c.into_iter().collect());
                self.player_update(&id, result)
            }
            Command::SeekFraction { id, fraction } => {
                let result = self
                    .deck
                    .seek_to_fraction(&id, fraction)
                    .map(|c| c.into_iter().collect());
                self.player_update(&id, result)
            }
            Command::PlaybackEnded { id } => {
                let result = self.deck.ended(&id);
                self.player_update(&id, result)
            }
            Command::DismissAlert => match self.alert.take() {
                Some(_) => Update {
                    changes: vec![ViewChange::AlertDismissed],
                    effects: Vec::new(),
                },
                None => Update::default(),
            },
            Command::Tick => self.tick(now),
        }
    }

    fn refresh_visibility(&mut self) -> Update {
        let mut update = Update::default();
        for view in self.records.iter_mut() {
            let visible = self.filter.is_visible(&view.record);
            if visible == view.visible {
                continue;
            }
            view.visible = visible;
            let id = view.record.id.clone();
            update.changes.push(if visible {
                ViewChange::Shown { id }
            } else {
                ViewChange::Hidden { id }
            });
        }
        update
    }

    fn select_filter(&mut self, filter: StatusFilter) -> Update {
        if !self.filter.select(filter) {
            return Update::default();
        }
        let mut update = Update {
            changes: vec![ViewChange::FilterActivated { filter }],
            effects: Vec::new(),
        };
        update.extend(self.refresh_visibility());
        update
    }

    fn save_status(&mut self, id: String) -> Update {
        let Some(idx) = self.index(&id) else {
            return Update::ignored(&id, IgnoreReason::UnknownRecord);
        };
        if self.in_flight.contains_key(&id) {
            return Update::ignored(&id, IgnoreReason::SaveInFlight);
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight.insert(id.clone(), ticket);
        let view = &mut self.records[idx];
        view.save = ControlState::Busy;
        Update {
            changes: vec![ViewChange::SaveControl {
                id: id.clone(),
                label: SAVING_LABEL,
            }],
            effects: vec![Effect::SubmitStatus {
                id,
                status: view.selected,
                ticket,
            }],
        }
    }

    /// Takes the in-flight slot for `id` if `ticket` owns it.
    fn settle(&mut self, id: &str, ticket: u64) -> Option<usize> {
        if self.in_flight.get(id) != Some(&ticket) {
            return None;
        }
        self.in_flight.remove(id);
        self.index(id)
    }

    fn status_saved(&mut self, id: String, ticket: u64, status: GrievanceStatus, now: Instant) -> Update {
        let Some(idx) = self.settle(&id, ticket) else {
            return Update::ignored(&id, IgnoreReason::StaleResponse);
        };
        let feedback = self.feedback;
        let view = &mut self.records[idx];
        view.record.status = status;
        view.badge = StatusBadge::for_status(status);
        view.save = ControlState::Flash {
            label: SAVED_LABEL,
            until: now + feedback,
        };
        let mut update = Update {
            changes: vec![
                ViewChange::BadgeUpdated {
                    id: id.clone(),
                    text: view.badge.text.clone(),
                    class: view.badge.class,
                },
                ViewChange::SaveControl {
                    id,
                    label: SAVED_LABEL,
                },
            ],
            effects: Vec::new(),
        };
        update.extend(self.refresh_visibility());
        update
    }

    fn status_failed(&mut self, id: String, ticket: u64, failure: UpdateFailure) -> Update {
        let Some(idx) = self.settle(&id, ticket) else {
            return Update::ignored(&id, IgnoreReason::StaleResponse);
        };
        self.records[idx].save = ControlState::Idle;
        let message = match failure {
            UpdateFailure::Rejected { .. } => UPDATE_REJECTED_ALERT,
            UpdateFailure::Network { .. } => UPDATE_ERROR_ALERT,
        };
        self.alert = Some(message.to_string());
        Update {
            changes: vec![
                ViewChange::SaveControl {
                    id,
                    label: SAVE_LABEL,
                },
                ViewChange::Alert {
                    message: message.to_string(),
                },
            ],
            effects: Vec::new(),
        }
    }

    fn verified(&mut self, id: &str, lookup: &LedgerLookup, now: Instant) -> Update {
        if !lookup.found {
            return self.show_toast(NOT_FOUND_TOAST, Severity::Warning, now);
        }
        let local_hash = self.record(id).and_then(|r| r.record.hash.as_deref());
        if lookup.hash_matches(local_hash) == Some(false) {
            return self.show_toast(MISMATCH_TOAST, Severity::Warning, now);
        }
        let message = verified_message(lookup);
        self.show_toast(message, Severity::Success, now)
    }

    fn copy_hash(&mut self, id: String, now: Instant) -> Update {
        let Some(view) = self.record(&id) else {
            return Update::ignored(&id, IgnoreReason::UnknownRecord);
        };
        let hash = view
            .record
            .hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        match hash {
            Some(hash) => Update {
                changes: Vec::new(),
                effects: vec![Effect::WriteClipboard { id, hash }],
            },
            None => self.show_toast(NO_HASH_TOAST, Severity::Warning, now),
        }
    }

    fn hash_copied(&mut self, id: String, now: Instant) -> Update {
        let mut update = Update::default();
        if let Some(idx) = self.index(&id) {
            self.records[idx].copy = ControlState::Flash {
                label: COPIED_LABEL,
                until: now + self.feedback,
            };
            update.changes.push(ViewChange::CopyControl {
                id,
                label: COPIED_LABEL,
            });
        }
        update.extend(self.show_toast(COPIED_TOAST, Severity::Success, now));
        update
    }

    fn show_toast(&mut self, message: impl Into<String>, severity: Severity, now: Instant) -> Update {
        let change = self.toast.show(message, severity, now);
        Update {
            changes: vec![ViewChange::Toast(change)],
            effects: Vec::new(),
        }
    }

    fn player_update(
        &mut self,
        id: &str,
        result: Result<Vec<PlayerChange>, crate::audio::AudioError>,
    ) -> Update {
        let Ok(player_changes) = result else {
            return Update::ignored(id, IgnoreReason::NoPlayer);
        };
        let mut update = Update::default();
        for change in player_changes {
            let effect = match &change {
                PlayerChange::Started { id } => Some((id.clone(), MediaEffect::Play)),
                PlayerChange::Paused { id } => Some((id.clone(), MediaEffect::Pause)),
                PlayerChange::Seeked { id, position } => {
                    Some((id.clone(), MediaEffect::Seek { position: *position }))
                }
                PlayerChange::IconReset { .. }
                | PlayerChange::Progress { .. }
                | PlayerChange::Finished { .. } => None,
            };
            if let Some((id, action)) = effect {
                update.effects.push(Effect::Media { id, action });
            }
            update.changes.push(ViewChange::Player(change));
        }
        update
    }

    fn tick(&mut self, now: Instant) -> Update {
        let mut update = Update::default();
        if let Some(change) = self.toast.tick(now) {
            update.changes.push(ViewChange::Toast(change));
        }
        for view in self.records.iter_mut() {
            if view.selector_highlight_until.is_some_and(|until| now >= until) {
                view.selector_highlight_until = None;
                update.changes.push(ViewChange::SelectorHighlight {
                    id: view.record.id.clone(),
                    active: false,
                });
            }
            if let ControlState::Flash { until, .. } = view.save {
                if now >= until {
                    view.save = ControlState::Idle;
                    update.changes.push(ViewChange::SaveControl {
                        id: view.record.id.clone(),
                        label: SAVE_LABEL,
                    });
                }
            }
            if let ControlState::Flash { until, .. } = view.copy {
                if now >= until {
                    view.copy = ControlState::Idle;
                    update.changes.push(ViewChange::CopyControl {
                        id: view.record.id.clone(),
                        label: COPY_LABEL,
                    });
                }
            }
        }
        update
    }
}
