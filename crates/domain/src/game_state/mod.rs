//! Game context: the state value registry and the append-only event log.
//!
//! The registry holds exactly one value per kind, in a fixed registration
//! order that later values may depend on. The event log is append-only and
//! its order is authoritative; both text and route rendering preserve it
//! oldest to newest.

mod events;
mod values;

pub use events::{BillboardInfo, BillboardKind, ChaseCause, District, GameEvent, Importance};
pub use values::{Intensity, Reputation, StateData, StateKind, StateValue, WorldInputs};

use serde::{Deserialize, Serialize};

/// Notification emitted when an update tick changed a value. Consumed by the
/// audio layer for continuous parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub kind: StateKind,
    pub data: StateData,
}

/// Live game context, recomputed on a tick and queried on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameContext {
    values: Vec<StateValue>,
    events: Vec<GameEvent>,
}

impl GameContext {
    /// Build the registry in its canonical order. The order matters both for
    /// the cache route and for update dependencies (reputation reads the
    /// progression value already updated this tick).
    pub fn new() -> Self {
        Self {
            values: vec![
                StateValue::progression(),
                StateValue::reputation(Reputation::Unknown),
                StateValue::intensity(Intensity::MenuLow),
            ],
            events: Vec::new(),
        }
    }

    pub fn values(&self) -> &[StateValue] {
        &self.values
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn value(&self, kind: StateKind) -> Option<&StateValue> {
        self.values.iter().find(|v| v.kind() == kind)
    }

    /// Current reputation level, defaulting to unknown if the registry was
    /// built without one.
    pub fn reputation(&self) -> Reputation {
        self.values
            .iter()
            .find_map(|v| match v.data {
                StateData::Reputation { level } => Some(level),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Recompute all non-frozen values in registration order and return the
    /// changes.
    pub fn update(&mut self, inputs: &WorldInputs) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for i in 0..self.values.len() {
            let (earlier, rest) = self.values.split_at_mut(i);
            let value = &mut rest[0];
            if value.update(inputs, earlier) {
                changes.push(StateChange {
                    kind: value.kind(),
                    data: value.data,
                });
            }
        }
        changes
    }

    /// Append an event. The log is never truncated or reordered.
    pub fn add_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Push a new intensity level from the world simulation. Respects the
    /// freeze flag; returns the change when one happened.
    pub fn set_intensity(&mut self, level: Intensity) -> Option<StateChange> {
        let value = self
            .values
            .iter_mut()
            .find(|v| v.kind() == StateKind::Intensity)?;
        if value.frozen || value.data == (StateData::Intensity { level }) {
            return None;
        }
        value.data = StateData::Intensity { level };
        Some(StateChange {
            kind: StateKind::Intensity,
            data: value.data,
        })
    }

    pub fn set_frozen(&mut self, kind: StateKind, frozen: bool) {
        if let Some(value) = self.values.iter_mut().find(|v| v.kind() == kind) {
            value.frozen = frozen;
        }
    }

    /// Replace the registered value of the same kind. Used to synthesize
    /// what-if states when pre-rendering offline cache content.
    pub fn override_value(&mut self, value: StateValue) {
        if let Some(slot) = self.values.iter_mut().find(|v| v.kind() == value.kind()) {
            *slot = value;
        }
    }

    /// Render the current state as prompt text.
    ///
    /// `kinds`: `None` includes every value, `Some(list)` only the listed
    /// kinds. `event_count < 0` means all events; `recent_only` takes the
    /// last `event_count` events in order, otherwise the count is linearly
    /// distributed across the whole log from oldest to newest.
    pub fn render_text(
        &self,
        kinds: Option<&[StateKind]>,
        event_count: i32,
        recent_only: bool,
    ) -> String {
        let mut lines: Vec<String> = Vec::new();

        for value in &self.values {
            if let Some(filter) = kinds {
                if !filter.contains(&value.kind()) {
                    continue;
                }
            }
            if let Some(text) = value.render_text() {
                lines.push(text);
            }
        }

        let indices = self.sampled_indices(event_count, recent_only);
        if !indices.is_empty() {
            lines.push("\nPlayer's recent activity from oldest to newest:".to_string());
            for (order, index) in indices.iter().enumerate() {
                lines.push(format!("{}. {}", order + 1, self.events[*index].render_text()));
            }
        }

        lines.join("\n")
    }

    /// Render the current state as a cache route suffix: the value fragments
    /// in registration order, then the last `event_count` event fragments.
    pub fn render_route(&self, event_count: i32) -> String {
        let mut route = String::new();
        for value in &self.values {
            if let Some(fragment) = value.route_fragment() {
                route.push_str(&fragment);
            }
        }
        for index in self.sampled_indices(event_count, true) {
            route.push_str(&self.events[index].route_fragment());
        }
        route
    }

    /// Event indices to render, oldest to newest.
    fn sampled_indices(&self, event_count: i32, recent_only: bool) -> Vec<usize> {
        let len = self.events.len();
        let count = if event_count < 0 {
            len
        } else {
            (event_count as usize).min(len)
        };
        if count == 0 {
            return Vec::new();
        }

        if recent_only {
            (len - count..len).collect()
        } else {
            // Stride len/count, truncating the index; always strictly
            // increasing and exactly `count` entries.
            (0..count).map(|i| i * len / count).collect()
        }
    }
}

/// Split a PascalCase identifier into words, e.g. `OldTown` -> `Old Town`.
pub(crate) fn spell_out(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
