//! Game state events.
//!
//! Immutable, append-only records of what the player did. A closed tagged
//! union with a render dispatch keeps the set exhaustive: every event knows
//! its textual description (for prompts) and its route fragment (for the
//! offline cache key).

use serde::{Deserialize, Serialize};

use super::spell_out;

/// What set off a chase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChaseCause {
    Unknown,
    Destruction,
    Camera,
}

impl ChaseCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaseCause::Unknown => "Unknown",
            ChaseCause::Destruction => "Destruction",
            ChaseCause::Camera => "Camera",
        }
    }
}

/// City district an event took place in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum District {
    Harborside,
    OldTown,
    NeonValley,
}

impl District {
    pub fn as_str(&self) -> &'static str {
        match self {
            District::Harborside => "Harborside",
            District::OldTown => "OldTown",
            District::NeonValley => "NeonValley",
        }
    }
}

/// Kind of advertising surface the player destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillboardKind {
    Billboard,
    Hologram,
    StreetScreen,
}

impl BillboardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillboardKind::Billboard => "Billboard",
            BillboardKind::Hologram => "Hologram",
            BillboardKind::StreetScreen => "StreetScreen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "Low",
            Importance::Medium => "Medium",
            Importance::High => "High",
        }
    }
}

/// Details of a destroyed advertising surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillboardInfo {
    pub kind: BillboardKind,
    pub importance: Importance,
    pub description: String,
    pub district: District,
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Chase { cause: ChaseCause, district: District },
    Capture { district: District },
    Escape { district: District },
    Destruction { billboard: BillboardInfo },
    Story { description: String },
    General { description: String },
}

impl GameEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GameEvent::Chase { .. } => "chase",
            GameEvent::Capture { .. } => "capture",
            GameEvent::Escape { .. } => "escape",
            GameEvent::Destruction { .. } => "destruction",
            GameEvent::Story { .. } => "story",
            GameEvent::General { .. } => "general",
        }
    }

    /// Textual description for prompt context.
    pub fn render_text(&self) -> String {
        match self {
            GameEvent::Chase { cause, district } => format!(
                "The player was chased by the police:\n* cause: {}\n* district: {}",
                spell_out(cause.as_str()),
                spell_out(district.as_str())
            ),
            GameEvent::Capture { district } => format!(
                "The player was captured by the police in district '{}'",
                spell_out(district.as_str())
            ),
            GameEvent::Escape { district } => format!(
                "The player escaped the police in district '{}'",
                spell_out(district.as_str())
            ),
            GameEvent::Destruction { billboard } => format!(
                "Ad destructed by the player:\n* ad type: {}\n* importance: {}\n* ad description: '{}'\n* district: {}",
                spell_out(billboard.kind.as_str()),
                spell_out(billboard.importance.as_str()),
                billboard.description,
                spell_out(billboard.district.as_str())
            ),
            GameEvent::Story { description } => {
                format!("Important story event:\n{description}")
            }
            GameEvent::General { description } => {
                format!("General event:\n{description}")
            }
        }
    }

    /// Route fragment for the offline cache key:
    /// `/event$<kind>(<key>=<value>&...)`, all lowercase, newlines replaced
    /// with dashes so the fragment stays a single path segment.
    pub fn route_fragment(&self) -> String {
        let params = match self {
            GameEvent::Chase { cause, district } => format!(
                "cause={}&district={}",
                route_value(cause.as_str()),
                route_value(district.as_str())
            ),
            GameEvent::Capture { district } | GameEvent::Escape { district } => {
                format!("district={}", route_value(district.as_str()))
            }
            GameEvent::Destruction { billboard } => format!(
                "kind={}&importance={}&description={}&district={}",
                route_value(billboard.kind.as_str()),
                route_value(billboard.importance.as_str()),
                route_value(&billboard.description),
                route_value(billboard.district.as_str())
            ),
            GameEvent::Story { description } | GameEvent::General { description } => {
                format!("description={}", route_value(description))
            }
        };
        format!("/event${}({params})", self.kind_name())
    }
}

fn route_value(value: &str) -> String {
    value.to_lowercase().replace('\n', "-")
}
