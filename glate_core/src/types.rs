//! Core domain types for the Glate advisory engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Substance definitions and their interaction rules (static science data)
//! - Active doses (what a user has actually taken)
//! - Derived findings (conflicts, status rows)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Substance Science Data
// ============================================================================

/// Grouping used by alert policies (e.g. "no stimulants before bed")
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubstanceCategory {
    Mineral,
    Vitamin,
    Stimulant,
    Nootropic,
    AminoAcid,
}

/// Nature of the relationship between two substances
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    /// Source blocks or reduces absorption of the target (e.g. calcium -> iron)
    Inhibit,
    /// Source increases effect or absorption of the target (e.g. vitamin C -> iron)
    Potentiate,
    /// The combination poses a health risk
    Dangerous,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Inhibit => "INHIBIT",
            InteractionKind::Potentiate => "POTENTIATE",
            InteractionKind::Dangerous => "DANGEROUS",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule: "while this substance is active, be careful with `target_id`"
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InteractionRule {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// Hours after ingestion during which the rule applies
    pub window_hours: f64,
    pub note: String,
}

impl InteractionRule {
    /// The clearance window as a duration
    pub fn window(&self) -> Duration {
        crate::decay::from_hours(self.window_hours)
    }
}

/// Immutable science data for one substance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubstanceDefinition {
    pub id: String,
    pub name: String,
    pub category: SubstanceCategory,
    pub half_life_hours: f64,
    /// Absorption efficiency in [0, 1]
    pub bioavailability: f64,
    #[serde(default)]
    pub interactions: Vec<InteractionRule>,
}

impl SubstanceDefinition {
    /// First rule targeting `target_id`, if any
    pub fn rule_for(&self, target_id: &str) -> Option<&InteractionRule> {
        self.interactions.iter().find(|r| r.target_id == target_id)
    }
}

// ============================================================================
// Runtime State
// ============================================================================

/// A dose the user has actually taken
///
/// The remaining amount is never stored; it is recomputed from
/// `amount_mg`, the substance half-life and the time since `ingested_at`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActiveDose {
    pub id: Uuid,
    pub substance_id: String,
    pub amount_mg: f64,
    pub ingested_at: DateTime<Utc>,
}

impl ActiveDose {
    /// Create a dose with a fresh identity
    pub fn new(substance_id: impl Into<String>, amount_mg: f64, ingested_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            substance_id: substance_id.into(),
            amount_mg,
            ingested_at,
        }
    }
}

// ============================================================================
// Derived Findings
// ============================================================================

/// A detected issue between an active substance and a proposed one
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict {
    /// Display name of the substance already in the body
    pub substance_a: String,
    /// Display name of the proposed substance
    pub substance_b: String,
    pub kind: InteractionKind,
    pub reason: String,
    /// Time until the interaction window closes
    pub wait_time: Duration,
}

/// Outcome of a safety check
#[derive(Clone, Debug)]
pub struct SafetyReport {
    pub safe: bool,
    pub conflicts: Vec<Conflict>,
}

impl From<Vec<Conflict>> for SafetyReport {
    fn from(conflicts: Vec<Conflict>) -> Self {
        Self {
            safe: conflicts.is_empty(),
            conflicts,
        }
    }
}

/// Per-dose view of a user's stack at a point in time
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseStatus {
    pub substance: String,
    pub original_mg: f64,
    pub current_mg: f64,
    pub time_elapsed: String,
}

/// How a component reacts to a dose whose substance has no definition
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSubstancePolicy {
    /// Fail (advisor) or abandon the user's stack for this tick (monitor)
    Strict,
    /// Skip the dose and keep going
    Lenient,
}
