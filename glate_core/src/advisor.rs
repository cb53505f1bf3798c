//! Interaction conflict detection.
//!
//! For each dose already in the body, two independent checks run against the
//! proposed substance:
//! - **Forward**: does the active substance declare a rule for the proposed one?
//! - **Reverse**: does the proposed substance declare a rule for the active one?
//!
//! A rule fires while the time since ingestion is inside its clearance window.
//! Interactions are not assumed symmetric, so both directions may fire for the
//! same pair.

use crate::catalog::DefinitionLookup;
use crate::{ActiveDose, Conflict, Error, InteractionRule, Result, SafetyReport, UnknownSubstancePolicy};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

const REVERSE_PREFIX: &str = "Reverse Conflict: ";

/// Safety check engine
#[derive(Clone)]
pub struct Advisor {
    lookup: Arc<dyn DefinitionLookup>,
    policy: UnknownSubstancePolicy,
}

impl Advisor {
    /// Create an advisor that fails on any unknown substance
    pub fn new(lookup: Arc<dyn DefinitionLookup>) -> Self {
        Self::with_policy(lookup, UnknownSubstancePolicy::Strict)
    }

    /// Create an advisor with an explicit policy for unknown active doses
    ///
    /// The proposed substance must always resolve; the policy only decides
    /// whether an unknown substance in the active stack aborts the check or
    /// is skipped.
    pub fn with_policy(lookup: Arc<dyn DefinitionLookup>, policy: UnknownSubstancePolicy) -> Self {
        Self { lookup, policy }
    }

    /// Check `proposed_id` against `active_stack` as of now
    pub fn check_safety(&self, active_stack: &[ActiveDose], proposed_id: &str) -> Result<Vec<Conflict>> {
        self.check_safety_at(active_stack, proposed_id, Utc::now())
    }

    /// Same as [`Advisor::check_safety`], wrapped in a report
    pub fn analyze(&self, active_stack: &[ActiveDose], proposed_id: &str) -> Result<SafetyReport> {
        self.check_safety(active_stack, proposed_id).map(SafetyReport::from)
    }

    /// Check `proposed_id` against `active_stack` at a fixed point in time
    ///
    /// Conflicts are returned in stack order, forward before reverse for each
    /// dose. An empty result means the combination is safe.
    pub fn check_safety_at(
        &self,
        active_stack: &[ActiveDose],
        proposed_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Conflict>> {
        let proposed = self
            .lookup
            .get(proposed_id)
            .map_err(|_| Error::UnknownSubstance(proposed_id.to_string()))?;

        let mut conflicts = Vec::new();

        for dose in active_stack {
            let active = match self.lookup.get(&dose.substance_id) {
                Ok(def) => def,
                Err(_) if self.policy == UnknownSubstancePolicy::Lenient => {
                    tracing::warn!(
                        "Skipping unknown active substance '{}' (dose {})",
                        dose.substance_id,
                        dose.id
                    );
                    continue;
                }
                Err(_) => return Err(Error::UnknownSubstance(dose.substance_id.clone())),
            };

            let elapsed = now - dose.ingested_at;

            if let Some(rule) = active.rule_for(proposed_id) {
                if let Some(wait_time) = open_window(rule, elapsed) {
                    conflicts.push(Conflict {
                        substance_a: active.name.clone(),
                        substance_b: proposed.name.clone(),
                        kind: rule.kind,
                        reason: rule.note.clone(),
                        wait_time,
                    });
                }
            }

            if let Some(rule) = proposed.rule_for(&dose.substance_id) {
                if let Some(wait_time) = open_window(rule, elapsed) {
                    conflicts.push(Conflict {
                        substance_a: active.name.clone(),
                        substance_b: proposed.name.clone(),
                        kind: rule.kind,
                        reason: format!("{}{}", REVERSE_PREFIX, rule.note),
                        wait_time,
                    });
                }
            }
        }

        tracing::debug!(
            "Safety check for '{}' against {} active doses: {} conflicts",
            proposed_id,
            active_stack.len(),
            conflicts.len()
        );

        Ok(conflicts)
    }
}

/// Remaining wait if `elapsed` is still inside the rule's window
///
/// Saturates at `Duration::MAX` for far-future doses against very long windows.
fn open_window(rule: &InteractionRule, elapsed: Duration) -> Option<Duration> {
    let window = rule.window();
    if elapsed >= window {
        return None;
    }
    Some(window.checked_sub(&elapsed).unwrap_or(Duration::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_default_catalog, Catalog};
    use crate::{InteractionKind, SubstanceCategory, SubstanceDefinition};

    fn definition(id: &str, name: &str, rules: Vec<(&str, InteractionKind, f64)>) -> SubstanceDefinition {
        SubstanceDefinition {
            id: id.into(),
            name: name.into(),
            category: SubstanceCategory::Mineral,
            half_life_hours: 4.0,
            bioavailability: 0.5,
            interactions: rules
                .into_iter()
                .map(|(target, kind, window_hours)| InteractionRule {
                    target_id: target.into(),
                    kind,
                    window_hours,
                    note: format!("{} -> {}", id, target),
                })
                .collect(),
        }
    }

    fn advisor_for(defs: Vec<SubstanceDefinition>) -> Advisor {
        Advisor::new(Arc::new(Catalog::from_definitions(defs).unwrap()))
    }

    fn default_advisor() -> Advisor {
        Advisor::new(Arc::new(build_default_catalog()))
    }

    #[test]
    fn test_morning_coffee_blocks_iron() {
        let advisor = default_advisor();
        let now = Utc::now();
        let stack = vec![ActiveDose::new("caffeine", 150.0, now - Duration::minutes(30))];

        let conflicts = advisor.check_safety_at(&stack, "iron-bisglycinate", now).unwrap();

        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.substance_a, "Caffeine");
        assert_eq!(conflict.substance_b, "Iron (Bisglycinate)");
        assert_eq!(conflict.kind, InteractionKind::Inhibit);
        assert_eq!(conflict.wait_time, Duration::hours(120) - Duration::minutes(30));
    }

    #[test]
    fn test_forward_rule_fires_only_inside_window() {
        let advisor = advisor_for(vec![
            definition("a", "A", vec![("b", InteractionKind::Inhibit, 2.0)]),
            definition("b", "B", vec![]),
        ]);
        let now = Utc::now();

        let inside = vec![ActiveDose::new("a", 100.0, now - Duration::minutes(90))];
        let conflicts = advisor.check_safety_at(&inside, "b", now).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].wait_time, Duration::minutes(30));
        assert_eq!(conflicts[0].reason, "a -> b");

        let at_edge = vec![ActiveDose::new("a", 100.0, now - Duration::hours(2))];
        assert!(advisor.check_safety_at(&at_edge, "b", now).unwrap().is_empty());

        let past = vec![ActiveDose::new("a", 100.0, now - Duration::hours(3))];
        assert!(advisor.check_safety_at(&past, "b", now).unwrap().is_empty());
    }

    #[test]
    fn test_forward_only_rule_yields_one_conflict() {
        let advisor = advisor_for(vec![
            definition("a", "A", vec![("b", InteractionKind::Inhibit, 2.0)]),
            definition("b", "B", vec![]),
        ]);
        let now = Utc::now();

        let stack = vec![ActiveDose::new("a", 100.0, now)];
        let conflicts = advisor.check_safety_at(&stack, "b", now).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts[0].reason.starts_with(REVERSE_PREFIX));

        // Same rule seen from the other side surfaces as a reverse finding
        let stack = vec![ActiveDose::new("b", 100.0, now)];
        let conflicts = advisor.check_safety_at(&stack, "a", now).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].substance_a, "B");
        assert!(conflicts[0].reason.starts_with(REVERSE_PREFIX));
    }

    #[test]
    fn test_bidirectional_rules_yield_two_conflicts() {
        let advisor = default_advisor();
        let now = Utc::now();
        let stack = vec![ActiveDose::new("zinc-picolinate", 30.0, now - Duration::minutes(20))];

        let conflicts = advisor.check_safety_at(&stack, "iron-bisglycinate", now).unwrap();

        assert_eq!(conflicts.len(), 2);
        assert!(!conflicts[0].reason.starts_with(REVERSE_PREFIX));
        assert!(conflicts[1].reason.starts_with(REVERSE_PREFIX));
        for conflict in &conflicts {
            assert_eq!(conflict.substance_a, "Zinc (Picolinate)");
            assert_eq!(conflict.substance_b, "Iron (Bisglycinate)");
        }
    }

    #[test]
    fn test_reverse_uses_proposed_rule_window() {
        let advisor = advisor_for(vec![
            definition("a", "A", vec![("b", InteractionKind::Inhibit, 1.0)]),
            definition("b", "B", vec![("a", InteractionKind::Dangerous, 5.0)]),
        ]);
        let now = Utc::now();
        let stack = vec![ActiveDose::new("a", 100.0, now - Duration::hours(2))];

        let conflicts = advisor.check_safety_at(&stack, "b", now).unwrap();

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, InteractionKind::Dangerous);
        assert_eq!(conflicts[0].reason, "Reverse Conflict: b -> a");
        assert_eq!(conflicts[0].wait_time, Duration::hours(3));
    }

    #[test]
    fn test_conflicts_follow_stack_order() {
        let advisor = default_advisor();
        let now = Utc::now();
        let stack = vec![
            ActiveDose::new("calcium-carbonate", 500.0, now - Duration::minutes(10)),
            ActiveDose::new("magnesium-glycinate", 200.0, now),
            ActiveDose::new("caffeine", 100.0, now - Duration::hours(1)),
        ];

        let conflicts = advisor.check_safety_at(&stack, "iron-bisglycinate", now).unwrap();

        let names: Vec<_> = conflicts.iter().map(|c| c.substance_a.as_str()).collect();
        assert_eq!(names, vec!["Calcium (Carbonate)", "Caffeine"]);
    }

    #[test]
    fn test_empty_stack_is_safe() {
        let advisor = default_advisor();
        let report = advisor.analyze(&[], "magnesium-glycinate").unwrap();
        assert!(report.safe);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_unknown_proposed_fails_even_with_empty_stack() {
        let advisor = default_advisor();
        let result = advisor.check_safety(&[], "unobtainium");
        assert!(matches!(result, Err(Error::UnknownSubstance(id)) if id == "unobtainium"));

        let lenient = Advisor::with_policy(
            Arc::new(build_default_catalog()),
            UnknownSubstancePolicy::Lenient,
        );
        assert!(lenient.check_safety(&[], "unobtainium").is_err());
    }

    #[test]
    fn test_unknown_active_substance_aborts_by_default() {
        let advisor = default_advisor();
        let now = Utc::now();
        let stack = vec![
            ActiveDose::new("caffeine", 150.0, now),
            ActiveDose::new("mystery-powder", 10.0, now),
        ];

        let result = advisor.check_safety_at(&stack, "iron-bisglycinate", now);
        assert!(matches!(result, Err(Error::UnknownSubstance(id)) if id == "mystery-powder"));
    }

    #[test]
    fn test_lenient_policy_skips_unknown_active_substance() {
        let advisor = Advisor::with_policy(
            Arc::new(build_default_catalog()),
            UnknownSubstancePolicy::Lenient,
        );
        let now = Utc::now();
        let stack = vec![
            ActiveDose::new("mystery-powder", 10.0, now),
            ActiveDose::new("caffeine", 150.0, now),
        ];

        let conflicts = advisor.check_safety_at(&stack, "iron-bisglycinate", now).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].substance_a, "Caffeine");
    }

    #[test]
    fn test_longest_window_with_far_future_dose_saturates() {
        // Just under the largest window that fits in a Duration
        let advisor = advisor_for(vec![
            definition("a", "A", vec![("b", InteractionKind::Inhibit, 2.562e12)]),
            definition("b", "B", vec![]),
        ]);
        let now = Utc::now();
        let stack = vec![ActiveDose::new("a", 100.0, now + Duration::days(3650))];

        let conflicts = advisor.check_safety_at(&stack, "b", now).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].wait_time, Duration::MAX);
    }

    #[test]
    fn test_future_dose_counts_full_window() {
        let advisor = default_advisor();
        let now = Utc::now();
        let stack = vec![ActiveDose::new("caffeine", 150.0, now + Duration::hours(1))];

        let conflicts = advisor.check_safety_at(&stack, "iron-bisglycinate", now).unwrap();
        assert_eq!(conflicts[0].wait_time, Duration::hours(121));
    }
}
