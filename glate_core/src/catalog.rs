//! Substance catalog: the definition lookup used by the advisor and monitor.
//!
//! The catalog is built once (compiled-in defaults or a JSON file), validated,
//! and never mutated afterwards, so concurrent readers need no locking.

use crate::decay::try_from_hours;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Read access to substance science data
pub trait DefinitionLookup: Send + Sync {
    /// Fetch one definition, failing with [`Error::NotFound`] if absent
    fn get(&self, id: &str) -> Result<SubstanceDefinition>;

    /// Copy of every definition keyed by id
    fn get_all(&self) -> HashMap<String, SubstanceDefinition>;
}

/// In-memory substance table
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub substances: HashMap<String, SubstanceDefinition>,
}

/// Cached default catalog - built once and shared across all operations
static DEFAULT_CATALOG: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(build_default_catalog()));

/// Shared handle to the cached default catalog
pub fn get_default_catalog() -> Arc<Catalog> {
    Arc::clone(&DEFAULT_CATALOG)
}

impl DefinitionLookup for Catalog {
    fn get(&self, id: &str) -> Result<SubstanceDefinition> {
        self.substances
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn get_all(&self) -> HashMap<String, SubstanceDefinition> {
        self.substances.clone()
    }
}

impl Catalog {
    /// Build a catalog from a list of definitions, rejecting invalid data
    pub fn from_definitions(definitions: Vec<SubstanceDefinition>) -> Result<Self> {
        let mut substances = HashMap::with_capacity(definitions.len());
        for def in definitions {
            if substances.contains_key(&def.id) {
                return Err(Error::CatalogValidation(format!(
                    "Duplicate substance id '{}'",
                    def.id
                )));
            }
            substances.insert(def.id.clone(), def);
        }

        let catalog = Catalog { substances };
        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }

        Ok(catalog)
    }

    /// Load definitions from a JSON array file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let definitions: Vec<SubstanceDefinition> = serde_json::from_str(&contents)?;
        let catalog = Self::from_definitions(definitions)?;
        tracing::info!(
            "Loaded {} substances from {:?}",
            catalog.substances.len(),
            path
        );
        Ok(catalog)
    }

    /// Definitions sorted by id, for stable listings
    pub fn sorted(&self) -> Vec<&SubstanceDefinition> {
        let mut defs: Vec<_> = self.substances.values().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, def) in &self.substances {
            if id.is_empty() || def.id.is_empty() {
                errors.push("Substance has empty ID".to_string());
            }
            if id != &def.id {
                errors.push(format!(
                    "Substance key '{}' doesn't match definition.id '{}'",
                    id, def.id
                ));
            }
            if def.name.is_empty() {
                errors.push(format!("Substance '{}' has empty name", id));
            }
            if def.half_life_hours <= 0.0 || try_from_hours(def.half_life_hours).is_none() {
                errors.push(format!(
                    "Substance '{}': half-life {} must be positive and in range",
                    id, def.half_life_hours
                ));
            }
            if !(0.0..=1.0).contains(&def.bioavailability) {
                errors.push(format!(
                    "Substance '{}': bioavailability {} outside [0, 1]",
                    id, def.bioavailability
                ));
            }

            let mut targets = HashSet::new();
            for rule in &def.interactions {
                if !targets.insert(rule.target_id.as_str()) {
                    errors.push(format!(
                        "Substance '{}' has more than one rule targeting '{}'",
                        id, rule.target_id
                    ));
                }
                if !self.substances.contains_key(&rule.target_id) {
                    tracing::warn!(
                        "Substance '{}' has a rule for '{}', which is not in the catalog",
                        id,
                        rule.target_id
                    );
                }
                if rule.window_hours < 0.0 || try_from_hours(rule.window_hours).is_none() {
                    errors.push(format!(
                        "Substance '{}': window {} for '{}' must be non-negative and in range",
                        id, rule.window_hours, rule.target_id
                    ));
                }
            }
        }

        errors
    }
}

fn rule(target_id: &str, kind: InteractionKind, window_hours: f64, note: &str) -> InteractionRule {
    InteractionRule {
        target_id: target_id.into(),
        kind,
        window_hours,
        note: note.into(),
    }
}

/// Builds the default catalog of common supplements
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// shared handle to a cached copy.
pub fn build_default_catalog() -> Catalog {
    use InteractionKind::*;
    use SubstanceCategory::*;

    let definitions = vec![
        SubstanceDefinition {
            id: "caffeine".into(),
            name: "Caffeine".into(),
            category: Stimulant,
            half_life_hours: 5.0,
            bioavailability: 0.99,
            interactions: vec![
                rule(
                    "iron-bisglycinate",
                    Inhibit,
                    120.0,
                    "Polyphenols and caffeine bind non-heme iron and reduce uptake",
                ),
                rule(
                    "synephrine",
                    Dangerous,
                    6.0,
                    "Stacked sympathomimetics raise heart rate and blood pressure",
                ),
            ],
        },
        SubstanceDefinition {
            id: "synephrine".into(),
            name: "Synephrine".into(),
            category: Stimulant,
            half_life_hours: 2.5,
            bioavailability: 0.22,
            interactions: vec![rule(
                "caffeine",
                Dangerous,
                6.0,
                "Stacked sympathomimetics raise heart rate and blood pressure",
            )],
        },
        SubstanceDefinition {
            id: "iron-bisglycinate".into(),
            name: "Iron (Bisglycinate)".into(),
            category: Mineral,
            half_life_hours: 6.0,
            bioavailability: 0.9,
            interactions: vec![rule(
                "zinc-picolinate",
                Inhibit,
                2.0,
                "Competes for DMT1 transporter",
            )],
        },
        SubstanceDefinition {
            id: "zinc-picolinate".into(),
            name: "Zinc (Picolinate)".into(),
            category: Mineral,
            half_life_hours: 3.0,
            bioavailability: 0.6,
            interactions: vec![rule(
                "iron-bisglycinate",
                Inhibit,
                2.0,
                "Competes for DMT1 transporter",
            )],
        },
        SubstanceDefinition {
            id: "calcium-carbonate".into(),
            name: "Calcium (Carbonate)".into(),
            category: Mineral,
            half_life_hours: 4.0,
            bioavailability: 0.3,
            interactions: vec![
                rule(
                    "iron-bisglycinate",
                    Inhibit,
                    2.0,
                    "Calcium blocks iron absorption in the gut",
                ),
                rule(
                    "zinc-picolinate",
                    Inhibit,
                    2.0,
                    "High calcium intake reduces zinc absorption",
                ),
            ],
        },
        SubstanceDefinition {
            id: "magnesium-glycinate".into(),
            name: "Magnesium (Glycinate)".into(),
            category: Mineral,
            half_life_hours: 12.0,
            bioavailability: 0.8,
            interactions: vec![],
        },
        SubstanceDefinition {
            id: "vitamin-c".into(),
            name: "Vitamin C".into(),
            category: Vitamin,
            half_life_hours: 2.0,
            bioavailability: 0.8,
            interactions: vec![rule(
                "iron-bisglycinate",
                Potentiate,
                1.0,
                "Ascorbic acid keeps iron in the absorbable ferrous state",
            )],
        },
        SubstanceDefinition {
            id: "vitamin-d3".into(),
            name: "Vitamin D3".into(),
            category: Vitamin,
            half_life_hours: 360.0,
            bioavailability: 0.7,
            interactions: vec![rule(
                "calcium-carbonate",
                Potentiate,
                24.0,
                "Vitamin D upregulates intestinal calcium absorption",
            )],
        },
        SubstanceDefinition {
            id: "l-theanine".into(),
            name: "L-Theanine".into(),
            category: AminoAcid,
            half_life_hours: 1.2,
            bioavailability: 0.9,
            interactions: vec![rule(
                "caffeine",
                Potentiate,
                4.0,
                "Smooths the stimulant response and reduces jitter",
            )],
        },
        SubstanceDefinition {
            id: "l-tyrosine".into(),
            name: "L-Tyrosine".into(),
            category: AminoAcid,
            half_life_hours: 2.0,
            bioavailability: 0.75,
            interactions: vec![],
        },
        SubstanceDefinition {
            id: "alpha-gpc".into(),
            name: "Alpha-GPC".into(),
            category: Nootropic,
            half_life_hours: 4.0,
            bioavailability: 0.88,
            interactions: vec![rule(
                "caffeine",
                Potentiate,
                3.0,
                "Choline support pairs with stimulant focus",
            )],
        },
    ];

    Catalog {
        substances: definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect(),
    }
}
