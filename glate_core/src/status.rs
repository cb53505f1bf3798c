//! Status projection: what is left of each dose in a user's stack.

use crate::catalog::DefinitionLookup;
use crate::decay::remaining_amount;
use crate::ledger::DoseLedger;
use crate::DoseStatus;
use chrono::{DateTime, Duration, Utc};

/// Project the user's stack at `now`
///
/// Doses whose substance is unknown are skipped.
pub fn project(
    ledger: &dyn DoseLedger,
    lookup: &dyn DefinitionLookup,
    user_id: &str,
    now: DateTime<Utc>,
) -> Vec<DoseStatus> {
    ledger
        .get(user_id)
        .into_iter()
        .filter_map(|dose| {
            let def = match lookup.get(&dose.substance_id) {
                Ok(def) => def,
                Err(e) => {
                    tracing::debug!("Status skipping dose {}: {}", dose.id, e);
                    return None;
                }
            };

            let elapsed = now - dose.ingested_at;
            Some(DoseStatus {
                substance: def.name,
                original_mg: dose.amount_mg,
                current_mg: remaining_amount(dose.amount_mg, def.half_life_hours, elapsed),
                time_elapsed: format_elapsed(elapsed),
            })
        })
        .collect()
}

/// Format a duration rounded to the nearest minute, e.g. `1h30m0s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.num_milliseconds();
    let sign = if millis < 0 { "-" } else { "" };
    // Round half away from zero
    let minutes = millis.unsigned_abs().saturating_add(30_000) / 60_000;

    match (minutes / 60, minutes % 60) {
        (0, 0) => "0s".to_string(),
        (0, m) => format!("{}{}m0s", sign, m),
        (h, m) => format!("{}{}h{}m0s", sign, h, m),
    }
}
