//! Implementation tracking for season plans
//!
//! Applies "this actually happened" facts to a plan: fertilizer applied,
//! stage completed, harvest recorded. Each operation validates its whole
//! payload before mutating, so a rejected call never leaves a partial change.
//! Status and progress are derived from the plan by pure functions and are
//! recomputed by the caller after every mutation.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlanError, PlanResult};
use crate::models::{ActualHarvest, FertilizerApplication, PlanStatus, SeasonPlan, STAGE_COUNT};
use crate::validation::{normalize_notes, validate_date_order, validate_non_negative, validate_text_length};

/// Payload of `markFertilizerApplied`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerImplementationUpdate {
    pub applied: bool,
    #[serde(default)]
    pub implemented_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload of `markStageCompleted`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageImplementationUpdate {
    pub completed: bool,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_end: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload of `recordHarvest`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub actual_yield: Option<Decimal>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Mark a fertilizer application as applied or not applied.
///
/// Applying requires the implementation date; un-applying clears it.
/// Re-sending the same payload leaves the plan unchanged.
pub fn mark_fertilizer_applied(
    plan: &mut SeasonPlan,
    index: usize,
    update: &FertilizerImplementationUpdate,
) -> PlanResult<()> {
    plan.ensure_mutable()?;
    plan.fertilizer(index)?;

    let implemented_date = if update.applied {
        Some(update.implemented_date.ok_or_else(|| {
            PlanError::validation(
                "implementedDate",
                "Implementation date is required when marking a fertilizer application as applied",
            )
        })?)
    } else {
        None
    };
    let notes = update.notes.as_deref().map(|n| normalize_notes(Some(n))).transpose()?;

    let entry = &mut plan.fertilizer_schedule[index];
    entry.applied = update.applied;
    entry.implemented_date = implemented_date;
    if let Some(notes) = notes {
        entry.notes = notes;
    }
    Ok(())
}

/// Mark a growing stage as completed or reopen it.
///
/// Completing requires `actualEnd`. Reopening clears `actualEnd` but keeps
/// the start, since a stage can be under way without being finished.
pub fn mark_stage_completed(
    plan: &mut SeasonPlan,
    index: usize,
    update: &StageImplementationUpdate,
) -> PlanResult<()> {
    plan.ensure_mutable()?;
    let current = plan.stage(index)?;

    let actual_start = update.actual_start.or(current.actual_start);
    let actual_end = if update.completed {
        Some(update.actual_end.ok_or_else(|| {
            PlanError::validation(
                "actualEnd",
                "Actual end date is required when marking a stage as completed",
            )
        })?)
    } else {
        None
    };
    validate_date_order(actual_start, actual_end)
        .map_err(|m| PlanError::validation("actualStart", m))?;
    let notes = update.notes.as_deref().map(|n| normalize_notes(Some(n))).transpose()?;

    let stage = &mut plan.growing_stages[index];
    stage.completed = update.completed;
    stage.actual_start = actual_start;
    stage.actual_end = actual_end;
    if let Some(notes) = notes {
        stage.notes = notes;
    }
    Ok(())
}

/// Remove a fertilizer application that has not been carried out yet.
///
/// Applied entries are historical facts and are rejected with a conflict.
pub fn delete_fertilizer_application(
    plan: &mut SeasonPlan,
    index: usize,
) -> PlanResult<FertilizerApplication> {
    plan.ensure_mutable()?;
    if plan.fertilizer(index)?.applied {
        return Err(PlanError::Conflict(
            "An applied fertilizer application cannot be deleted".to_string(),
        ));
    }
    Ok(plan.fertilizer_schedule.remove(index))
}

/// Record the actual harvest. An expected harvest is not required.
pub fn record_harvest(plan: &mut SeasonPlan, record: &HarvestRecord) -> PlanResult<()> {
    plan.ensure_mutable()?;
    if let Some(actual_yield) = record.actual_yield {
        validate_non_negative(actual_yield).map_err(|m| PlanError::validation("actualYield", m))?;
    }
    let quality = match record.quality.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(q) => {
            validate_text_length(q).map_err(|m| PlanError::validation("quality", m))?;
            Some(q.to_string())
        }
    };
    let notes = normalize_notes(record.notes.as_deref())?;

    plan.actual_harvest = Some(ActualHarvest {
        date: Some(record.date),
        actual_yield: record.actual_yield,
        quality,
        notes,
    });
    Ok(())
}

/// Explicitly cancel the plan. Cancelling twice is a no-op.
pub fn cancel_plan(plan: &mut SeasonPlan) {
    plan.status = PlanStatus::Cancelled;
}

// ============================================================================
// Derived State
// ============================================================================

/// Derive the plan status from its content.
///
/// `cancelled` is sticky and never produced here. A plan is completed once
/// a harvest date is recorded or every stage is done, active once the anchor
/// date has arrived or any work has been reported, and planned otherwise.
pub fn derive_status(plan: &SeasonPlan, today: NaiveDate) -> PlanStatus {
    if plan.is_cancelled() {
        return PlanStatus::Cancelled;
    }

    let harvested = plan
        .actual_harvest
        .as_ref()
        .and_then(|h| h.date)
        .is_some();
    if harvested || plan.growing_stages.iter().all(|s| s.completed) {
        return PlanStatus::Completed;
    }

    let work_reported = plan.growing_stages.iter().any(|s| s.is_started())
        || plan.fertilizer_schedule.iter().any(|f| f.applied);
    if today >= plan.anchor_date() || work_reported {
        return PlanStatus::Active;
    }

    PlanStatus::Planned
}

/// Recompute and store the derived status
pub fn refresh_status(plan: &mut SeasonPlan, today: NaiveDate) {
    plan.status = derive_status(plan, today);
}

pub fn completed_stage_count(plan: &SeasonPlan) -> usize {
    plan.growing_stages.iter().filter(|s| s.completed).count()
}

/// Completed stages over the fixed stage count, as a percentage with two
/// decimals
pub fn progress_percent(plan: &SeasonPlan) -> Decimal {
    let completed = Decimal::from(completed_stage_count(plan) as u64);
    (completed * Decimal::ONE_HUNDRED / Decimal::from(STAGE_COUNT as u64))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// A pending calendar item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingEvent {
    pub index: usize,
    pub label: String,
    pub date: NaiveDate,
}

/// Dashboard view of a plan's progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub plan_id: Uuid,
    pub status: PlanStatus,
    pub progress_percent: Decimal,
    pub completed_stages: usize,
    pub total_stages: usize,
    pub applied_fertilizer: usize,
    pub total_fertilizer: usize,
    /// Unapplied entries whose planned date has passed
    pub overdue_fertilizer: usize,
    pub days_since_anchor: i64,
    pub current_stage: Option<UpcomingEvent>,
    pub next_stage: Option<UpcomingEvent>,
    pub next_fertilizer: Option<UpcomingEvent>,
}

/// Summarize progress and the next pending events relative to `today`
pub fn summarize(plan: &SeasonPlan, today: NaiveDate) -> PlanSummary {
    let current_stage = plan
        .growing_stages
        .iter()
        .enumerate()
        .find(|(_, s)| s.covers(today))
        .map(|(index, s)| UpcomingEvent {
            index,
            label: s.stage.to_string(),
            date: s.planned_start,
        });

    let next_stage = plan
        .growing_stages
        .iter()
        .enumerate()
        .find(|(_, s)| !s.completed && s.planned_end >= today)
        .map(|(index, s)| UpcomingEvent {
            index,
            label: s.stage.to_string(),
            date: s.planned_start,
        });

    let next_fertilizer = plan
        .fertilizer_schedule
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.applied && f.planned_date >= today)
        .min_by_key(|(index, f)| (f.planned_date, *index))
        .map(|(index, f)| UpcomingEvent {
            index,
            label: f.stage.to_string(),
            date: f.planned_date,
        });

    PlanSummary {
        plan_id: plan.id,
        status: derive_status(plan, today),
        progress_percent: progress_percent(plan),
        completed_stages: completed_stage_count(plan),
        total_stages: STAGE_COUNT,
        applied_fertilizer: plan.fertilizer_schedule.iter().filter(|f| f.applied).count(),
        total_fertilizer: plan.fertilizer_schedule.len(),
        overdue_fertilizer: plan
            .fertilizer_schedule
            .iter()
            .filter(|f| !f.applied && f.planned_date < today)
            .count(),
        days_since_anchor: plan.days_since_anchor(today),
        current_stage,
        next_stage,
        next_fertilizer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{date, sample_plan};

    fn applied(on: NaiveDate) -> FertilizerImplementationUpdate {
        FertilizerImplementationUpdate {
            applied: true,
            implemented_date: Some(on),
            notes: Some("Applied after rain".to_string()),
        }
    }

    #[test]
    fn test_mark_fertilizer_applied_requires_date() {
        let mut plan = sample_plan();
        let before = plan.clone();
        let result = mark_fertilizer_applied(
            &mut plan,
            0,
            &FertilizerImplementationUpdate {
                applied: true,
                implemented_date: None,
                notes: None,
            },
        );
        assert!(matches!(result, Err(PlanError::Validation { ref field, .. }) if field == "implementedDate"));
        assert_eq!(plan, before);
    }

    #[test]
    fn test_mark_fertilizer_applied_is_idempotent() {
        let mut once = sample_plan();
        mark_fertilizer_applied(&mut once, 1, &applied(date(2025, 1, 16))).unwrap();

        let mut twice = once.clone();
        mark_fertilizer_applied(&mut twice, 1, &applied(date(2025, 1, 16))).unwrap();

        assert_eq!(once, twice);
        assert!(once.fertilizer_schedule[1].applied);
        assert_eq!(once.fertilizer_schedule[1].implemented_date, Some(date(2025, 1, 16)));
        assert_eq!(once.fertilizer_schedule[1].notes.as_deref(), Some("Applied after rain"));
    }

    #[test]
    fn test_unapply_clears_implemented_date() {
        let mut plan = sample_plan();
        mark_fertilizer_applied(&mut plan, 0, &applied(date(2025, 1, 2))).unwrap();
        mark_fertilizer_applied(
            &mut plan,
            0,
            &FertilizerImplementationUpdate {
                applied: false,
                implemented_date: Some(date(2025, 1, 2)),
                notes: None,
            },
        )
        .unwrap();

        let entry = &plan.fertilizer_schedule[0];
        assert!(!entry.applied);
        assert_eq!(entry.implemented_date, None);
        // Omitted notes keep the stored value
        assert_eq!(entry.notes.as_deref(), Some("Applied after rain"));
    }

    #[test]
    fn test_out_of_range_index_is_not_found() {
        let mut plan = sample_plan();
        let result = mark_fertilizer_applied(&mut plan, 3, &applied(date(2025, 1, 2)));
        assert!(matches!(result, Err(PlanError::NotFound(_))));

        let stage = mark_stage_completed(
            &mut plan,
            STAGE_COUNT,
            &StageImplementationUpdate {
                completed: true,
                actual_start: None,
                actual_end: Some(date(2025, 1, 2)),
                notes: None,
            },
        );
        assert!(matches!(stage, Err(PlanError::NotFound(_))));
    }

    #[test]
    fn test_mark_stage_completed() {
        let mut plan = sample_plan();
        mark_stage_completed(
            &mut plan,
            0,
            &StageImplementationUpdate {
                completed: true,
                actual_start: Some(date(2024, 12, 16)),
                actual_end: Some(date(2024, 12, 30)),
                notes: Some("Tractor hired".to_string()),
            },
        )
        .unwrap();

        let stage = &plan.growing_stages[0];
        assert!(stage.completed);
        assert_eq!(stage.actual_start, Some(date(2024, 12, 16)));
        assert_eq!(stage.actual_end, Some(date(2024, 12, 30)));
    }

    #[test]
    fn test_mark_stage_completed_validation() {
        let mut plan = sample_plan();
        let before = plan.clone();

        let missing_end = mark_stage_completed(
            &mut plan,
            1,
            &StageImplementationUpdate {
                completed: true,
                actual_start: Some(date(2025, 1, 1)),
                actual_end: None,
                notes: None,
            },
        );
        assert!(matches!(missing_end, Err(PlanError::Validation { ref field, .. }) if field == "actualEnd"));

        let reversed = mark_stage_completed(
            &mut plan,
            1,
            &StageImplementationUpdate {
                completed: true,
                actual_start: Some(date(2025, 1, 10)),
                actual_end: Some(date(2025, 1, 5)),
                notes: None,
            },
        );
        assert!(matches!(reversed, Err(PlanError::Validation { .. })));
        assert_eq!(plan, before);
    }

    #[test]
    fn test_reopen_stage_keeps_start() {
        let mut plan = sample_plan();
        mark_stage_completed(
            &mut plan,
            2,
            &StageImplementationUpdate {
                completed: true,
                actual_start: Some(date(2025, 1, 12)),
                actual_end: Some(date(2025, 1, 30)),
                notes: None,
            },
        )
        .unwrap();
        mark_stage_completed(
            &mut plan,
            2,
            &StageImplementationUpdate {
                completed: false,
                actual_start: None,
                actual_end: None,
                notes: None,
            },
        )
        .unwrap();

        let stage = &plan.growing_stages[2];
        assert!(!stage.completed);
        assert_eq!(stage.actual_start, Some(date(2025, 1, 12)));
        assert_eq!(stage.actual_end, None);
        assert!(stage.is_started());
    }

    #[test]
    fn test_delete_unapplied_fertilizer() {
        let mut plan = sample_plan();
        let removed = delete_fertilizer_application(&mut plan, 2).unwrap();
        assert_eq!(removed.stage, crate::FertilizerStage::SecondTopDressing);
        assert_eq!(plan.fertilizer_schedule.len(), 2);
    }

    #[test]
    fn test_delete_applied_fertilizer_conflicts() {
        let mut plan = sample_plan();
        mark_fertilizer_applied(&mut plan, 0, &applied(date(2025, 1, 1))).unwrap();
        let before = serde_json::to_vec(&plan).unwrap();

        let result = delete_fertilizer_application(&mut plan, 0);
        assert!(matches!(result, Err(PlanError::Conflict(_))));
        assert_eq!(serde_json::to_vec(&plan).unwrap(), before);
    }

    #[test]
    fn test_record_harvest_without_expectation() {
        let mut plan = sample_plan();
        plan.expected_harvest = None;
        record_harvest(
            &mut plan,
            &HarvestRecord {
                date: date(2025, 4, 18),
                actual_yield: Some(Decimal::from(3200)),
                quality: Some("Good".to_string()),
                notes: None,
            },
        )
        .unwrap();

        let harvest = plan.actual_harvest.as_ref().unwrap();
        assert_eq!(harvest.date, Some(date(2025, 4, 18)));
        assert_eq!(harvest.actual_yield, Some(Decimal::from(3200)));
        assert_eq!(derive_status(&plan, date(2025, 4, 18)), PlanStatus::Completed);
    }

    #[test]
    fn test_negative_yield_rejected() {
        let mut plan = sample_plan();
        let result = record_harvest(
            &mut plan,
            &HarvestRecord {
                date: date(2025, 4, 18),
                actual_yield: Some(Decimal::from(-1)),
                quality: None,
                notes: None,
            },
        );
        assert!(result.is_err());
        assert!(plan.actual_harvest.is_none());
    }

    #[test]
    fn test_status_derivation() {
        let mut plan = sample_plan();
        // Anchor is 2025-01-01
        assert_eq!(derive_status(&plan, date(2024, 12, 20)), PlanStatus::Planned);
        assert_eq!(derive_status(&plan, date(2025, 1, 1)), PlanStatus::Active);

        // Early work activates the plan before the anchor date
        mark_stage_completed(
            &mut plan,
            0,
            &StageImplementationUpdate {
                completed: false,
                actual_start: Some(date(2024, 12, 18)),
                actual_end: None,
                notes: None,
            },
        )
        .unwrap();
        assert_eq!(derive_status(&plan, date(2024, 12, 20)), PlanStatus::Active);

        for stage in plan.growing_stages.iter_mut() {
            stage.completed = true;
        }
        assert_eq!(derive_status(&plan, date(2025, 5, 1)), PlanStatus::Completed);
    }

    #[test]
    fn test_applied_fertilizer_activates_plan() {
        let mut plan = sample_plan();
        mark_fertilizer_applied(&mut plan, 0, &applied(date(2024, 12, 30))).unwrap();
        assert_eq!(derive_status(&plan, date(2024, 12, 30)), PlanStatus::Active);
    }

    #[test]
    fn test_cancelled_is_sticky_and_blocks_mutation() {
        let mut plan = sample_plan();
        cancel_plan(&mut plan);
        refresh_status(&mut plan, date(2025, 2, 1));
        assert_eq!(plan.status, PlanStatus::Cancelled);

        let result = mark_fertilizer_applied(&mut plan, 0, &applied(date(2025, 1, 1)));
        assert!(matches!(result, Err(PlanError::Conflict(_))));
        assert!(!plan.fertilizer_schedule[0].applied);
    }

    #[test]
    fn test_progress_percent() {
        let mut plan = sample_plan();
        assert_eq!(progress_percent(&plan), Decimal::ZERO);

        for stage in plan.growing_stages.iter_mut().take(3) {
            stage.completed = true;
        }
        assert_eq!(progress_percent(&plan), Decimal::new(3333, 2));

        for stage in plan.growing_stages.iter_mut() {
            stage.completed = true;
        }
        assert_eq!(progress_percent(&plan), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_summarize() {
        let mut plan = sample_plan();
        mark_fertilizer_applied(&mut plan, 0, &applied(date(2025, 1, 1))).unwrap();

        let summary = summarize(&plan, date(2025, 1, 20));
        assert_eq!(summary.status, PlanStatus::Active);
        assert_eq!(summary.applied_fertilizer, 1);
        assert_eq!(summary.total_fertilizer, 3);
        // First top dressing (2025-01-15) was missed
        assert_eq!(summary.overdue_fertilizer, 1);
        assert_eq!(summary.days_since_anchor, 19);
        assert_eq!(summary.current_stage.as_ref().map(|e| e.index), Some(2));
        // Land preparation is still open but its window has closed
        assert_eq!(summary.next_stage.as_ref().map(|e| e.index), Some(2));
        let next = summary.next_fertilizer.unwrap();
        assert_eq!(next.index, 2);
        assert_eq!(next.date, date(2025, 2, 5));
    }
}
