//! Season plan service
//!
//! Owns the plan lifecycle (create, preview, read, delete) and routes every
//! tracking change through one read-modify-write loop. Each write is a
//! compare-and-swap on the plan version; on a lost race the latest document
//! is re-read and the same targeted change is applied again, so concurrent
//! edits to different stages, fertilizer entries or remarks never clobber
//! each other.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use shared::remarks::{self, NewRemark, RemarkUpdate};
use shared::{
    effective_anchor, refresh_status, summarize, validate_anchor_inputs,
    validate_cultivating_area, validate_image_filename, validate_non_negative, BaselineSchedule,
    ClimateZone, ExpectedHarvest, FertilizerImplementationUpdate, HarvestRecord, LccAdjustor,
    LccRecommendation, LccTable, LeafColorReading, PaddyVarietyRef, PlanError, PlanResult,
    PlanStatus, PlanSummary, PlantingMethod, ScheduleGenerator, ScheduleInputs, Season,
    SeasonPlan, StageImplementationUpdate,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{FarmRegistry, VarietyCatalog};
use crate::services::blob_store::{generate_filename, image_extension, BlobStore};
use crate::services::calendar::export_calendar;
use crate::services::plan_store::{PgPlanStore, PlanStore};
use crate::AppState;

/// Input for creating a season plan
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeasonPlanInput {
    pub farm_id: Uuid,
    pub variety_id: Uuid,
    pub season: Season,
    #[serde(default)]
    pub climate_zone: Option<ClimateZone>,
    #[serde(default)]
    pub irrigation_method: Option<String>,
    #[serde(default)]
    pub soil_condition: Option<String>,
    /// Acres; taken from the farm record when omitted
    #[serde(default)]
    pub cultivating_area: Option<Decimal>,
    pub cultivation_date: NaiveDate,
    #[serde(default)]
    pub planting_method: Option<PlantingMethod>,
    #[serde(default)]
    pub transplanting_date: Option<NaiveDate>,
    /// kg per acre, used for the expected harvest estimate
    #[serde(default)]
    pub expected_yield_per_acre: Option<Decimal>,
}

/// Input for previewing a schedule without storing anything
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewScheduleInput {
    pub cultivation_date: NaiveDate,
    #[serde(default)]
    pub planting_method: Option<PlantingMethod>,
    #[serde(default)]
    pub transplanting_date: Option<NaiveDate>,
    /// Either a duration or a catalog variety must be given
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub variety_id: Option<Uuid>,
    #[serde(default)]
    pub area: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePreview {
    pub anchor_date: NaiveDate,
    pub duration_days: u32,
    pub expected_harvest_date: NaiveDate,
    #[serde(flatten)]
    pub schedule: BaselineSchedule,
}

/// Response of a leaf color reading: the plan plus what was recommended
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LccReadingResult {
    pub recommendation: LccRecommendation,
    pub plan: SeasonPlan,
}

/// An uploaded remark image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One targeted change to a stored plan
#[derive(Debug, Clone)]
pub enum PlanMutation {
    UpdateFertilizer {
        index: usize,
        update: FertilizerImplementationUpdate,
    },
    DeleteFertilizer {
        index: usize,
    },
    UpdateStage {
        index: usize,
        update: StageImplementationUpdate,
    },
    RecordLccReading(LeafColorReading),
    RecordHarvest(HarvestRecord),
    AddRemark {
        id: Uuid,
        created_at: chrono::DateTime<Utc>,
        remark: NewRemark,
    },
    UpdateRemark {
        id: Uuid,
        update: RemarkUpdate,
    },
    DeleteRemark {
        id: Uuid,
    },
    AttachImage {
        remark_id: Uuid,
        filename: String,
    },
    RemoveImage {
        remark_id: Uuid,
        filename: String,
    },
    Cancel,
}

/// What a mutation produced besides the new plan
#[derive(Debug, Default)]
struct MutationEffects {
    /// Blobs no longer referenced by the plan
    released_images: Vec<String>,
    lcc: Option<LccRecommendation>,
}

impl PlanMutation {
    fn name(&self) -> &'static str {
        match self {
            PlanMutation::UpdateFertilizer { .. } => "update_fertilizer",
            PlanMutation::DeleteFertilizer { .. } => "delete_fertilizer",
            PlanMutation::UpdateStage { .. } => "update_stage",
            PlanMutation::RecordLccReading(_) => "record_lcc_reading",
            PlanMutation::RecordHarvest(_) => "record_harvest",
            PlanMutation::AddRemark { .. } => "add_remark",
            PlanMutation::UpdateRemark { .. } => "update_remark",
            PlanMutation::DeleteRemark { .. } => "delete_remark",
            PlanMutation::AttachImage { .. } => "attach_image",
            PlanMutation::RemoveImage { .. } => "remove_image",
            PlanMutation::Cancel => "cancel",
        }
    }

    /// How the fertilizer schedule length is allowed to change
    fn fertilizer_delta(&self) -> i64 {
        match self {
            PlanMutation::RecordLccReading(_) => 1,
            PlanMutation::DeleteFertilizer { .. } => -1,
            _ => 0,
        }
    }

    fn apply(&self, plan: &mut SeasonPlan, lcc_table: &LccTable) -> PlanResult<MutationEffects> {
        let mut effects = MutationEffects::default();
        match self {
            PlanMutation::UpdateFertilizer { index, update } => {
                shared::mark_fertilizer_applied(plan, *index, update)?;
            }
            PlanMutation::DeleteFertilizer { index } => {
                shared::delete_fertilizer_application(plan, *index)?;
            }
            PlanMutation::UpdateStage { index, update } => {
                shared::mark_stage_completed(plan, *index, update)?;
            }
            PlanMutation::RecordLccReading(reading) => {
                effects.lcc = Some(LccAdjustor::new(lcc_table).record_reading(plan, reading)?);
            }
            PlanMutation::RecordHarvest(record) => {
                shared::record_harvest(plan, record)?;
            }
            PlanMutation::AddRemark {
                id,
                created_at,
                remark,
            } => {
                remarks::add_remark(plan, *id, *created_at, remark)?;
            }
            PlanMutation::UpdateRemark { id, update } => {
                remarks::update_remark(plan, *id, update)?;
            }
            PlanMutation::DeleteRemark { id } => {
                let removed = remarks::delete_remark(plan, *id)?;
                effects.released_images = unreferenced(plan, removed.images);
            }
            PlanMutation::AttachImage {
                remark_id,
                filename,
            } => {
                remarks::attach_image(plan, *remark_id, filename)?;
            }
            PlanMutation::RemoveImage {
                remark_id,
                filename,
            } => {
                remarks::remove_image(plan, *remark_id, filename)?;
                effects.released_images = unreferenced(plan, vec![filename.clone()]);
            }
            PlanMutation::Cancel => shared::cancel_plan(plan),
        }
        Ok(effects)
    }
}

fn unreferenced(plan: &SeasonPlan, candidates: Vec<String>) -> Vec<String> {
    let still_used = plan.image_filenames();
    candidates
        .into_iter()
        .filter(|f| !still_used.contains(f))
        .collect()
}

/// Reject writes that would change the document shape beyond what the
/// operation itself does
fn check_integrity(before: &SeasonPlan, after: &SeasonPlan, mutation: &PlanMutation) -> AppResult<()> {
    if before.id != after.id || before.farm_id != after.farm_id {
        return Err(AppError::Integrity("Plan identity changed during an update".to_string()));
    }
    let expected = before.fertilizer_schedule.len() as i64 + mutation.fertilizer_delta();
    if after.fertilizer_schedule.len() as i64 != expected {
        return Err(AppError::Integrity(format!(
            "Fertilizer schedule length went from {} to {} during {}",
            before.fertilizer_schedule.len(),
            after.fertilizer_schedule.len(),
            mutation.name()
        )));
    }
    if mutation.fertilizer_delta() > 0
        && after.fertilizer_schedule[..before.fertilizer_schedule.len()]
            != before.fertilizer_schedule[..]
    {
        return Err(AppError::Integrity(
            "Existing fertilizer entries changed while appending".to_string(),
        ));
    }
    Ok(())
}

/// Season plan service
#[derive(Clone)]
pub struct SeasonPlanService {
    store: Arc<dyn PlanStore>,
    catalog: Arc<dyn VarietyCatalog>,
    farms: Arc<dyn FarmRegistry>,
    blobs: Arc<dyn BlobStore>,
    generator: ScheduleGenerator,
    lcc_table: Arc<LccTable>,
    max_write_retries: u32,
    max_image_bytes: usize,
    today: Option<NaiveDate>,
}

impl SeasonPlanService {
    /// Create a service backed by the application's database and clients
    pub fn new(state: &AppState) -> Self {
        Self::with_parts(
            Arc::new(PgPlanStore::new(state.db.clone())),
            state.catalog.clone(),
            state.farms.clone(),
            state.blobs.clone(),
            ScheduleGenerator::new(state.config.agronomy.fertilizer_rates()),
            state.lcc_table.clone(),
        )
        .with_limits(
            state.config.agronomy.max_write_retries,
            state.config.storage.max_image_bytes,
        )
    }

    pub fn with_parts(
        store: Arc<dyn PlanStore>,
        catalog: Arc<dyn VarietyCatalog>,
        farms: Arc<dyn FarmRegistry>,
        blobs: Arc<dyn BlobStore>,
        generator: ScheduleGenerator,
        lcc_table: Arc<LccTable>,
    ) -> Self {
        Self {
            store,
            catalog,
            farms,
            blobs,
            generator,
            lcc_table,
            max_write_retries: 5,
            max_image_bytes: 5 * 1024 * 1024,
            today: None,
        }
    }

    pub fn with_limits(mut self, max_write_retries: u32, max_image_bytes: usize) -> Self {
        self.max_write_retries = max_write_retries.max(1);
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Pin "today" instead of reading the clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Status re-derived for today and remarks in display order
    fn present(&self, mut plan: SeasonPlan) -> SeasonPlan {
        refresh_status(&mut plan, self.today());
        remarks::sort_for_display(&mut plan.daily_remarks);
        plan
    }

    async fn resolve_variety(&self, variety_id: Uuid) -> AppResult<PaddyVarietyRef> {
        self.catalog
            .get_variety(variety_id)
            .await?
            .map(PaddyVarietyRef::from)
            .ok_or_else(|| AppError::validation("varietyId", "Unknown paddy variety"))
    }

    async fn load(&self, plan_id: Uuid) -> AppResult<SeasonPlan> {
        self.store
            .load(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Season plan".to_string()))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a plan with its baseline schedule
    pub async fn create_plan(
        &self,
        input: CreateSeasonPlanInput,
        created_by: Option<Uuid>,
    ) -> AppResult<SeasonPlan> {
        validate_anchor_inputs(
            input.cultivation_date,
            input.planting_method,
            input.transplanting_date,
        )?;
        if let Some(per_acre) = input.expected_yield_per_acre {
            validate_non_negative(per_acre)
                .map_err(|m| AppError::validation("expectedYieldPerAcre", m))?;
        }

        let variety = self.resolve_variety(input.variety_id).await?;

        let mut climate_zone = input.climate_zone;
        let mut cultivating_area = input.cultivating_area;
        if climate_zone.is_none() || cultivating_area.is_none() {
            match self.farms.get_farm(input.farm_id).await {
                Ok(Some(farm)) => {
                    climate_zone = climate_zone.or_else(|| farm.climate_zone());
                    cultivating_area = cultivating_area.or(farm.cultivated_area);
                }
                Ok(None) => {
                    tracing::warn!(farm_id = %input.farm_id, "Farm not found in registry, nothing to pre-fill");
                }
                // Pre-filling is optional unless the area is missing
                Err(e) if cultivating_area.is_some() => {
                    tracing::warn!(farm_id = %input.farm_id, error = %e, "Farm registry unavailable, skipping pre-fill");
                }
                Err(e) => return Err(e),
            }
        }
        let cultivating_area = cultivating_area
            .ok_or_else(|| AppError::validation("cultivatingArea", "Cultivating area is required"))?;
        validate_cultivating_area(cultivating_area)
            .map_err(|m| AppError::validation("cultivatingArea", m))?;

        let anchor_date = effective_anchor(
            input.cultivation_date,
            input.planting_method,
            input.transplanting_date,
        );
        let schedule = self.generator.generate(&ScheduleInputs {
            anchor_date,
            duration_days: variety.duration_days,
            area: cultivating_area,
        })?;
        let harvest_date = expected_harvest_date(anchor_date, variety.duration_days)?;

        let now = Utc::now();
        let mut plan = SeasonPlan {
            id: Uuid::new_v4(),
            farm_id: input.farm_id,
            variety,
            season: input.season,
            climate_zone,
            irrigation_method: input.irrigation_method,
            soil_condition: input.soil_condition,
            cultivating_area,
            cultivation_date: input.cultivation_date,
            planting_method: input.planting_method,
            transplanting_date: input.transplanting_date,
            growing_stages: schedule.growing_stages,
            fertilizer_schedule: schedule.fertilizer_schedule,
            daily_remarks: Vec::new(),
            expected_harvest: Some(ExpectedHarvest {
                date: harvest_date,
                estimated_yield: input.expected_yield_per_acre.map(|per_acre| {
                    (per_acre * cultivating_area)
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                        .normalize()
                }),
            }),
            actual_harvest: None,
            status: PlanStatus::Planned,
            version: 0,
            created_by,
            created_at: now,
            updated_at: now,
        };
        refresh_status(&mut plan, self.today());

        self.store.insert(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            farm_id = %plan.farm_id,
            duration_days = plan.variety.duration_days,
            "Season plan created"
        );

        Ok(plan)
    }

    /// Generate a baseline schedule without storing it
    pub async fn preview(&self, input: PreviewScheduleInput) -> AppResult<SchedulePreview> {
        validate_anchor_inputs(
            input.cultivation_date,
            input.planting_method,
            input.transplanting_date,
        )?;
        let duration_days = match (input.duration_days, input.variety_id) {
            (Some(days), _) => days,
            (None, Some(variety_id)) => self.resolve_variety(variety_id).await?.duration_days,
            (None, None) => {
                return Err(AppError::validation(
                    "durationDays",
                    "Either durationDays or varietyId is required",
                ))
            }
        };

        let anchor_date = effective_anchor(
            input.cultivation_date,
            input.planting_method,
            input.transplanting_date,
        );
        let schedule = self.generator.generate(&ScheduleInputs {
            anchor_date,
            duration_days,
            area: input.area,
        })?;

        Ok(SchedulePreview {
            anchor_date,
            duration_days,
            expected_harvest_date: expected_harvest_date(anchor_date, duration_days)?,
            schedule,
        })
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<SeasonPlan> {
        let plan = self.load(plan_id).await?;
        Ok(self.present(plan))
    }

    pub async fn list_plans(&self, farm_id: Option<Uuid>) -> AppResult<Vec<SeasonPlan>> {
        let plans = self.store.list(farm_id).await?;
        Ok(plans.into_iter().map(|p| self.present(p)).collect())
    }

    /// Delete a plan and, best effort, the images of its remarks
    pub async fn delete_plan(&self, plan_id: Uuid) -> AppResult<()> {
        let plan = self.load(plan_id).await?;
        if !self.store.delete(plan_id).await? {
            return Err(AppError::NotFound("Season plan".to_string()));
        }
        tracing::info!(plan_id = %plan_id, "Season plan deleted");
        self.release_images(plan_id, plan.image_filenames()).await;
        Ok(())
    }

    pub async fn summary(&self, plan_id: Uuid) -> AppResult<PlanSummary> {
        let plan = self.load(plan_id).await?;
        Ok(summarize(&plan, self.today()))
    }

    pub async fn calendar_csv(&self, plan_id: Uuid) -> AppResult<String> {
        let plan = self.load(plan_id).await?;
        export_calendar(&plan)
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    pub async fn update_fertilizer(
        &self,
        plan_id: Uuid,
        index: usize,
        update: FertilizerImplementationUpdate,
    ) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::UpdateFertilizer { index, update }).await
    }

    pub async fn delete_fertilizer(&self, plan_id: Uuid, index: usize) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::DeleteFertilizer { index }).await
    }

    pub async fn update_stage(
        &self,
        plan_id: Uuid,
        index: usize,
        update: StageImplementationUpdate,
    ) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::UpdateStage { index, update }).await
    }

    pub async fn record_lcc_reading(
        &self,
        plan_id: Uuid,
        reading: LeafColorReading,
    ) -> AppResult<LccReadingResult> {
        let (plan, effects) = self
            .mutate(plan_id, &PlanMutation::RecordLccReading(reading))
            .await?;
        let recommendation = effects
            .lcc
            .ok_or_else(|| AppError::Internal("LCC reading produced no recommendation".to_string()))?;
        Ok(LccReadingResult {
            recommendation,
            plan: self.present(plan),
        })
    }

    pub async fn record_harvest(&self, plan_id: Uuid, record: HarvestRecord) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::RecordHarvest(record)).await
    }

    pub async fn cancel_plan(&self, plan_id: Uuid) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::Cancel).await
    }

    // ========================================================================
    // Daily remarks
    // ========================================================================

    pub async fn add_remark(&self, plan_id: Uuid, remark: NewRemark) -> AppResult<SeasonPlan> {
        let mutation = PlanMutation::AddRemark {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            remark,
        };
        self.apply(plan_id, mutation).await
    }

    pub async fn update_remark(
        &self,
        plan_id: Uuid,
        remark_id: Uuid,
        update: RemarkUpdate,
    ) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::UpdateRemark { id: remark_id, update })
            .await
    }

    pub async fn delete_remark(&self, plan_id: Uuid, remark_id: Uuid) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::DeleteRemark { id: remark_id })
            .await
    }

    /// Store an image and attach it to a remark.
    ///
    /// The blob is written first; the remark only gains the reference once
    /// the upload succeeded, so a failed upload leaves the remark as it was.
    pub async fn upload_remark_image(
        &self,
        plan_id: Uuid,
        remark_id: Uuid,
        upload: ImageUpload,
    ) -> AppResult<SeasonPlan> {
        if upload.bytes.is_empty() {
            return Err(AppError::validation("image", "Image file is empty"));
        }
        if upload.bytes.len() > self.max_image_bytes {
            return Err(AppError::validation(
                "image",
                format!("Image exceeds the maximum size of {} bytes", self.max_image_bytes),
            ));
        }
        let extension = image_extension(upload.original_name.as_deref(), upload.content_type.as_deref())
            .ok_or_else(|| AppError::validation("image", "Only JPEG, PNG and WebP images are accepted"))?;

        // Fail fast before storing anything
        let plan = self.load(plan_id).await?;
        plan.ensure_mutable()?;
        plan.remark(remark_id)?;

        let filename = generate_filename(extension);
        self.blobs.save(&filename, &upload.bytes).await?;

        let attached = self
            .apply(
                plan_id,
                PlanMutation::AttachImage {
                    remark_id,
                    filename: filename.clone(),
                },
            )
            .await;
        if attached.is_err() {
            self.release_images(plan_id, vec![filename]).await;
        }
        attached
    }

    pub async fn remove_remark_image(
        &self,
        plan_id: Uuid,
        remark_id: Uuid,
        filename: String,
    ) -> AppResult<SeasonPlan> {
        self.apply(plan_id, PlanMutation::RemoveImage { remark_id, filename })
            .await
    }

    /// Image bytes and content type for a stored remark image
    pub async fn fetch_image(&self, filename: &str) -> AppResult<(Vec<u8>, &'static str)> {
        validate_image_filename(filename).map_err(|m| AppError::validation("filename", m))?;
        let bytes = self.blobs.fetch(filename).await?;
        Ok((bytes, crate::services::blob_store::content_type_for(filename)))
    }

    // ========================================================================
    // Write path
    // ========================================================================

    async fn apply(&self, plan_id: Uuid, mutation: PlanMutation) -> AppResult<SeasonPlan> {
        let (plan, _) = self.mutate(plan_id, &mutation).await?;
        Ok(self.present(plan))
    }

    /// Read, apply, compare-and-swap; repeat on a lost race
    async fn mutate(
        &self,
        plan_id: Uuid,
        mutation: &PlanMutation,
    ) -> AppResult<(SeasonPlan, MutationEffects)> {
        for attempt in 1..=self.max_write_retries {
            let current = self.load(plan_id).await?;
            let mut next = current.clone();
            let effects = mutation.apply(&mut next, &self.lcc_table)?;
            refresh_status(&mut next, self.today());
            check_integrity(&current, &next, mutation)?;

            if next == current {
                tracing::debug!(plan_id = %plan_id, operation = mutation.name(), "No change, skipping write");
                return Ok((current, effects));
            }

            next.version = current.version + 1;
            next.updated_at = Utc::now();
            if self.store.update(&next, current.version).await? {
                tracing::info!(
                    plan_id = %plan_id,
                    operation = mutation.name(),
                    version = next.version,
                    "Season plan updated"
                );
                self.release_images(plan_id, effects.released_images.clone()).await;
                return Ok((next, effects));
            }

            tracing::warn!(
                plan_id = %plan_id,
                operation = mutation.name(),
                attempt,
                "Concurrent update detected, retrying"
            );
        }

        Err(AppError::Conflict(
            "Season plan is being modified concurrently, please retry".to_string(),
        ))
    }

    /// Best-effort blob cleanup; failures are logged, never returned
    async fn release_images(&self, plan_id: Uuid, filenames: Vec<String>) {
        for filename in filenames {
            if let Err(e) = self.blobs.delete(&filename).await {
                tracing::warn!(plan_id = %plan_id, filename = %filename, error = %e, "Failed to delete remark image");
            }
        }
    }
}

fn expected_harvest_date(anchor: NaiveDate, duration_days: u32) -> PlanResult<NaiveDate> {
    anchor
        .checked_add_signed(Duration::days(i64::from(duration_days)))
        .ok_or_else(|| PlanError::validation("cultivationDate", "Harvest date is out of range"))
}
