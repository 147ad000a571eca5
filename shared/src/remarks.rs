//! Daily remark log
//!
//! Remarks are free-form dated observations kept next to the schedules but
//! never affecting them. They are addressed by id and, unlike applied
//! fertilizer, may be edited or deleted at any time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlanError, PlanResult};
use crate::models::{DailyRemark, RemarkCategory, SeasonPlan};
use crate::validation::{validate_image_filename, validate_remark_description};

/// Payload of `addDailyRemark`.
///
/// A new remark never carries image references. Images only enter a remark
/// through an upload, which stores the blob under a freshly generated name,
/// so no remark can point at a blob another plan owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRemark {
    pub date: NaiveDate,
    pub category: RemarkCategory,
    pub description: String,
}

/// Payload of `updateDailyRemark`; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemarkUpdate {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<RemarkCategory>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemarkUpdate {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.category.is_none() && self.description.is_none()
    }
}

fn remark_mut(plan: &mut SeasonPlan, id: Uuid) -> PlanResult<&mut DailyRemark> {
    plan.daily_remarks
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| PlanError::NotFound("Daily remark".to_string()))
}

/// Append a remark. The caller supplies the id and creation time so a
/// retried write produces the same entry.
pub fn add_remark(
    plan: &mut SeasonPlan,
    id: Uuid,
    created_at: DateTime<Utc>,
    remark: &NewRemark,
) -> PlanResult<()> {
    plan.ensure_mutable()?;
    validate_remark_description(&remark.description)
        .map_err(|m| PlanError::validation("description", m))?;

    if plan.daily_remarks.iter().any(|r| r.id == id) {
        return Ok(());
    }

    plan.daily_remarks.push(DailyRemark {
        id,
        date: remark.date,
        category: remark.category,
        description: remark.description.trim().to_string(),
        images: Vec::new(),
        created_at,
    });
    Ok(())
}

pub fn update_remark(plan: &mut SeasonPlan, id: Uuid, update: &RemarkUpdate) -> PlanResult<()> {
    plan.ensure_mutable()?;
    plan.remark(id)?;
    if update.is_empty() {
        return Err(PlanError::validation("remark", "No fields to update"));
    }
    if let Some(description) = &update.description {
        validate_remark_description(description)
            .map_err(|m| PlanError::validation("description", m))?;
    }

    let remark = remark_mut(plan, id)?;
    if let Some(date) = update.date {
        remark.date = date;
    }
    if let Some(category) = update.category {
        remark.category = category;
    }
    if let Some(description) = &update.description {
        remark.description = description.trim().to_string();
    }
    Ok(())
}

/// Remove a remark, returning it so the caller can clean up its images
pub fn delete_remark(plan: &mut SeasonPlan, id: Uuid) -> PlanResult<DailyRemark> {
    plan.ensure_mutable()?;
    let position = plan
        .daily_remarks
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| PlanError::NotFound("Daily remark".to_string()))?;
    Ok(plan.daily_remarks.remove(position))
}

/// Attach a stored image to a remark. Attaching the same filename twice is
/// a no-op.
pub fn attach_image(plan: &mut SeasonPlan, id: Uuid, filename: &str) -> PlanResult<()> {
    plan.ensure_mutable()?;
    validate_image_filename(filename).map_err(|m| PlanError::validation("filename", m))?;
    let remark = remark_mut(plan, id)?;
    if !remark.images.iter().any(|f| f == filename) {
        remark.images.push(filename.to_string());
    }
    Ok(())
}

/// Detach one image reference, leaving the rest of the remark untouched
pub fn remove_image(plan: &mut SeasonPlan, id: Uuid, filename: &str) -> PlanResult<()> {
    plan.ensure_mutable()?;
    let remark = remark_mut(plan, id)?;
    let position = remark
        .images
        .iter()
        .position(|f| f == filename)
        .ok_or_else(|| PlanError::NotFound(format!("Image {}", filename)))?;
    remark.images.remove(position);
    Ok(())
}

/// Display order: by date, then by creation time for remarks on the same day
pub fn sort_for_display(remarks: &mut [DailyRemark]) {
    remarks.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
}
