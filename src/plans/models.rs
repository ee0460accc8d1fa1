// src/plans/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::{serialize_json_text, serialize_optional_json_text};

pub const STATUS_GENERATING: &str = "generating";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

pub const PLAN_COLUMNS: &str = "id, user_id, job_id, age, gender, height, weight, fitness_level, \
     fitness_goal, location, dietary_pref, medical_notes, workout_plan, diet_plan, metadata, status, \
     audio_url, pdf_url, created_at, updated_at";

/// A stored plan with its generated content rendered back as JSON
#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub user_id: String,
    pub job_id: Option<String>,
    pub age: i64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub fitness_level: String,
    pub fitness_goal: String,
    pub location: Option<String>,
    pub dietary_pref: Option<String>,
    pub medical_notes: Option<String>,
    #[serde(serialize_with = "serialize_json_text")]
    pub workout_plan: String,
    #[serde(serialize_with = "serialize_json_text")]
    pub diet_plan: String,
    #[serde(serialize_with = "serialize_optional_json_text")]
    pub metadata: Option<String>,
    pub status: String,
    pub audio_url: Option<String>,
    pub pdf_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Plan {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    /// The input attributes the plan was generated from
    pub fn input(&self) -> PlanInput {
        PlanInput {
            age: self.age,
            gender: self.gender.clone(),
            height: self.height,
            weight: self.weight,
            fitness_goal: self.fitness_goal.clone(),
            fitness_level: self.fitness_level.clone(),
            location: self.location.clone(),
            dietary_pref: self.dietary_pref.clone(),
            medical_notes: self.medical_notes.clone(),
        }
    }
}

/// Row shape for the plan listing
#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: String,
    pub age: i64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub fitness_goal: String,
    pub fitness_level: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatusSummary {
    pub id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub fitness_goal: Option<String>,
    pub fitness_level: Option<String>,
    pub location: Option<String>,
    pub dietary_pref: Option<String>,
    pub medical_notes: Option<String>,
}

/// Validated generation input, also the attribute part of the job payload
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    pub age: i64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub fitness_goal: String,
    pub fitness_level: String,
    pub location: Option<String>,
    pub dietary_pref: Option<String>,
    pub medical_notes: Option<String>,
}

impl PlanInput {
    /// Builds the input from a request that already passed validation
    pub fn from_request(request: GeneratePlanRequest) -> Option<Self> {
        Some(Self {
            age: request.age?,
            gender: request.gender?,
            height: request.height?,
            weight: request.weight?,
            fitness_goal: request.fitness_goal?,
            fitness_level: request.fitness_level?,
            location: request.location,
            dietary_pref: request.dietary_pref,
            medical_notes: request.medical_notes,
        })
    }
}

/// Payload of a `generate-plan` job
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanJobData {
    pub plan_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub input: PlanInput,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanResponse {
    pub plan_id: String,
    pub job_id: String,
    pub status: &'static str,
    pub status_url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: &'static str,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    pub plan: Option<PlanStatusSummary>,
}

/// `page` and `limit` arrive as free-form strings; junk falls back to the
/// defaults instead of rejecting the request.
#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

impl ListQuery {
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PlanListResponse {
    pub plans: Vec<PlanSummary>,
    pub pagination: Pagination,
}

#[derive(Serialize, Debug)]
pub struct PlanResponse {
    pub plan: Plan,
}
