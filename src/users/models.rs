// src/users/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const GENDERS: &[&str] = &["male", "female", "other"];
pub const FITNESS_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];
pub const FITNESS_GOALS: &[&str] = &["weight_loss", "muscle_gain", "endurance", "general_fitness"];
pub const DIETARY_PREFS: &[&str] = &["vegetarian", "vegan", "keto", "paleo", "none"];

/// Profile fields of a user; the password hash is never selected
#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub location: Option<String>,
    pub fitness_level: Option<String>,
    pub fitness_goal: Option<String>,
    pub dietary_pref: Option<String>,
    pub medical_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; absent fields keep their stored value
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub location: Option<String>,
    pub fitness_level: Option<String>,
    pub fitness_goal: Option<String>,
    pub dietary_pref: Option<String>,
    pub medical_notes: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ProfileResponse {
    pub user: UserProfile,
}
