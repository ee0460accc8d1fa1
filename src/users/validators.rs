// src/users/validators.rs

use super::models::*;
use crate::common::{ValidationResult, Validator};

pub struct UpdateProfileValidator;

impl Validator<UpdateProfileRequest> for UpdateProfileValidator {
    fn validate(&self, data: &UpdateProfileRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(name) = &data.name {
            result.check_length("name", name.trim(), 2, 100);
        }
        if let Some(age) = data.age {
            result.check_range("age", age as f64, 13.0, 120.0);
        }
        if let Some(gender) = &data.gender {
            result.check_one_of("gender", gender, GENDERS);
        }
        if let Some(height) = data.height {
            result.check_range("height", height, 100.0, 250.0);
        }
        if let Some(weight) = data.weight {
            result.check_range("weight", weight, 30.0, 300.0);
        }
        if let Some(location) = &data.location {
            result.check_length("location", location, 0, 100);
        }
        if let Some(level) = &data.fitness_level {
            result.check_one_of("fitnessLevel", level, FITNESS_LEVELS);
        }
        if let Some(goal) = &data.fitness_goal {
            result.check_one_of("fitnessGoal", goal, FITNESS_GOALS);
        }
        if let Some(pref) = &data.dietary_pref {
            result.check_one_of("dietaryPref", pref, DIETARY_PREFS);
        }
        if let Some(notes) = &data.medical_notes {
            result.check_length("medicalNotes", notes, 0, 500);
        }

        result
    }
}
