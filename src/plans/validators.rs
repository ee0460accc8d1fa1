// src/plans/validators.rs

use super::models::GeneratePlanRequest;
use crate::common::{ValidationResult, Validator};
use crate::users::models::{DIETARY_PREFS, FITNESS_GOALS, FITNESS_LEVELS, GENDERS};

const REQUIRED: &str = "Required";

pub struct GeneratePlanValidator;

impl Validator<GeneratePlanRequest> for GeneratePlanValidator {
    fn validate(&self, data: &GeneratePlanRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.age {
            Some(age) => result.check_range("age", age as f64, 13.0, 120.0),
            None => result.add_error("age", REQUIRED),
        }
        match &data.gender {
            Some(gender) => result.check_one_of("gender", gender, GENDERS),
            None => result.add_error("gender", REQUIRED),
        }
        match data.height {
            Some(height) => result.check_range("height", height, 100.0, 250.0),
            None => result.add_error("height", REQUIRED),
        }
        match data.weight {
            Some(weight) => result.check_range("weight", weight, 30.0, 300.0),
            None => result.add_error("weight", REQUIRED),
        }
        match &data.fitness_goal {
            Some(goal) => result.check_one_of("fitnessGoal", goal, FITNESS_GOALS),
            None => result.add_error("fitnessGoal", REQUIRED),
        }
        match &data.fitness_level {
            Some(level) => result.check_one_of("fitnessLevel", level, FITNESS_LEVELS),
            None => result.add_error("fitnessLevel", REQUIRED),
        }

        if let Some(location) = &data.location {
            result.check_length("location", location, 0, 100);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GeneratePlanRequest {
        GeneratePlanRequest {
            age: Some(30),
            gender: Some("male".to_string()),
            height: Some(180.0),
            weight: Some(80.0),
            fitness_goal: Some("muscle_gain".to_string()),
            fitness_level: Some("intermediate".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(GeneratePlanValidator.validate(&valid()).is_valid);
    }

    #[test]
    fn test_required_fields() {
        let result = GeneratePlanValidator.validate(&GeneratePlanRequest::default());
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["age", "gender", "height", "weight", "fitnessGoal", "fitnessLevel"]
        );
    }

    #[test]
    fn test_domains() {
        let request = GeneratePlanRequest {
            age: Some(12),
            gender: Some("robot".to_string()),
            dietary_pref: Some("carnivore".to_string()),
            ..valid()
        };
        let result = GeneratePlanValidator.validate(&request);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["age", "gender", "dietaryPref"]);
    }
}
