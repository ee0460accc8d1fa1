// src/plans/prompt.rs
//! Prompt construction and parsing of the model's plan JSON

use serde_json::Value;
use thiserror::Error;

use super::models::PlanInput;
use crate::adapters::llm::strip_code_fences;
use crate::common::helpers::format_number;

#[derive(Debug, Error, PartialEq)]
pub enum PlanParseError {
    #[error("LLM response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid plan structure from LLM")]
    MissingSections,
}

/// The three sections every generated plan must carry
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub workout_plan: Value,
    pub diet_plan: Value,
    pub metadata: Value,
}

const RESPONSE_FORMAT: &str = r#"{
  "workoutPlan": [
    {
      "day": 1,
      "dayName": "Monday",
      "focus": "Upper Body",
      "exercises": [
        {
          "name": "Push-ups",
          "sets": 3,
          "reps": "10-15",
          "rest": "60 seconds",
          "instructions": "Keep core tight, full range of motion"
        }
      ],
      "duration": "45 minutes",
      "notes": "Focus on form over speed"
    }
  ],
  "dietPlan": [
    {
      "day": 1,
      "dayName": "Monday",
      "meals": [
        {
          "type": "breakfast",
          "name": "Oatmeal with Berries",
          "ingredients": ["1 cup oats", "1/2 cup blueberries", "1 tbsp honey"],
          "calories": 350,
          "protein": 12,
          "carbs": 65,
          "fat": 6,
          "instructions": "Cook oats, top with berries and honey"
        }
      ],
      "totalCalories": 2200,
      "totalProtein": 120,
      "totalCarbs": 250,
      "totalFat": 80
    }
  ],
  "metadata": {
    "estimatedCaloriesPerDay": 2200,
    "macroSplit": {
      "protein": "22%",
      "carbs": "45%",
      "fat": "33%"
    },
    "estimatedWeightChangePerWeek": "-0.5kg",
    "difficultyLevel": "intermediate",
    "equipmentNeeded": ["dumbbells", "resistance bands"],
    "tips": [
      "Stay hydrated throughout the day",
      "Get 7-9 hours of sleep",
      "Listen to your body and rest when needed"
    ]
  }
}"#;

pub fn build_prompt(input: &PlanInput) -> String {
    format!(
        r#"
You are an expert fitness coach and nutritionist. Create a comprehensive fitness and diet plan for the following person:

**User Profile:**
- Age: {age}
- Gender: {gender}
- Height: {height}cm
- Weight: {weight}kg
- Fitness Goal: {goal}
- Fitness Level: {level}
- Location: {location}
- Dietary Preference: {pref}
- Medical Notes: {notes}

**Instructions:**
1. Create a 7-day workout plan with specific exercises, sets, reps, and rest periods
2. Create a 7-day diet plan with meals, portions, and nutritional information
3. Calculate estimated daily calories and macronutrients
4. Provide practical tips and modifications

**Response Format (JSON only):**
{format}

Respond with ONLY the JSON object, no additional text.
"#,
        age = input.age,
        gender = input.gender,
        height = format_number(input.height),
        weight = format_number(input.weight),
        goal = input.fitness_goal,
        level = input.fitness_level,
        location = non_empty(&input.location).unwrap_or("Not specified"),
        pref = non_empty(&input.dietary_pref).unwrap_or("None"),
        notes = non_empty(&input.medical_notes).unwrap_or("None"),
        format = RESPONSE_FORMAT,
    )
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Parses model output into a plan. Code fences are tolerated; the three
/// top-level sections are required.
pub fn parse_plan_response(text: &str) -> Result<GeneratedPlan, PlanParseError> {
    let cleaned = strip_code_fences(text);
    let mut value: Value =
        serde_json::from_str(&cleaned).map_err(|e| PlanParseError::InvalidJson(e.to_string()))?;

    let Some(object) = value.as_object_mut() else {
        return Err(PlanParseError::MissingSections);
    };
    match (
        object.remove("workoutPlan"),
        object.remove("dietPlan"),
        object.remove("metadata"),
    ) {
        (Some(workout_plan), Some(diet_plan), Some(metadata)) => Ok(GeneratedPlan {
            workout_plan,
            diet_plan,
            metadata,
        }),
        _ => Err(PlanParseError::MissingSections),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::mock_plan;

    fn input() -> PlanInput {
        PlanInput {
            age: 30,
            gender: "female".to_string(),
            height: 170.0,
            weight: 65.5,
            fitness_goal: "weight_loss".to_string(),
            fitness_level: "beginner".to_string(),
            location: None,
            dietary_pref: Some("vegan".to_string()),
            medical_notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_prompt_carries_profile() {
        let prompt = build_prompt(&input());
        assert!(prompt.contains("- Age: 30\n"));
        assert!(prompt.contains("- Height: 170cm\n"));
        assert!(prompt.contains("- Weight: 65.5kg\n"));
        assert!(prompt.contains("- Location: Not specified\n"));
        assert!(prompt.contains("- Dietary Preference: vegan\n"));
        assert!(prompt.contains("- Medical Notes: None\n"));
        assert!(prompt.contains("\"name\": \"Push-ups\""));
        assert!(!prompt.contains("Dumbbell Rows"));

        let workout = prompt.find("\"workoutPlan\"").unwrap();
        let diet = prompt.find("\"dietPlan\"").unwrap();
        let metadata = prompt.find("\"metadata\"").unwrap();
        assert!(workout < diet && diet < metadata);
        assert!(prompt.find("\"protein\": 12").unwrap() < prompt.find("\"carbs\": 65").unwrap());
        assert!(prompt.trim_end().ends_with("no additional text."));
    }

    #[test]
    fn test_parse_accepts_fenced_json() {
        let plan = parse_plan_response(&format!("```json\n{}\n```", mock_plan())).unwrap();
        assert_eq!(plan.metadata["estimatedCaloriesPerDay"], 2200);
        assert!(plan.workout_plan.is_array());
    }

    #[test]
    fn test_parse_requires_all_sections() {
        let err = parse_plan_response(r#"{"workoutPlan": [], "dietPlan": []}"#).unwrap_err();
        assert_eq!(err, PlanParseError::MissingSections);
        assert_eq!(err.to_string(), "Invalid plan structure from LLM");

        assert!(matches!(
            parse_plan_response("not json"),
            Err(PlanParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_plan_response("[1, 2]").unwrap_err(),
            PlanParseError::MissingSections
        );
    }
}
