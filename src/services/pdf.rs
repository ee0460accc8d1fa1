// PDF export of a completed plan
//
// Layout is a pure pass producing positioned text runs in points, measured
// from the top-left of a US Letter page. Rendering turns those runs into a
// printpdf document.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde_json::Value;
use thiserror::Error;

use crate::common::helpers::format_number;

const PAGE_WIDTH_PT: f32 = 612.0;
const PAGE_HEIGHT_PT: f32 = 792.0;
const PAGE_TOP: f32 = 50.0;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// Plan fields printed in the export
#[derive(Debug, Clone)]
pub struct PlanDocument {
    pub age: i64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub fitness_goal: String,
    pub fitness_level: String,
    pub workout_plan: Value,
    pub diet_plan: Value,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

struct Cursor {
    page: usize,
    y: f32,
    runs: Vec<TextRun>,
}

impl Cursor {
    fn new() -> Self {
        Self {
            page: 0,
            y: 0.0,
            runs: Vec::new(),
        }
    }

    fn text(&mut self, size: f32, x: f32, y: f32, text: impl Into<String>) {
        self.runs.push(TextRun {
            page: self.page,
            x,
            y,
            size,
            text: text.into(),
        });
    }

    fn break_after(&mut self, threshold: f32) {
        if self.y > threshold {
            self.page += 1;
            self.y = PAGE_TOP;
        }
    }
}

fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Renders a JSON scalar the way it should read on the page
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Positions every line of the export. Thresholds and offsets are fixed.
pub fn layout_plan(plan: &PlanDocument, generated_on: &str) -> Vec<TextRun> {
    let mut c = Cursor::new();

    c.text(24.0, 50.0, 50.0, "AI Fitness Coach - Personal Plan");
    c.text(12.0, 50.0, 80.0, format!("Generated on: {}", generated_on));
    c.y = 120.0;

    c.text(16.0, 50.0, c.y, "User Profile");
    c.y += 30.0;
    c.text(12.0, 50.0, c.y, format!("Age: {}", plan.age));
    c.text(12.0, 200.0, c.y, format!("Gender: {}", plan.gender));
    c.text(12.0, 350.0, c.y, format!("Height: {}cm", format_number(plan.height)));
    c.y += 20.0;
    c.text(12.0, 50.0, c.y, format!("Weight: {}kg", format_number(plan.weight)));
    c.text(12.0, 200.0, c.y, format!("Fitness Goal: {}", plan.fitness_goal));
    c.text(12.0, 350.0, c.y, format!("Level: {}", plan.fitness_level));
    c.y += 40.0;

    c.text(16.0, 50.0, c.y, "Workout Plan");
    c.y += 30.0;
    for day in items(&plan.workout_plan) {
        c.break_after(700.0);
        c.text(
            14.0,
            50.0,
            c.y,
            format!(
                "Day {}: {} - {}",
                display(&day["day"]),
                display(&day["dayName"]),
                display(&day["focus"])
            ),
        );
        c.y += 20.0;

        for exercise in items(&day["exercises"]) {
            c.break_after(720.0);
            c.text(
                10.0,
                70.0,
                c.y,
                format!(
                    "• {}: {} sets x {} reps",
                    display(&exercise["name"]),
                    display(&exercise["sets"]),
                    display(&exercise["reps"])
                ),
            );
            c.text(10.0, 70.0, c.y + 12.0, format!("  Rest: {}", display(&exercise["rest"])));
            c.y += 30.0;
        }
        c.y += 10.0;
    }

    c.break_after(600.0);
    c.text(16.0, 50.0, c.y, "Diet Plan");
    c.y += 30.0;
    for day in items(&plan.diet_plan) {
        c.break_after(650.0);
        c.text(
            14.0,
            50.0,
            c.y,
            format!("Day {}: {}", display(&day["day"]), display(&day["dayName"])),
        );
        c.y += 20.0;

        for meal in items(&day["meals"]) {
            c.break_after(720.0);
            c.text(
                12.0,
                70.0,
                c.y,
                format!(
                    "{}: {}",
                    display(&meal["type"]).to_uppercase(),
                    display(&meal["name"])
                ),
            );
            c.text(
                10.0,
                70.0,
                c.y + 15.0,
                format!(
                    "Calories: {} | Protein: {}g | Carbs: {}g | Fat: {}g",
                    display(&meal["calories"]),
                    display(&meal["protein"]),
                    display(&meal["carbs"]),
                    display(&meal["fat"])
                ),
            );
            c.y += 35.0;
        }
        c.y += 10.0;
    }

    c.break_after(600.0);
    let metadata = &plan.metadata;
    c.text(16.0, 50.0, c.y, "Plan Summary");
    c.y += 30.0;

    let equipment: Vec<String> = items(&metadata["equipmentNeeded"]).iter().map(display).collect();
    let equipment = if equipment.is_empty() {
        "None".to_string()
    } else {
        equipment.join(", ")
    };
    c.text(
        12.0,
        50.0,
        c.y,
        format!("Daily Calories: {}", display(&metadata["estimatedCaloriesPerDay"])),
    );
    c.text(
        12.0,
        50.0,
        c.y + 20.0,
        format!("Difficulty: {}", display(&metadata["difficultyLevel"])),
    );
    c.text(12.0, 50.0, c.y + 40.0, format!("Equipment Needed: {}", equipment));

    if let Some(tips) = metadata["tips"].as_array() {
        c.y += 80.0;
        c.text(14.0, 50.0, c.y, "Tips:");
        c.y += 20.0;
        for tip in tips {
            c.break_after(720.0);
            c.text(10.0, 70.0, c.y, format!("• {}", display(tip)));
            c.y += 15.0;
        }
    }

    c.runs
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Draws laid-out runs into a PDF and returns its bytes
pub fn render_pdf(title: &str, runs: &[TextRun]) -> Result<Vec<u8>, PdfError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        pt_to_mm(PAGE_WIDTH_PT),
        pt_to_mm(PAGE_HEIGHT_PT),
        "Layer 1",
    );

    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PdfError::Render(e.to_string()))?;
    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PdfError::Render(e.to_string()))?;

    let page_count = runs.iter().map(|r| r.page + 1).max().unwrap_or(1);
    let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
    for _ in 1..page_count {
        let (page, layer) = doc.add_page(
            pt_to_mm(PAGE_WIDTH_PT),
            pt_to_mm(PAGE_HEIGHT_PT),
            "Layer 1",
        );
        layers.push(doc.get_page(page).get_layer(layer));
    }

    for run in runs {
        let font = if run.size >= 14.0 { &font_bold } else { &font_regular };
        // runs are positioned by their top edge; PDF text sits on its baseline
        let baseline = PAGE_HEIGHT_PT - run.y - run.size;
        layers[run.page].use_text(
            run.text.as_str(),
            run.size,
            pt_to_mm(run.x),
            pt_to_mm(baseline),
            font,
        );
    }

    doc.save_to_bytes()
        .map_err(|e| PdfError::Render(e.to_string()))
}

/// Lays out and renders a plan in one step
pub fn generate_plan_pdf(plan: &PlanDocument, generated_on: &str) -> Result<Vec<u8>, PdfError> {
    let runs = layout_plan(plan, generated_on);
    render_pdf("AI Fitness Coach - Personal Plan", &runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::mock_plan;
    use serde_json::json;

    fn sample_plan() -> PlanDocument {
        let generated: Value = serde_json::from_str(&mock_plan()).unwrap();
        PlanDocument {
            age: 30,
            gender: "female".to_string(),
            height: 170.0,
            weight: 65.5,
            fitness_goal: "weight_loss".to_string(),
            fitness_level: "beginner".to_string(),
            workout_plan: generated["workoutPlan"].clone(),
            diet_plan: generated["dietPlan"].clone(),
            metadata: generated["metadata"].clone(),
        }
    }

    fn find<'a>(runs: &'a [TextRun], prefix: &str) -> &'a TextRun {
        runs.iter()
            .find(|r| r.text.starts_with(prefix))
            .unwrap_or_else(|| panic!("no run starting with {:?}", prefix))
    }

    #[test]
    fn test_header_and_profile_positions() {
        let runs = layout_plan(&sample_plan(), "1/2/2026");

        let title = find(&runs, "AI Fitness Coach");
        assert_eq!((title.x, title.y, title.size), (50.0, 50.0, 24.0));
        assert_eq!(find(&runs, "Generated on:").text, "Generated on: 1/2/2026");

        assert_eq!(find(&runs, "Height:").text, "Height: 170cm");
        assert_eq!(find(&runs, "Weight:").text, "Weight: 65.5kg");
        let level = find(&runs, "Level:");
        assert_eq!((level.x, level.y), (350.0, 170.0));
    }

    #[test]
    fn test_workout_and_diet_lines() {
        let runs = layout_plan(&sample_plan(), "today");

        let day = find(&runs, "Day 1: Monday - Upper Body");
        assert_eq!((day.y, day.size), (240.0, 14.0));

        let push_ups = find(&runs, "• Push-ups");
        assert_eq!(push_ups.text, "• Push-ups: 3 sets x 10-15 reps");
        assert_eq!(push_ups.y, 260.0);
        assert_eq!(find(&runs, "  Rest: 60 seconds").y, 272.0);

        assert_eq!(find(&runs, "BREAKFAST:").text, "BREAKFAST: Oatmeal with Berries");
        assert_eq!(
            find(&runs, "Calories: 350").text,
            "Calories: 350 | Protein: 12g | Carbs: 65g | Fat: 6g"
        );
        assert_eq!(
            find(&runs, "Equipment Needed:").text,
            "Equipment Needed: dumbbells, resistance bands"
        );
        assert_eq!(find(&runs, "Tips:").size, 14.0);
        assert_eq!(runs.iter().filter(|r| r.text.starts_with("• Stay")).count(), 1);
    }

    #[test]
    fn test_long_workout_paginates() {
        let mut plan = sample_plan();
        let exercises: Vec<Value> = (0..30)
            .map(|i| json!({"name": format!("Move {}", i), "sets": 3, "reps": "10", "rest": "60s"}))
            .collect();
        plan.workout_plan = json!([{"day": 1, "dayName": "Monday", "focus": "Full", "exercises": exercises}]);

        let runs = layout_plan(&plan, "today");
        assert!(runs.iter().any(|r| r.page > 0));
        for run in runs.iter().filter(|r| r.page > 0) {
            assert!(run.y >= PAGE_TOP);
        }
        let first_on_new_page = runs.iter().find(|r| r.page == 1).unwrap();
        assert_eq!(first_on_new_page.y, PAGE_TOP);
    }

    #[test]
    fn test_long_tips_list_paginates() {
        let mut plan = sample_plan();
        let tips: Vec<Value> = (0..60).map(|i| json!(format!("Tip {}", i))).collect();
        plan.metadata["tips"] = json!(tips);

        let runs = layout_plan(&plan, "today");
        let tip_runs: Vec<&TextRun> = runs.iter().filter(|r| r.text.starts_with("• Tip ")).collect();
        assert_eq!(tip_runs.len(), 60);
        assert!(tip_runs.iter().all(|r| r.y <= 720.0 + 15.0));
        assert!(tip_runs.iter().any(|r| r.page > tip_runs[0].page));
        let last = tip_runs[tip_runs.len() - 1];
        assert!(last.y >= PAGE_TOP);
    }

    #[test]
    fn test_missing_equipment_reads_none() {
        let mut plan = sample_plan();
        plan.metadata = json!({"estimatedCaloriesPerDay": 1800, "difficultyLevel": "beginner"});
        let runs = layout_plan(&plan, "today");
        assert_eq!(find(&runs, "Equipment Needed:").text, "Equipment Needed: None");
        assert!(!runs.iter().any(|r| r.text == "Tips:"));
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let bytes = generate_plan_pdf(&sample_plan(), "today").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
