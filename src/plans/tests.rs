//! Tests for plans module
//!
//! Covers queued generation, status polling, ownership scoping, pagination
//! and regeneration through the full router.

#[cfg(test)]
mod tests {
    use super::super::models::{ListQuery, Pagination, PlanJobData};
    use crate::common::test_support::{create_plan, create_user, router, send, test_state, test_state_with};
    use crate::adapters::LlmAdapter;
    use crate::queue::QueueName;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn generate_body() -> Value {
        json!({
            "age": 30,
            "gender": "female",
            "height": 170,
            "weight": 65,
            "fitnessGoal": "weight_loss",
            "fitnessLevel": "beginner",
            "dietaryPref": "vegan"
        })
    }

    #[tokio::test]
    async fn test_generate_queues_job_and_returns_accepted() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;

        let (status, body) = send(
            router(&state),
            "POST",
            "/api/plans/generate",
            Some(&token),
            Some(generate_body()),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "generating");
        let job_id = body["jobId"].as_str().unwrap();
        let plan_id = body["planId"].as_str().unwrap();
        assert_eq!(body["statusUrl"], format!("/api/plans/status/{}", job_id));

        let (stored_job, stored_status, metadata): (Option<String>, String, Option<String>) =
            sqlx::query_as("SELECT job_id, status, metadata FROM plans WHERE id = ?")
                .bind(plan_id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(stored_job.as_deref(), Some(job_id));
        assert_eq!(stored_status, "generating");
        assert_eq!(metadata.as_deref(), Some("{}"));

        let job = state.queues.get(QueueName::PlanGeneration).get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.name, "generate-plan");
        let payload: PlanJobData = serde_json::from_value(job.data).unwrap();
        assert_eq!(payload.plan_id, plan_id);
        assert_eq!(payload.user_id, user_id);
        assert_eq!(payload.input.dietary_pref.as_deref(), Some("vegan"));
        assert_eq!(payload.input.height, 170.0);
    }

    #[tokio::test]
    async fn test_generate_validates_input() {
        let state = test_state().await;
        let (_, token) = create_user(&state, "t@example.com").await;

        let (status, body) = send(
            router(&state),
            "POST",
            "/api/plans/generate",
            Some(&token),
            Some(json!({"age": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plans")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_generate_is_rate_limited_per_user() {
        let state = test_state_with(LlmAdapter::Mock, &[("PLAN_GENERATION_LIMIT_PER_HOUR", "1")]).await;
        let (_, token) = create_user(&state, "t@example.com").await;
        let (_, other_token) = create_user(&state, "other@example.com").await;

        let (status, _) = send(router(&state), "POST", "/api/plans/generate", Some(&token), Some(generate_body())).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(router(&state), "POST", "/api/plans/generate", Some(&token), Some(generate_body())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Plan generation limit exceeded. Try again later.");

        let (status, _) = send(
            router(&state),
            "POST",
            "/api/plans/generate",
            Some(&other_token),
            Some(generate_body()),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_generate_requires_authentication() {
        let state = test_state().await;
        let (status, _) = send(router(&state), "POST", "/api/plans/generate", None, Some(generate_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_job_status_is_owner_scoped() {
        let state = test_state().await;
        let (_, token) = create_user(&state, "t@example.com").await;
        let (_, intruder) = create_user(&state, "other@example.com").await;

        let (_, body) = send(router(&state), "POST", "/api/plans/generate", Some(&token), Some(generate_body())).await;
        let uri = format!("/api/plans/status/{}", body["jobId"].as_str().unwrap());

        let (status, status_body) = send(router(&state), "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(status_body["status"], "waiting");
        assert_eq!(status_body["progress"], 0);
        assert_eq!(status_body["plan"]["id"], body["planId"]);
        assert_eq!(status_body["plan"]["status"], "generating");

        let (status, body) = send(router(&state), "GET", &uri, Some(&intruder), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Job not found");

        let (status, _) = send(router(&state), "GET", "/api/plans/status/999", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_job_status_ignores_older_plan_sharing_job_id() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let stale_plan = create_plan(&state, &user_id, "completed").await;

        let (_, body) = send(router(&state), "POST", "/api/plans/generate", Some(&token), Some(generate_body())).await;
        let job_id = body["jobId"].as_str().unwrap();
        sqlx::query("UPDATE plans SET job_id = ?, created_at = '2020-01-01 00:00:00' WHERE id = ?")
            .bind(job_id)
            .bind(&stale_plan)
            .execute(&state.db)
            .await
            .unwrap();

        let uri = format!("/api/plans/status/{}", job_id);
        let (status, status_body) = send(router(&state), "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(status_body["plan"]["id"], body["planId"]);
        assert_eq!(status_body["plan"]["status"], "generating");
    }

    #[tokio::test]
    async fn test_job_status_falls_back_to_plan_row() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let plan_id = create_plan(&state, &user_id, "completed").await;
        sqlx::query("UPDATE plans SET job_id = 'pruned-1' WHERE id = ?")
            .bind(&plan_id)
            .execute(&state.db)
            .await
            .unwrap();

        let (status, body) = send(router(&state), "GET", "/api/plans/status/pruned-1", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["progress"], 100);
        assert_eq!(body["plan"]["id"], plan_id.as_str());
    }

    #[tokio::test]
    async fn test_list_plans_paginates_newest_first() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let (other_id, _) = create_user(&state, "other@example.com").await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(create_plan(&state, &user_id, "completed").await);
        }
        create_plan(&state, &other_id, "completed").await;

        let (status, body) = send(router(&state), "GET", "/api/plans?page=1&limit=2", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"], json!({"page": 1, "limit": 2, "total": 3, "pages": 2}));
        assert_eq!(body["plans"].as_array().unwrap().len(), 2);
        assert_eq!(body["plans"][0]["id"], ids[2].as_str());
        assert!(body["plans"][0].get("workoutPlan").is_none());

        let (_, body) = send(router(&state), "GET", "/api/plans?page=2&limit=2", Some(&token), None).await;
        assert_eq!(body["plans"].as_array().unwrap().len(), 1);
        assert_eq!(body["plans"][0]["id"], ids[0].as_str());
    }

    #[tokio::test]
    async fn test_get_plan_renders_json_columns_and_hides_other_users_plans() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let (_, intruder) = create_user(&state, "other@example.com").await;
        let plan_id = create_plan(&state, &user_id, "completed").await;
        let uri = format!("/api/plans/{}", plan_id);

        let (status, body) = send(router(&state), "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"]["workoutPlan"][0]["dayName"], "Monday");
        assert_eq!(body["plan"]["metadata"]["estimatedCaloriesPerDay"], 2200);
        assert_eq!(body["plan"]["fitnessGoal"], "weight_loss");

        let (status, body) = send(router(&state), "GET", &uri, Some(&intruder), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Plan not found");
    }

    #[tokio::test]
    async fn test_regenerate_creates_new_plan_with_same_inputs() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let source_id = create_plan(&state, &user_id, "completed").await;

        let (status, body) = send(
            router(&state),
            "POST",
            &format!("/api/plans/{}/regenerate", source_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let new_id = body["planId"].as_str().unwrap();
        assert_ne!(new_id, source_id);

        let inputs = |id: String| {
            let db = state.db.clone();
            async move {
                sqlx::query_as::<_, (i64, String, f64, f64, String, String)>(
                    "SELECT age, gender, height, weight, fitness_level, fitness_goal FROM plans WHERE id = ?",
                )
                .bind(id)
                .fetch_one(&db)
                .await
                .unwrap()
            }
        };
        assert_eq!(inputs(source_id.clone()).await, inputs(new_id.to_string()).await);

        let (source_status,): (String,) = sqlx::query_as("SELECT status FROM plans WHERE id = ?")
            .bind(&source_id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(source_status, "completed");
    }

    #[test]
    fn test_list_query_is_lenient() {
        let query = ListQuery {
            page: Some("abc".to_string()),
            limit: Some("500".to_string()),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 50);
        assert_eq!(ListQuery::default().limit(), 10);
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 21).pages, 3);
    }
}
