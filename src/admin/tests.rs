//! Tests for admin module

#[cfg(test)]
mod tests {
    use super::super::models::success_rate;
    use crate::common::test_support::{create_plan, create_user, router, send, test_state, ADMIN_EMAIL};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_admin_routes_require_admin_email() {
        let state = test_state().await;
        let (_, token) = create_user(&state, "t@example.com").await;

        let (status, body) = send(router(&state), "GET", "/api/admin/stats", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");

        let (status, _) = send(router(&state), "GET", "/api/admin/jobs", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stats_counts_plans_by_status() {
        let state = test_state().await;
        let (_, admin_token) = create_user(&state, ADMIN_EMAIL).await;
        let (user_id, _) = create_user(&state, "t@example.com").await;
        create_plan(&state, &user_id, "completed").await;
        create_plan(&state, &user_id, "completed").await;
        create_plan(&state, &user_id, "failed").await;

        let (status, body) = send(router(&state), "GET", "/api/admin/stats", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"]["total"], 2);
        assert_eq!(body["plans"]["total"], 3);
        assert_eq!(body["plans"]["completed"], 2);
        assert_eq!(body["plans"]["failed"], 1);
        assert_eq!(body["plans"]["today"], 3);
        assert_eq!(body["plans"]["successRate"], "66.67");
    }

    #[tokio::test]
    async fn test_job_counts_cover_every_queue() {
        let state = test_state().await;
        let (_, admin_token) = create_user(&state, ADMIN_EMAIL).await;
        state.queues.tts.add("generate-tts", json!({"text": "hi"})).await.unwrap();

        let (status, body) = send(router(&state), "GET", "/api/admin/jobs", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);

        let queues = body["queues"].as_array().unwrap();
        let names: Vec<&str> = queues.iter().map(|q| q["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["plan-generation", "tts-generation", "image-generation", "pdf-generation"]
        );
        assert_eq!(queues[1]["waiting"], 1);
        assert_eq!(queues[0]["delayed"], 0);
    }

    #[test]
    fn test_success_rate_format() {
        assert_eq!(success_rate(0, 0), json!(0));
        assert_eq!(success_rate(1, 3), json!("33.33"));
        assert_eq!(success_rate(2, 2), json!("100.00"));
    }
}
