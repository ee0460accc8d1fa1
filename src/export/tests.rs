//! Tests for export module

#[cfg(test)]
mod tests {
    use super::super::models::PdfJobData;
    use crate::common::test_support::{create_plan, create_user, router, send, test_state};
    use crate::queue::QueueName;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_export_queues_pdf_job_for_completed_plan() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let plan_id = create_plan(&state, &user_id, "completed").await;

        let (status, body) = send(
            router(&state),
            "POST",
            "/api/export/pdf",
            Some(&token),
            Some(json!({"planId": plan_id})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["message"], "PDF generation started");

        let job = state
            .queues
            .get(QueueName::PdfGeneration)
            .get_job(body["jobId"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.name, "generate-pdf");
        let data: PdfJobData = serde_json::from_value(job.data).unwrap();
        assert_eq!(data, PdfJobData { plan_id, user_id });
    }

    #[tokio::test]
    async fn test_export_rejects_missing_unready_and_foreign_plans() {
        let state = test_state().await;
        let (user_id, token) = create_user(&state, "t@example.com").await;
        let (_, intruder) = create_user(&state, "other@example.com").await;
        let generating = create_plan(&state, &user_id, "generating").await;

        let (status, body) = send(
            router(&state),
            "POST",
            "/api/export/pdf",
            Some(&token),
            Some(json!({"planId": generating})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Plan is not ready for PDF generation");

        let (status, body) = send(
            router(&state),
            "POST",
            "/api/export/pdf",
            Some(&intruder),
            Some(json!({"planId": generating})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Plan not found");

        let (status, body) = send(router(&state), "POST", "/api/export/pdf", Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let counts = state.queues.get(QueueName::PdfGeneration).counts().await.unwrap();
        assert_eq!(counts.waiting, 0);
    }
}
