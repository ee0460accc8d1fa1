//! Queue lifecycle tests against the in-memory store

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn queues() -> Queues {
        Queues::new(Arc::new(MemoryJobStore::new()))
    }

    /// Plan queue with no backoff so retries are due immediately
    fn instant_retry_queue() -> JobQueue {
        let mut options = QueueName::PlanGeneration.default_options();
        options.backoff_ms = 0;
        JobQueue::new(
            QueueName::PlanGeneration,
            options,
            Arc::new(MemoryJobStore::new()),
        )
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids_per_queue() {
        let queues = queues();
        let first = queues.plan_generation.add("generate-plan", json!({})).await.unwrap();
        let second = queues.plan_generation.add("generate-plan", json!({})).await.unwrap();
        let other = queues.tts.add("generate-tts", json!({})).await.unwrap();

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_eq!(other.id, "1");
        assert_eq!(first.state, JobState::Waiting);
        assert_eq!(first.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_take_is_fifo_and_marks_active() {
        let queues = queues();
        let queue = &queues.pdf;
        queue.add("generate-pdf", json!({"n": 1})).await.unwrap();
        queue.add("generate-pdf", json!({"n": 2})).await.unwrap();

        let job = queue.take().await.unwrap().unwrap();
        assert_eq!(job.data["n"], 1);
        assert_eq!(job.state, JobState::Active);
        assert!(job.processed_at.is_some());

        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.waiting, 1);
        assert_eq!(counts.active, 1);
    }

    #[tokio::test]
    async fn test_complete_stores_return_value() {
        let queues = queues();
        let queue = &queues.image;
        let added = queue.add("generate-image", json!({})).await.unwrap();
        let mut job = queue.take().await.unwrap().unwrap();
        queue.update_progress(&mut job, 60).await.unwrap();
        assert_eq!(queue.get_job(&added.id).await.unwrap().unwrap().progress, 60);

        queue
            .complete(job, json!({"imageUrl": "http://x/img.png"}))
            .await
            .unwrap();

        let stored = queue.get_job(&added.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(stored.attempts_made, 1);
        assert_eq!(stored.return_value.unwrap()["imageUrl"], "http://x/img.png");

        let counts = queue.counts().await.unwrap();
        assert_eq!((counts.active, counts.completed), (0, 1));
    }

    #[tokio::test]
    async fn test_failure_retries_until_attempts_exhausted() {
        let queue = instant_retry_queue();
        let added = queue.add("generate-plan", json!({})).await.unwrap();

        let job = queue.take().await.unwrap().unwrap();
        let outcome = queue.fail(job, "boom 1").await.unwrap();
        assert_eq!(outcome, FailureOutcome::Retrying { delay_ms: 0 });
        assert_eq!(queue.counts().await.unwrap().delayed, 1);

        let job = queue.take().await.unwrap().unwrap();
        assert_eq!(job.attempts_made, 1);
        assert!(matches!(
            queue.fail(job, "boom 2").await.unwrap(),
            FailureOutcome::Retrying { .. }
        ));

        let job = queue.take().await.unwrap().unwrap();
        assert!(job.is_final_attempt());
        assert_eq!(queue.fail(job, "boom 3").await.unwrap(), FailureOutcome::Exhausted);

        let stored = queue.get_job(&added.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Failed);
        assert_eq!(stored.attempts_made, 3);
        assert_eq!(stored.failed_reason.as_deref(), Some("boom 3"));
        assert!(queue.take().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delayed_job_waits_for_backoff() {
        let queues = queues();
        let queue = &queues.plan_generation;
        queue.add("generate-plan", json!({})).await.unwrap();

        let job = queue.take().await.unwrap().unwrap();
        let outcome = queue.fail(job, "transient").await.unwrap();
        assert_eq!(outcome, FailureOutcome::Retrying { delay_ms: 2000 });

        // Backoff has not elapsed yet
        assert!(queue.take().await.unwrap().is_none());
        let counts = queue.counts().await.unwrap();
        assert_eq!((counts.delayed, counts.waiting), (1, 0));
    }

    #[tokio::test]
    async fn test_completed_retention_evicts_oldest_records() {
        let queues = queues();
        let queue = &queues.tts;
        let mut ids = Vec::new();
        for _ in 0..12 {
            let added = queue.add("generate-tts", json!({})).await.unwrap();
            ids.push(added.id);
            let job = queue.take().await.unwrap().unwrap();
            queue.complete(job, json!({})).await.unwrap();
        }

        assert_eq!(queue.counts().await.unwrap().completed, 10);
        assert!(queue.get_job(&ids[0]).await.unwrap().is_none());
        assert!(queue.get_job(&ids[1]).await.unwrap().is_none());
        assert!(queue.get_job(&ids[11]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() {
        let queues = queues();
        assert!(queues.pdf.get_job("404").await.unwrap().is_none());
        assert!(queues.ping().await.is_ok());
    }
}
