// ABOUTME: In-process notification queue backed by a bounded tokio channel.
// ABOUTME: The orchestrator enqueues jobs; a worker task drains and delivers them.

use crate::traits::{NotificationJob, NotificationQueue};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receiving half handed to the notification worker
pub type NotificationReceiver = mpsc::Receiver<NotificationJob>;

#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::Sender<NotificationJob>,
}

impl ChannelQueue {
    /// Create a queue holding at most `capacity` undelivered jobs
    pub fn new(capacity: usize) -> (Self, NotificationReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationQueue for ChannelQueue {
    async fn enqueue(&self, job: NotificationJob) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| anyhow::anyhow!("Notification worker closed"))
    }
}

/// Drain jobs until every sender is gone, logging each delivery
pub async fn run_log_worker(mut rx: NotificationReceiver) {
    while let Some(job) = rx.recv().await {
        tracing::info!(
            conversation_id = %job.conversation_id,
            message_id = job.message_id,
            recipient = %job.recipient,
            preview = %job.preview,
            "Notification delivered"
        );
    }
    tracing::debug!("Notification queue closed, worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: i64) -> NotificationJob {
        NotificationJob {
            conversation_id: "c".to_string(),
            message_id: id,
            recipient: "u".to_string(),
            preview: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn test_jobs_arrive_in_order() {
        let (queue, mut rx) = ChannelQueue::new(4);
        queue.enqueue(job(1)).await.unwrap();
        queue.enqueue(job(2)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().message_id, 1);
        assert_eq!(rx.recv().await.unwrap().message_id, 2);
    }

    #[tokio::test]
    async fn test_enqueue_fails_when_worker_gone() {
        let (queue, rx) = ChannelQueue::new(1);
        drop(rx);
        assert!(queue.enqueue(job(1)).await.is_err());
    }
}
