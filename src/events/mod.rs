use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Voter events
    VoterCreated(Uuid),
    VoterUpdated(Uuid),
    VoterDeleted(Uuid),

    // User lifecycle events
    UserRegistered(Uuid),
    UserApproved {
        user_id: Uuid,
        approved_by: Uuid,
        role: String,
    },
    UserRejected {
        user_id: Uuid,
        rejected_by: Uuid,
    },
    ScopeReassigned {
        user_id: Uuid,
        reassigned_by: Uuid,
    },

    // SMS campaign events
    CampaignQueued(Uuid),
    CampaignDispatched {
        campaign_id: Uuid,
        delivered: i32,
        failed: i32,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

// Drains the event channel and fans events out to the log and metrics.
// Runs for the lifetime of the server as a background task.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::VoterCreated(id) => {
                info!(voter_id = %id, "voter created");
                metrics::counter!("voterbase_events.voter_created", 1);
            }
            Event::VoterUpdated(id) => {
                info!(voter_id = %id, "voter updated");
            }
            Event::VoterDeleted(id) => {
                info!(voter_id = %id, "voter deleted");
                metrics::counter!("voterbase_events.voter_deleted", 1);
            }
            Event::UserRegistered(id) => {
                info!(user_id = %id, "user registered, pending approval");
            }
            Event::UserApproved {
                user_id,
                approved_by,
                role,
            } => {
                info!(user_id = %user_id, approved_by = %approved_by, role = %role, "user approved");
            }
            Event::UserRejected {
                user_id,
                rejected_by,
            } => {
                info!(user_id = %user_id, rejected_by = %rejected_by, "user rejected");
            }
            Event::ScopeReassigned {
                user_id,
                reassigned_by,
            } => {
                info!(user_id = %user_id, reassigned_by = %reassigned_by, "access scope reassigned");
            }
            Event::CampaignQueued(id) => {
                info!(campaign_id = %id, "sms campaign queued");
            }
            Event::CampaignDispatched {
                campaign_id,
                delivered,
                failed,
            } => {
                info!(campaign_id = %campaign_id, delivered, failed, "sms campaign dispatched");
                metrics::counter!("voterbase_events.sms_delivered", *delivered as u64);
                if *failed > 0 {
                    error!(campaign_id = %campaign_id, failed, "sms deliveries failed");
                }
            }
            Event::Generic { message, .. } => {
                info!(message = %message, "generic event");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let id = Uuid::new_v4();
        sender.send(Event::VoterCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::VoterCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::with_data("x".into())).await.is_err());
    }
}
