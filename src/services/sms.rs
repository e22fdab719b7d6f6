use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::access::{resolve_scope, scoped_condition, ResolvedScope};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::{sms_campaign, voter};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::voters::VoterFilter;

/// Outcome of one gateway batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// The SMS vendor behind one HTTP call surface. Implementations are a
/// black box to the rest of the system; only delivery counts come back.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_batch(
        &self,
        message: &str,
        recipients: &[String],
    ) -> Result<BatchOutcome, ServiceError>;
}

/// HTTP gateway implementation posting JSON batches to the vendor.
pub struct HttpSmsGateway {
    client: reqwest::Client,
    url: String,
    api_key: String,
    sender_id: String,
}

impl HttpSmsGateway {
    pub fn new(url: String, api_key: String, sender_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            sender_id,
        }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send_batch(
        &self,
        message: &str,
        recipients: &[String],
    ) -> Result<BatchOutcome, ServiceError> {
        let payload = serde_json::json!({
            "sender_id": self.sender_id,
            "message": message,
            "to": recipients,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("SMS gateway: {}", e)))?;

        if response.status().is_success() {
            Ok(BatchOutcome {
                delivered: recipients.len(),
                failed: 0,
            })
        } else {
            warn!(status = %response.status(), "SMS gateway rejected batch");
            Ok(BatchOutcome {
                delivered: 0,
                failed: recipients.len(),
            })
        }
    }
}

/// Data for a new campaign. Recipients are the caller's scoped voter
/// set, optionally narrowed further by the filter.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCampaign {
    #[validate(length(min = 1, max = 1000, message = "Message must be between 1 and 1000 characters"))]
    pub message: String,
    #[serde(default)]
    pub filter: VoterFilter,
}

/// Service for SMS campaigns over the caller's scoped voter set
#[derive(Clone)]
pub struct SmsService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    gateway: Option<Arc<dyn SmsGateway>>,
    batch_size: usize,
}

impl SmsService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Option<Arc<dyn SmsGateway>>,
        batch_size: usize,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    /// Creates a campaign and dispatches it to the gateway. With no
    /// gateway configured the campaign stays queued for later dispatch.
    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn create_campaign(
        &self,
        actor: &AuthUser,
        input: NewCampaign,
    ) -> Result<sms_campaign::Model, ServiceError> {
        input.validate()?;

        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let recipients = self.scoped_recipients(&resolved, &input.filter).await?;

        let (target_level, target_anchor_id) = match &resolved {
            ResolvedScope::Unrestricted => (None, None),
            ResolvedScope::Anchored { level, anchor_id } => {
                (Some(level.to_string()), Some(anchor_id.clone()))
            }
        };

        let campaign = sms_campaign::ActiveModel {
            id: Set(Uuid::new_v4()),
            message: Set(input.message.clone()),
            created_by: Set(actor.user_id),
            target_level: Set(target_level),
            target_anchor_id: Set(target_anchor_id),
            status: Set(sms_campaign::STATUS_QUEUED.to_string()),
            recipient_count: Set(recipients.len() as i32),
            delivered_count: Set(0),
            failed_count: Set(0),
            created_at: Set(Utc::now()),
            dispatched_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(campaign_id = %campaign.id, recipients = recipients.len(), "campaign queued");
        if let Err(e) = self.event_sender.send(Event::CampaignQueued(campaign.id)).await {
            error!("Failed to send CampaignQueued event: {}", e);
        }

        match &self.gateway {
            Some(gateway) => self.dispatch(campaign, &input.message, recipients, gateway.clone()).await,
            None => {
                warn!(campaign_id = %campaign.id, "no SMS gateway configured, campaign left queued");
                Ok(campaign)
            }
        }
    }

    /// Gets a campaign by id. Campaigns are readable by their creator;
    /// an unrestricted actor may read any.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn get_campaign(
        &self,
        actor: &AuthUser,
        campaign_id: Uuid,
    ) -> Result<sms_campaign::Model, ServiceError> {
        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let campaign = sms_campaign::Entity::find_by_id(campaign_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Campaign {} not found", campaign_id)))?;

        if campaign.created_by != actor.user_id
            && !matches!(resolved, ResolvedScope::Unrestricted)
        {
            return Err(ServiceError::Forbidden(
                "Campaign belongs to another administrator".to_string(),
            ));
        }

        Ok(campaign)
    }

    /// Lists the caller's campaigns, newest first
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn list_campaigns(
        &self,
        actor: &AuthUser,
        limit: u64,
    ) -> Result<Vec<sms_campaign::Model>, ServiceError> {
        use sea_orm::QueryOrder;
        let campaigns = sms_campaign::Entity::find()
            .filter(sms_campaign::Column::CreatedBy.eq(actor.user_id))
            .order_by_desc(sms_campaign::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?;
        Ok(campaigns)
    }

    /// Phone numbers of every voter in the resolved scope, after the
    /// optional drill-down filter.
    async fn scoped_recipients(
        &self,
        resolved: &ResolvedScope,
        filter: &VoterFilter,
    ) -> Result<Vec<String>, ServiceError> {
        let rows: Vec<(String,)> = voter::Entity::find()
            .select_only()
            .column(voter::Column::Phone)
            .filter(scoped_condition(resolved, filter.condition()))
            .into_tuple()
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(|(phone,)| phone).collect())
    }

    async fn dispatch(
        &self,
        campaign: sms_campaign::Model,
        message: &str,
        recipients: Vec<String>,
        gateway: Arc<dyn SmsGateway>,
    ) -> Result<sms_campaign::Model, ServiceError> {
        let mut outcome = BatchOutcome::default();
        for batch in recipients.chunks(self.batch_size) {
            match gateway.send_batch(message, batch).await {
                Ok(result) => {
                    outcome.delivered += result.delivered;
                    outcome.failed += result.failed;
                }
                Err(e) => {
                    error!(campaign_id = %campaign.id, "SMS batch failed: {}", e);
                    outcome.failed += batch.len();
                }
            }
        }

        // An empty or partially delivered campaign still counts as
        // dispatched; only a total delivery failure marks it failed.
        let status = if outcome.delivered > 0 || outcome.failed == 0 {
            sms_campaign::STATUS_DISPATCHED
        } else {
            sms_campaign::STATUS_FAILED
        };

        let campaign_id = campaign.id;
        let mut active: sms_campaign::ActiveModel = campaign.into();
        active.status = Set(status.to_string());
        active.delivered_count = Set(outcome.delivered as i32);
        active.failed_count = Set(outcome.failed as i32);
        active.dispatched_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(
            campaign_id = %campaign_id,
            delivered = outcome.delivered,
            failed = outcome.failed,
            "campaign dispatched"
        );
        if let Err(e) = self
            .event_sender
            .send(Event::CampaignDispatched {
                campaign_id,
                delivered: outcome.delivered as i32,
                failed: outcome.failed as i32,
            })
            .await
        {
            error!("Failed to send CampaignDispatched event: {}", e);
        }

        Ok(updated)
    }
}
