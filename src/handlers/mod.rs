pub mod analytics;
pub mod common;
pub mod locations;
pub mod sms;
pub mod users;
pub mod voters;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::CacheBackend;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::locations::LocationStore;
use crate::services::{AnalyticsService, HttpSmsGateway, SmsGateway, SmsService, UserService, VoterService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub voters: Arc<VoterService>,
    pub users: Arc<UserService>,
    pub sms: Arc<SmsService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        locations: Arc<LocationStore>,
        auth: Arc<AuthService>,
        cache: Arc<dyn CacheBackend>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let gateway: Option<Arc<dyn SmsGateway>> =
            match (&config.sms_gateway_url, &config.sms_api_key) {
                (Some(url), Some(key)) => Some(Arc::new(HttpSmsGateway::new(
                    url.clone(),
                    key.clone(),
                    config.sms_sender_id.clone(),
                ))),
                _ => None,
            };

        let voters = Arc::new(VoterService::new(
            db.clone(),
            locations.clone(),
            event_sender.clone(),
        ));
        let users = Arc::new(UserService::new(
            db.clone(),
            locations.clone(),
            auth,
            event_sender.clone(),
        ));
        let sms = Arc::new(SmsService::new(
            db.clone(),
            event_sender,
            gateway,
            config.sms_batch_size,
        ));
        let analytics = Arc::new(AnalyticsService::new(db, locations, cache));

        Self {
            voters,
            users,
            sms,
            analytics,
        }
    }
}
