/*!
 * # Services Module
 *
 * Business logic behind the HTTP handlers. Every service takes its
 * dependencies by `Arc` and clones cheaply; all read and write paths
 * over voter data go through the access layer's scope resolution.
 */

pub mod analytics;
pub mod sms;
pub mod users;
pub mod voters;

pub use analytics::AnalyticsService;
pub use sms::{HttpSmsGateway, SmsGateway, SmsService};
pub use users::UserService;
pub use voters::VoterService;
