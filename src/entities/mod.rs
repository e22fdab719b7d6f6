pub mod location;
pub mod sms_campaign;
pub mod user;
pub mod voter;
