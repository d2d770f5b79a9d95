//! sea-orm entities owned by the account service.

pub mod groups;
pub mod login_records;
pub mod oauth_authorizations;
pub mod oauth_client_groups;
pub mod oauth_clients;
pub mod outbox_events;
pub mod user_groups;
pub mod users;
