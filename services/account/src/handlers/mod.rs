pub mod account;
pub mod admin;
pub mod oauth;
pub mod principal;
pub mod two_factor;
