pub mod account;
pub mod group;
pub mod lockout;
pub mod login;
pub mod oauth;
pub mod password;
pub mod principal;
pub mod token;
pub mod token_channel;
pub mod two_factor;
