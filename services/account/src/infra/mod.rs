pub mod db;
pub mod external_auth;
