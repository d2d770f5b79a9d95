/// Loads service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-case
/// env vars (`database_url` -> `DATABASE_URL`). Use `#[serde(default = ..)]`
/// for optional settings.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Same as [`Config::from_env`] but every variable carries `prefix`
    /// (e.g. `ACCORD_`).
    fn from_prefixed_env(prefix: &str) -> Result<Self, envy::Error> {
        envy::prefixed(prefix).from_env()
    }
}
