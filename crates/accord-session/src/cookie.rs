//! Cookie builders for the login session and the pending two-factor session.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::claims::{REMEMBERED_SESSION_TTL, TWO_FACTOR_SESSION_TTL};

/// Cookie name for the login session.
pub const SESSION_COOKIE: &str = "accord_session";

/// Cookie name for the pending two-factor session.
pub const TWO_FACTOR_COOKIE: &str = "accord_two_factor";

/// Attributes shared by every cookie the service sets.
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    /// `Domain` attribute; host-only cookie when `None`.
    pub domain: Option<String>,
    /// Send with `Secure`. Disable only for plain-HTTP development.
    pub secure: bool,
}

fn build(name: &'static str, value: String, settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .build();
    if let Some(domain) = &settings.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Set the login session cookie. A remembered session survives browser
/// restarts; otherwise the cookie has no `Max-Age`.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use accord_session::cookie::{set_session_cookie, CookieSettings, SESSION_COOKIE};
///
/// let settings = CookieSettings { domain: Some("example.com".into()), secure: true };
/// let jar = set_session_cookie(CookieJar::new(), "token".to_string(), true, &settings);
/// let cookie = jar.get(SESSION_COOKIE).unwrap();
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(2592000)));
/// assert!(cookie.http_only().unwrap_or(false));
/// ```
pub fn set_session_cookie(
    jar: CookieJar,
    value: String,
    remember: bool,
    settings: &CookieSettings,
) -> CookieJar {
    let mut cookie = build(SESSION_COOKIE, value, settings);
    if remember {
        cookie.set_max_age(Duration::seconds(REMEMBERED_SESSION_TTL as i64));
    }
    jar.add(cookie)
}

/// Set the pending two-factor cookie (5 minutes).
pub fn set_two_factor_cookie(jar: CookieJar, value: String, settings: &CookieSettings) -> CookieJar {
    let mut cookie = build(TWO_FACTOR_COOKIE, value, settings);
    cookie.set_max_age(Duration::seconds(TWO_FACTOR_SESSION_TTL as i64));
    jar.add(cookie)
}

/// Expire the login session cookie.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use accord_session::cookie::{clear_session_cookie, set_session_cookie, CookieSettings, SESSION_COOKIE};
///
/// let settings = CookieSettings::default();
/// let jar = set_session_cookie(CookieJar::new(), "t".to_string(), false, &settings);
/// let jar = clear_session_cookie(jar, &settings);
/// assert_eq!(jar.get(SESSION_COOKIE).unwrap().max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    let mut cookie = build(SESSION_COOKIE, String::new(), settings);
    cookie.set_max_age(Duration::ZERO);
    jar.add(cookie)
}

/// Expire the pending two-factor cookie.
pub fn clear_two_factor_cookie(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    let mut cookie = build(TWO_FACTOR_COOKIE, String::new(), settings);
    cookie.set_max_age(Duration::ZERO);
    jar.add(cookie)
}
