use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use accord_core::health::{healthz, readiness};
use accord_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{account, admin, oauth, principal::request_context, two_factor};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await.is_ok())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Session
        .route("/account/login", post(account::login))
        .route("/account/logout", get(account::logout))
        .route("/account/whoami", get(account::whoami))
        // Profile
        .route("/account/me", get(account::get_me).put(account::update_me))
        .route("/account/me/password", put(account::update_password))
        .route("/account/clients", get(account::list_my_clients))
        // Token channels
        .route("/account/confirm-email/check", get(account::check_confirm_email))
        .route("/account/confirm-email", post(account::confirm_email))
        .route(
            "/account/request-reconfirm-email",
            post(account::request_reconfirm_email),
        )
        .route(
            "/account/request-reset-password",
            post(account::request_reset_password),
        )
        .route("/account/reset-password/check", get(account::check_reset_password))
        .route("/account/reset-password", post(account::reset_password))
        // Two-factor
        .route("/account/two-factor/setup", post(two_factor::setup))
        .route("/account/two-factor/uri", get(two_factor::provisioning_uri))
        .route("/account/two-factor/confirm-setup", post(two_factor::confirm_setup))
        .route("/account/two-factor/disable", post(two_factor::disable))
        .route("/account/two-factor/login", post(two_factor::login))
        .route(
            "/account/two-factor/request-disable-by-email",
            post(two_factor::request_disable_by_email),
        )
        .route(
            "/account/two-factor/disable-by-email/check",
            get(two_factor::check_disable_by_email),
        )
        .route(
            "/account/two-factor/disable-by-email",
            post(two_factor::disable_by_email),
        )
        .route(
            "/account/external-auth-providers",
            get(account::list_external_auth_providers),
        )
        // OAuth
        .route("/oauth/connect", get(oauth::connect))
        .route("/oauth/token", post(oauth::token))
        .route("/oauth/me", get(oauth::me))
        // Admin: users
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::invite_user),
        )
        .route("/admin/users/init", post(admin::init_user))
        .route(
            "/admin/users/{user_id}",
            get(admin::get_user).delete(admin::delete_user),
        )
        .route("/admin/users/{user_id}/active", put(admin::set_active))
        .route(
            "/admin/users/{user_id}/external-auth",
            put(admin::set_external_auth),
        )
        .route(
            "/admin/users/{user_id}/reconfirm-email",
            post(admin::reconfirm_email),
        )
        .route(
            "/admin/users/{user_id}/login-records",
            get(admin::list_login_records),
        )
        .route("/admin/users/{user_id}/groups", get(admin::list_user_groups))
        // Admin: groups
        .route(
            "/admin/groups",
            get(admin::list_groups).post(admin::create_group),
        )
        .route(
            "/admin/groups/{group_id}",
            get(admin::get_group)
                .put(admin::update_group)
                .delete(admin::delete_group),
        )
        .route(
            "/admin/groups/{group_id}/members",
            get(admin::list_group_members),
        )
        .route(
            "/admin/groups/{group_id}/members/{user_id}",
            put(admin::add_member).delete(admin::remove_member),
        )
        // Admin: OAuth clients
        .route(
            "/admin/clients",
            get(admin::list_clients).post(admin::create_client),
        )
        .route(
            "/admin/clients/{client_id}",
            get(admin::get_client)
                .put(admin::update_client)
                .delete(admin::delete_client),
        )
        .route(
            "/admin/clients/{client_id}/secret",
            post(admin::regenerate_secret),
        )
        .route("/admin/clients/{client_id}/access", put(admin::set_client_access))
        .route("/admin/clients/{client_id}/users", get(admin::list_client_users))
        .layer(from_fn_with_state(state.clone(), request_context))
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
        .with_state(state)
}
