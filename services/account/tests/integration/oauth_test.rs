use chrono::{DateTime, Duration, Utc};

use accord_account::domain::repository::OAuthAuthorizationRepository;
use accord_account::domain::types::{ClientProfileUpdate, OAuthAuthorization};
use accord_account::error::AccountServiceError;
use accord_account::usecase::oauth::{
    ClearUserTokensUseCase, CreateClientInput, CreateClientUseCase, GetAccessTokenInput,
    GetAccessTokenUseCase, GetClientsForUserUseCase, ListClientUsersUseCase,
    RegenerateSecretUseCase, SetClientAccessInput, SetClientAccessUseCase,
    StartAuthorizationInput, StartAuthorizationUseCase, UpdateClientUseCase,
    VerifyAccessTokenUseCase,
};

use crate::helpers::{
    MockAuthorizationRepo, MockClientRepo, MockGroupRepo, MockUserRepo, TEST_CLIENT_SECRET,
    TEST_REDIRECT_URL, test_client, test_group, test_user,
};

const ALICE: i32 = 1;
const BOB: i32 = 2;
const STAFF: i32 = 1;
const RESTRICTED: i32 = 1;
const PUBLIC: i32 = 2;

/// alice is in "staff", bob is in no group. Client 1 admits "staff" only,
/// client 2 is public.
struct Fixture {
    users: MockUserRepo,
    groups: MockGroupRepo,
    clients: MockClientRepo,
    authorizations: MockAuthorizationRepo,
}

impl Fixture {
    fn new() -> Self {
        Self {
            users: MockUserRepo::new(vec![test_user(ALICE, "alice"), test_user(BOB, "bob")]),
            groups: MockGroupRepo::new(vec![test_group(STAFF, "staff")], vec![(STAFF, ALICE)]),
            clients: MockClientRepo::new(vec![
                test_client(RESTRICTED, "intranet", false, vec![STAFF]),
                test_client(PUBLIC, "wiki", true, vec![]),
            ]),
            authorizations: MockAuthorizationRepo::empty(),
        }
    }

    async fn start(
        &self,
        user_id: i32,
        client_id: i32,
        redirect_url: &str,
    ) -> Result<String, AccountServiceError> {
        let user = self.users.get(user_id);
        StartAuthorizationUseCase {
            clients: self.clients.clone(),
            authorizations: self.authorizations.clone(),
            groups: self.groups.clone(),
        }
        .execute(
            &user,
            StartAuthorizationInput {
                client_id,
                redirect_url: redirect_url.to_owned(),
            },
        )
        .await
        .map(|a| a.authorize_token)
    }

    async fn exchange(&self, client_id: i32, code: &str) -> Result<String, AccountServiceError> {
        self.exchange_with(client_id, TEST_CLIENT_SECRET, TEST_REDIRECT_URL, code)
            .await
    }

    async fn exchange_with(
        &self,
        client_id: i32,
        secret: &str,
        redirect_url: &str,
        code: &str,
    ) -> Result<String, AccountServiceError> {
        GetAccessTokenUseCase {
            clients: self.clients.clone(),
            authorizations: self.authorizations.clone(),
            users: self.users.clone(),
            groups: self.groups.clone(),
        }
        .execute(GetAccessTokenInput {
            client_id,
            secret: secret.to_owned(),
            redirect_url: redirect_url.to_owned(),
            code: code.to_owned(),
        })
        .await
    }

    fn verifier(
        &self,
    ) -> VerifyAccessTokenUseCase<MockClientRepo, MockAuthorizationRepo, MockUserRepo, MockGroupRepo>
    {
        VerifyAccessTokenUseCase {
            clients: self.clients.clone(),
            authorizations: self.authorizations.clone(),
            users: self.users.clone(),
            groups: self.groups.clone(),
        }
    }
}

// ── Authorization code flow ──────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_code_on_registered_redirect() {
    let fx = Fixture::new();
    let user = fx.users.get(ALICE);

    let authorization = StartAuthorizationUseCase {
        clients: fx.clients.clone(),
        authorizations: fx.authorizations.clone(),
        groups: fx.groups.clone(),
    }
    .execute(
        &user,
        StartAuthorizationInput {
            client_id: RESTRICTED,
            redirect_url: TEST_REDIRECT_URL.to_owned(),
        },
    )
    .await
    .unwrap();

    assert_eq!(
        authorization.redirect_to,
        format!("{TEST_REDIRECT_URL}?code={}", authorization.authorize_token)
    );
    let row = fx.authorizations.row(RESTRICTED, ALICE).unwrap();
    assert_eq!(
        row.authorize_token.as_deref(),
        Some(authorization.authorize_token.as_str())
    );
    assert!(row.authorize_token_expire_at.unwrap() > Utc::now());
    assert!(row.access_token.is_none());
}

#[tokio::test]
async fn should_exchange_code_once() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();

    let access_token = fx.exchange(RESTRICTED, &code).await.unwrap();
    let row = fx.authorizations.row(RESTRICTED, ALICE).unwrap();
    assert_eq!(row.access_token.as_deref(), Some(access_token.as_str()));
    assert!(row.authorize_token.is_none());
    assert!(row.authorize_token_expire_at.is_none());

    let result = fx.exchange(RESTRICTED, &code).await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidToken)),
        "expected InvalidToken, got {result:?}"
    );

    let grant = fx.verifier().execute(&access_token).await.unwrap();
    assert_eq!(grant.user.id, ALICE);
    assert_eq!(grant.client.id, RESTRICTED);
}

#[tokio::test]
async fn should_invalidate_previous_code_on_restart() {
    let fx = Fixture::new();
    let first = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    let second = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    assert_ne!(first, second);

    let result = fx.exchange(RESTRICTED, &first).await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidToken)),
        "expected InvalidToken, got {result:?}"
    );
    fx.exchange(RESTRICTED, &second).await.unwrap();
}

#[tokio::test]
async fn should_keep_access_token_when_restarting_authorization() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    let access_token = fx.exchange(RESTRICTED, &code).await.unwrap();

    fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    fx.verifier().execute(&access_token).await.unwrap();
}

#[tokio::test]
async fn should_reject_mismatched_redirect() {
    let fx = Fixture::new();
    let result = fx
        .start(ALICE, RESTRICTED, "https://app.example.com/callback/")
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::RedirectMismatch)),
        "expected RedirectMismatch, got {result:?}"
    );
    assert!(fx.authorizations.row(RESTRICTED, ALICE).is_none());

    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    let result = fx
        .exchange_with(RESTRICTED, TEST_CLIENT_SECRET, "https://evil.example.com/", &code)
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::RedirectMismatch)),
        "expected RedirectMismatch, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_wrong_client_secret() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();

    let result = fx
        .exchange_with(RESTRICTED, "not-the-secret", TEST_REDIRECT_URL, &code)
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::WrongSecret)),
        "expected WrongSecret, got {result:?}"
    );
    // The code survives a failed exchange.
    fx.exchange(RESTRICTED, &code).await.unwrap();
}

#[tokio::test]
async fn should_reject_expired_code() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    {
        let rows = fx.authorizations.rows_handle();
        let mut rows = rows.lock().unwrap();
        rows[0].authorize_token_expire_at = Some(Utc::now() - Duration::seconds(1));
    }

    let result = fx.exchange(RESTRICTED, &code).await;
    assert!(
        matches!(result, Err(AccountServiceError::TokenExpired)),
        "expected TokenExpired, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_unknown_client() {
    let fx = Fixture::new();
    let result = fx.start(ALICE, 99, TEST_REDIRECT_URL).await;
    assert!(
        matches!(result, Err(AccountServiceError::ClientNotFound)),
        "expected ClientNotFound, got {result:?}"
    );
}

/// Lets a rival exchange redeem the code right after it has been looked up.
#[derive(Clone)]
struct RacedAuthorizations {
    inner: MockAuthorizationRepo,
    rival_token: &'static str,
}

impl OAuthAuthorizationRepository for RacedAuthorizations {
    async fn find_by_authorize_token(
        &self,
        client_id: i32,
        token: &str,
    ) -> Result<Option<OAuthAuthorization>, AccountServiceError> {
        let found = self.inner.find_by_authorize_token(client_id, token).await?;
        if let Some(ref row) = found {
            let redeemed = self
                .inner
                .redeem_authorize_token(row.client_id, row.user_id, token, self.rival_token)
                .await?;
            assert!(redeemed);
        }
        Ok(found)
    }

    async fn find_by_access_token(
        &self,
        token: &str,
    ) -> Result<Option<OAuthAuthorization>, AccountServiceError> {
        self.inner.find_by_access_token(token).await
    }

    async fn authorize_token_exists(&self, token: &str) -> Result<bool, AccountServiceError> {
        self.inner.authorize_token_exists(token).await
    }

    async fn access_token_exists(&self, token: &str) -> Result<bool, AccountServiceError> {
        self.inner.access_token_exists(token).await
    }

    async fn upsert_authorize_token(
        &self,
        client_id: i32,
        user_id: i32,
        token: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), AccountServiceError> {
        self.inner
            .upsert_authorize_token(client_id, user_id, token, expire_at)
            .await
    }

    async fn redeem_authorize_token(
        &self,
        client_id: i32,
        user_id: i32,
        code: &str,
        access_token: &str,
    ) -> Result<bool, AccountServiceError> {
        self.inner
            .redeem_authorize_token(client_id, user_id, code, access_token)
            .await
    }

    async fn clear_user_tokens(&self, user_id: i32) -> Result<u64, AccountServiceError> {
        self.inner.clear_user_tokens(user_id).await
    }

    async fn user_ids_for_client(&self, client_id: i32) -> Result<Vec<i32>, AccountServiceError> {
        self.inner.user_ids_for_client(client_id).await
    }
}

#[tokio::test]
async fn should_redeem_code_only_once_under_concurrent_exchange() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();

    let result = GetAccessTokenUseCase {
        clients: fx.clients.clone(),
        authorizations: RacedAuthorizations {
            inner: fx.authorizations.clone(),
            rival_token: "rival-access-token",
        },
        users: fx.users.clone(),
        groups: fx.groups.clone(),
    }
    .execute(GetAccessTokenInput {
        client_id: RESTRICTED,
        secret: TEST_CLIENT_SECRET.to_owned(),
        redirect_url: TEST_REDIRECT_URL.to_owned(),
        code,
    })
    .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidToken)),
        "expected InvalidToken, got {result:?}"
    );

    // The rival's token is the one that stands.
    let row = fx.authorizations.row(RESTRICTED, ALICE).unwrap();
    assert_eq!(row.access_token.as_deref(), Some("rival-access-token"));
    let grant = fx.verifier().execute("rival-access-token").await.unwrap();
    assert_eq!(grant.user.id, ALICE);
}

#[tokio::test]
async fn should_authorize_client_with_non_absolute_redirect() {
    let fx = Fixture::new();
    let client = CreateClientUseCase {
        clients: fx.clients.clone(),
    }
    .execute(CreateClientInput {
        name: "native".to_owned(),
        redirect_url: "myapp/callback".to_owned(),
        home_url: None,
        description: None,
    })
    .await
    .unwrap();
    SetClientAccessUseCase {
        clients: fx.clients.clone(),
        groups: fx.groups.clone(),
    }
    .execute(
        client.id,
        SetClientAccessInput {
            is_public: true,
            allowed_group_ids: vec![],
        },
    )
    .await
    .unwrap();

    let user = fx.users.get(ALICE);
    let authorization = StartAuthorizationUseCase {
        clients: fx.clients.clone(),
        authorizations: fx.authorizations.clone(),
        groups: fx.groups.clone(),
    }
    .execute(
        &user,
        StartAuthorizationInput {
            client_id: client.id,
            redirect_url: "myapp/callback".to_owned(),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        authorization.redirect_to,
        format!("myapp/callback?code={}", authorization.authorize_token)
    );
}

// ── Eligibility ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_deny_user_outside_allowed_groups() {
    let fx = Fixture::new();
    let result = fx.start(BOB, RESTRICTED, TEST_REDIRECT_URL).await;
    assert!(
        matches!(result, Err(AccountServiceError::PermissionDenied)),
        "expected PermissionDenied, got {result:?}"
    );
    assert!(fx.authorizations.row(RESTRICTED, BOB).is_none());

    // Anyone active may use the public client.
    fx.start(BOB, PUBLIC, TEST_REDIRECT_URL).await.unwrap();
}

#[tokio::test]
async fn should_deny_access_token_after_membership_revoked() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    let access_token = fx.exchange(RESTRICTED, &code).await.unwrap();

    fx.groups
        .members_handle()
        .lock()
        .unwrap()
        .retain(|m| *m != (STAFF, ALICE));

    let result = fx.verifier().execute(&access_token).await;
    assert!(
        matches!(result, Err(AccountServiceError::PermissionDenied)),
        "expected PermissionDenied, got {result:?}"
    );
}

#[tokio::test]
async fn should_deny_exchange_for_deactivated_user() {
    let fx = Fixture::new();
    let code = fx.start(BOB, PUBLIC, TEST_REDIRECT_URL).await.unwrap();
    fx.users.modify(BOB, |u| u.is_active = false);

    let result = fx.exchange(PUBLIC, &code).await;
    assert!(
        matches!(result, Err(AccountServiceError::InactiveUser)),
        "expected InactiveUser, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_unknown_access_token() {
    let fx = Fixture::new();
    let result = fx.verifier().execute("no-such-token").await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidAccessToken)),
        "expected InvalidAccessToken, got {result:?}"
    );
}

#[tokio::test]
async fn should_revoke_every_token_of_user() {
    let fx = Fixture::new();
    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    let restricted_token = fx.exchange(RESTRICTED, &code).await.unwrap();
    let code = fx.start(ALICE, PUBLIC, TEST_REDIRECT_URL).await.unwrap();
    let public_token = fx.exchange(PUBLIC, &code).await.unwrap();
    let pending = fx.start(BOB, PUBLIC, TEST_REDIRECT_URL).await.unwrap();

    ClearUserTokensUseCase {
        authorizations: fx.authorizations.clone(),
    }
    .execute(ALICE)
    .await
    .unwrap();

    for token in [&restricted_token, &public_token] {
        let result = fx.verifier().execute(token).await;
        assert!(
            matches!(result, Err(AccountServiceError::InvalidAccessToken)),
            "expected InvalidAccessToken, got {result:?}"
        );
    }
    // Other users keep their grants.
    fx.exchange(PUBLIC, &pending).await.unwrap();
}

#[tokio::test]
async fn should_list_clients_usable_by_user() {
    let fx = Fixture::new();
    let uc = GetClientsForUserUseCase {
        clients: fx.clients.clone(),
        groups: fx.groups.clone(),
    };

    let ids = |clients: Vec<accord_account::domain::types::OAuthClient>| {
        clients.into_iter().map(|c| c.id).collect::<Vec<_>>()
    };
    assert_eq!(
        ids(uc.execute(&fx.users.get(ALICE)).await.unwrap()),
        vec![RESTRICTED, PUBLIC]
    );
    assert_eq!(ids(uc.execute(&fx.users.get(BOB)).await.unwrap()), vec![PUBLIC]);
}

// ── Client management ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_client_with_generated_secret() {
    let clients = MockClientRepo::empty();
    let uc = CreateClientUseCase {
        clients: clients.clone(),
    };

    let created = uc
        .execute(CreateClientInput {
            name: "tracker".to_owned(),
            redirect_url: TEST_REDIRECT_URL.to_owned(),
            home_url: Some("https://tracker.example.com".to_owned()),
            description: None,
        })
        .await
        .unwrap();
    assert!(!created.is_public);
    assert!(created.allowed_group_ids.is_empty());
    assert!(created.secret.len() >= 32);

    let result = uc
        .execute(CreateClientInput {
            name: "tracker".to_owned(),
            redirect_url: TEST_REDIRECT_URL.to_owned(),
            home_url: None,
            description: None,
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::DuplicateClientName)),
        "expected DuplicateClientName, got {result:?}"
    );

    let result = uc
        .execute(CreateClientInput {
            name: "other".to_owned(),
            redirect_url: String::new(),
            home_url: None,
            description: None,
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidUrl("redirect_url"))),
        "expected InvalidUrl, got {result:?}"
    );
}

#[tokio::test]
async fn should_update_client_profile_and_rotate_secret() {
    let fx = Fixture::new();
    let uc = UpdateClientUseCase {
        clients: fx.clients.clone(),
    };

    let result = uc.execute(RESTRICTED, ClientProfileUpdate::default()).await;
    assert!(
        matches!(result, Err(AccountServiceError::MissingData)),
        "expected MissingData, got {result:?}"
    );

    let updated = uc
        .execute(
            RESTRICTED,
            ClientProfileUpdate {
                description: Some(Some("Internal tools".to_owned())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("Internal tools"));
    assert_eq!(
        fx.clients.get(RESTRICTED).unwrap().allowed_group_ids,
        vec![STAFF]
    );

    let rotated = RegenerateSecretUseCase {
        clients: fx.clients.clone(),
    }
    .execute(RESTRICTED)
    .await
    .unwrap();
    assert_ne!(rotated.secret, TEST_CLIENT_SECRET);

    let code = fx.start(ALICE, RESTRICTED, TEST_REDIRECT_URL).await.unwrap();
    let result = fx.exchange(RESTRICTED, &code).await;
    assert!(
        matches!(result, Err(AccountServiceError::WrongSecret)),
        "expected WrongSecret, got {result:?}"
    );
}

#[tokio::test]
async fn should_set_client_access_with_known_groups_only() {
    let fx = Fixture::new();
    let uc = SetClientAccessUseCase {
        clients: fx.clients.clone(),
        groups: fx.groups.clone(),
    };

    let result = uc
        .execute(
            PUBLIC,
            SetClientAccessInput {
                is_public: false,
                allowed_group_ids: vec![STAFF, 42],
            },
        )
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::GroupNotFound)),
        "expected GroupNotFound, got {result:?}"
    );
    assert!(fx.clients.get(PUBLIC).unwrap().is_public);

    uc.execute(
        PUBLIC,
        SetClientAccessInput {
            is_public: false,
            allowed_group_ids: vec![STAFF, STAFF],
        },
    )
    .await
    .unwrap();
    let stored = fx.clients.get(PUBLIC).unwrap();
    assert!(!stored.is_public);
    assert_eq!(stored.allowed_group_ids, vec![STAFF]);

    let result = fx.start(BOB, PUBLIC, TEST_REDIRECT_URL).await;
    assert!(
        matches!(result, Err(AccountServiceError::PermissionDenied)),
        "expected PermissionDenied, got {result:?}"
    );
}

#[tokio::test]
async fn should_list_users_holding_grants() {
    let fx = Fixture::new();
    fx.start(BOB, PUBLIC, TEST_REDIRECT_URL).await.unwrap();
    fx.start(ALICE, PUBLIC, TEST_REDIRECT_URL).await.unwrap();

    let users = ListClientUsersUseCase {
        clients: fx.clients.clone(),
        authorizations: fx.authorizations.clone(),
        users: fx.users.clone(),
    }
    .execute(PUBLIC)
    .await
    .unwrap();
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![ALICE, BOB]);
}
