use accord_account::domain::types::{GroupProfileUpdate, OAuthAuthorization};
use accord_account::error::AccountServiceError;
use accord_account::usecase::group::{
    AddMemberUseCase, CreateGroupInput, CreateGroupUseCase, DeleteGroupUseCase, GetGroupUseCase,
    ListGroupMembersUseCase, ListUserGroupsUseCase, RemoveMemberUseCase, UpdateGroupUseCase,
};
use accord_account::usecase::principal::{
    Principal, ResolvePrincipalInput, ResolvePrincipalUseCase, require_admin, require_groups,
    require_login, require_oauth, require_two_factor_session,
};

use crate::helpers::{
    MockAuthorizationRepo, MockClientRepo, MockGroupRepo, MockUserRepo, test_client, test_group,
    test_user,
};

const ACCESS_TOKEN: &str = "access-token-of-bob";

type Resolver =
    ResolvePrincipalUseCase<MockUserRepo, MockClientRepo, MockAuthorizationRepo, MockGroupRepo>;

fn resolver() -> Resolver {
    let authorizations = MockAuthorizationRepo::empty();
    authorizations
        .rows_handle()
        .lock()
        .unwrap()
        .push(OAuthAuthorization {
            client_id: 1,
            user_id: 2,
            authorize_token: None,
            authorize_token_expire_at: None,
            access_token: Some(ACCESS_TOKEN.to_owned()),
        });
    ResolvePrincipalUseCase {
        users: MockUserRepo::new(vec![test_user(1, "alice"), test_user(2, "bob")]),
        clients: MockClientRepo::new(vec![test_client(1, "wiki", true, vec![])]),
        authorizations,
        groups: MockGroupRepo::empty(),
    }
}

// ── Resolution ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_resolve_nothing_without_credentials() {
    let resolved = resolver()
        .execute(ResolvePrincipalInput::default())
        .await
        .unwrap();
    assert!(resolved.principal.is_none());
    assert!(!resolved.stale_session);
}

#[tokio::test]
async fn should_resolve_session_user() {
    let resolved = resolver()
        .execute(ResolvePrincipalInput {
            access_token: None,
            session_user_id: Some(1),
        })
        .await
        .unwrap();
    assert!(
        matches!(resolved.principal, Some(Principal::Session(ref u)) if u.id == 1),
        "expected session principal, got {:?}",
        resolved.principal
    );
}

#[tokio::test]
async fn should_prefer_access_token_over_session() {
    let resolved = resolver()
        .execute(ResolvePrincipalInput {
            access_token: Some(ACCESS_TOKEN.to_owned()),
            session_user_id: Some(1),
        })
        .await
        .unwrap();
    match resolved.principal {
        Some(Principal::OAuth(grant)) => {
            assert_eq!(grant.user.id, 2);
            assert_eq!(grant.client.id, 1);
        }
        other => panic!("expected OAuth principal, got {other:?}"),
    }
}

#[tokio::test]
async fn should_fail_on_invalid_access_token_despite_session() {
    let result = resolver()
        .execute(ResolvePrincipalInput {
            access_token: Some("forged".to_owned()),
            session_user_id: Some(1),
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidAccessToken)),
        "expected InvalidAccessToken, got {result:?}"
    );
}

#[tokio::test]
async fn should_flag_session_of_deleted_user() {
    let resolved = resolver()
        .execute(ResolvePrincipalInput {
            access_token: None,
            session_user_id: Some(77),
        })
        .await
        .unwrap();
    assert!(resolved.principal.is_none());
    assert!(resolved.stale_session);
}

// ── Guards ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_require_active_login() {
    let result = require_login(None);
    assert!(matches!(result, Err(AccountServiceError::LoginRequired)));

    let mut user = test_user(1, "alice");
    user.is_active = false;
    let principal = Principal::Session(user);
    let result = require_login(Some(&principal));
    assert!(matches!(result, Err(AccountServiceError::InactiveUser)));
}

#[tokio::test]
async fn should_require_admin_group() {
    let groups = MockGroupRepo::new(vec![test_group(1, "admin")], vec![(1, 1)]);
    let admin = Principal::Session(test_user(1, "alice"));
    let member = Principal::Session(test_user(2, "bob"));

    let user = require_admin(&groups, Some(&admin)).await.unwrap();
    assert_eq!(user.id, 1);

    let result = require_admin(&groups, Some(&member)).await;
    assert!(
        matches!(result, Err(AccountServiceError::AdminRequired)),
        "expected AdminRequired, got {result:?}"
    );
    let result = require_admin(&groups, None).await;
    assert!(matches!(result, Err(AccountServiceError::LoginRequired)));
}

#[tokio::test]
async fn should_pass_group_guard_on_any_listed_group() {
    let groups = MockGroupRepo::new(
        vec![test_group(1, "ops"), test_group(2, "dev")],
        vec![(2, 1)],
    );
    let dev = Principal::Session(test_user(1, "alice"));
    let outsider = Principal::Session(test_user(2, "bob"));

    require_groups(&groups, Some(&dev), &["ops", "dev"])
        .await
        .unwrap();

    let result = require_groups(&groups, Some(&outsider), &["ops", "dev"]).await;
    match result {
        Err(AccountServiceError::GroupRequired(names)) => assert_eq!(names, "ops/dev"),
        other => panic!("expected GroupRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn should_require_oauth_principal() {
    let session = Principal::Session(test_user(1, "alice"));
    let result = require_oauth(Some(&session));
    assert!(matches!(result, Err(AccountServiceError::OAuthTokenRequired)));
    assert!(matches!(
        require_oauth(None),
        Err(AccountServiceError::OAuthTokenRequired)
    ));

    let resolved = resolver()
        .execute(ResolvePrincipalInput {
            access_token: Some(ACCESS_TOKEN.to_owned()),
            session_user_id: None,
        })
        .await
        .unwrap();
    let grant = require_oauth(resolved.principal.as_ref()).unwrap();
    assert_eq!(grant.user.name, "bob");
}

#[tokio::test]
async fn should_require_live_two_factor_session() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);

    let result = require_two_factor_session(&users, None).await;
    assert!(matches!(
        result,
        Err(AccountServiceError::TwoFactorSessionRequired)
    ));
    let result = require_two_factor_session(&users, Some(9)).await;
    assert!(matches!(
        result,
        Err(AccountServiceError::TwoFactorSessionRequired)
    ));
    let user = require_two_factor_session(&users, Some(1)).await.unwrap();
    assert_eq!(user.name, "alice");
}

// ── Groups ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_unique_valid_groups() {
    let groups = MockGroupRepo::empty();
    let uc = CreateGroupUseCase {
        groups: groups.clone(),
    };

    let created = uc
        .execute(CreateGroupInput {
            name: "staff".to_owned(),
            description: Some("Everyone on payroll".to_owned()),
        })
        .await
        .unwrap();
    assert_eq!(created.description.as_deref(), Some("Everyone on payroll"));

    let result = uc
        .execute(CreateGroupInput {
            name: "staff".to_owned(),
            description: None,
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::DuplicateGroupName)),
        "expected DuplicateGroupName, got {result:?}"
    );

    let result = uc
        .execute(CreateGroupInput {
            name: "no spaces".to_owned(),
            description: None,
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidGroupName)),
        "expected InvalidGroupName, got {result:?}"
    );
}

#[tokio::test]
async fn should_manage_membership() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let groups = MockGroupRepo::new(vec![test_group(1, "staff")], vec![]);
    let add = AddMemberUseCase {
        groups: groups.clone(),
        users: users.clone(),
    };
    let remove = RemoveMemberUseCase {
        groups: groups.clone(),
    };
    let list = ListUserGroupsUseCase {
        groups: groups.clone(),
        users: users.clone(),
    };

    add.execute(1, 1).await.unwrap();
    add.execute(1, 1).await.unwrap();
    assert_eq!(groups.members_handle().lock().unwrap().len(), 1);
    assert_eq!(list.execute(1).await.unwrap(), vec![test_group(1, "staff")]);

    let result = add.execute(1, 5).await;
    assert!(matches!(result, Err(AccountServiceError::UserNotFound)), "got {result:?}");
    let result = add.execute(5, 1).await;
    assert!(matches!(result, Err(AccountServiceError::GroupNotFound)), "got {result:?}");

    remove.execute(1, 1).await.unwrap();
    assert!(list.execute(1).await.unwrap().is_empty());
    let result = remove.execute(1, 1).await;
    assert!(matches!(result, Err(AccountServiceError::UserNotFound)), "got {result:?}");
}

#[tokio::test]
async fn should_drop_memberships_with_group() {
    let groups = MockGroupRepo::new(vec![test_group(1, "staff")], vec![(1, 1)]);
    let uc = DeleteGroupUseCase {
        groups: groups.clone(),
    };

    uc.execute(1).await.unwrap();
    assert!(groups.members_handle().lock().unwrap().is_empty());
    let result = uc.execute(1).await;
    assert!(
        matches!(result, Err(AccountServiceError::GroupNotFound)),
        "expected GroupNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_update_group_description_only() {
    let groups = MockGroupRepo::new(vec![test_group(1, "staff")], vec![]);
    let update = UpdateGroupUseCase {
        groups: groups.clone(),
    };
    let get = GetGroupUseCase {
        groups: groups.clone(),
    };

    let result = update.execute(1, GroupProfileUpdate::default()).await;
    assert!(
        matches!(result, Err(AccountServiceError::MissingData)),
        "expected MissingData, got {result:?}"
    );

    let result = update
        .execute(
            1,
            GroupProfileUpdate {
                description: Some(Some("x".repeat(10_000))),
            },
        )
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidDescription)),
        "expected InvalidDescription, got {result:?}"
    );

    let updated = update
        .execute(
            1,
            GroupProfileUpdate {
                description: Some(Some("Everyone on payroll".to_owned())),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "staff");
    assert_eq!(
        get.execute(1).await.unwrap().description.as_deref(),
        Some("Everyone on payroll")
    );

    update
        .execute(1, GroupProfileUpdate { description: Some(None) })
        .await
        .unwrap();
    assert!(get.execute(1).await.unwrap().description.is_none());

    let result = get.execute(5).await;
    assert!(matches!(result, Err(AccountServiceError::GroupNotFound)), "got {result:?}");
    let result = update
        .execute(5, GroupProfileUpdate { description: Some(None) })
        .await;
    assert!(matches!(result, Err(AccountServiceError::GroupNotFound)), "got {result:?}");
}

#[tokio::test]
async fn should_list_group_members_in_id_order() {
    let users = MockUserRepo::new(vec![
        test_user(1, "alice"),
        test_user(2, "bob"),
        test_user(3, "carol"),
    ]);
    let groups = MockGroupRepo::new(
        vec![test_group(1, "staff"), test_group(2, "empty")],
        vec![(1, 3), (1, 1), (2, 2)],
    );
    let uc = ListGroupMembersUseCase {
        groups: groups.clone(),
        users,
    };

    let names: Vec<_> = uc
        .execute(1)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, ["alice", "carol"]);

    groups.members_handle().lock().unwrap().clear();
    assert!(uc.execute(2).await.unwrap().is_empty());

    let result = uc.execute(9).await;
    assert!(
        matches!(result, Err(AccountServiceError::GroupNotFound)),
        "expected GroupNotFound, got {result:?}"
    );
}
