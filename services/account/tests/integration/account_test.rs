use chrono::{Duration, Utc};

use accord_account::domain::types::{ProfileUpdate, TokenChannel};
use accord_account::error::AccountServiceError;
use accord_account::usecase::account::{
    AdminReconfirmEmailUseCase, CheckChannelTokenUseCase, ConfirmEmailUseCase, ConsumeTokenInput,
    DisableTwoFactorByEmailUseCase, InitUserInput, InitUserUseCase, InviteUserInput,
    InviteUserUseCase, ListLoginRecordsUseCase, RequestDisableTwoFactorByEmailUseCase,
    RequestReconfirmEmailUseCase, RequestResetPasswordUseCase, ResetPasswordUseCase,
    SetExternalAuthInput, SetExternalAuthUseCase, UpdatePasswordInput, UpdatePasswordUseCase,
    UpdateProfileUseCase,
};
use accord_account::usecase::password::verify_password;
use accord_account::usecase::two_factor;

use crate::helpers::{
    MockExternalAuth, MockLoginRecordRepo, MockOutboxRepo, MockUserRepo, TEST_PASSWORD, Verdict,
    failed_record, test_user,
};

const NEW_PASSWORD: &str = "fresh-secret-77";

fn consume(user_id: i32, token: &str) -> ConsumeTokenInput {
    ConsumeTokenInput {
        user_id,
        token: token.to_owned(),
        new_password: NEW_PASSWORD.to_owned(),
    }
}

// ── Invite / confirm ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_invite_unconfirmed_user_with_one_live_token() {
    let users = MockUserRepo::empty();
    let outbox = MockOutboxRepo::empty();
    let events = outbox.events_handle();

    let invited = InviteUserUseCase {
        users: users.clone(),
        outbox,
    }
    .execute(InviteUserInput {
        name: "dave".to_owned(),
        email: "dave@example.com".to_owned(),
    })
    .await
    .unwrap();

    let stored = users.get(invited.id);
    assert!(!stored.is_email_confirmed);
    let token = stored.email_confirm_token.clone().expect("confirm token set");
    assert_eq!(token.len(), 43);
    assert!(stored.email_confirm_token_expire_at.unwrap() > Utc::now());
    assert!(
        !verify_password(TEST_PASSWORD, &stored.password_hash),
        "invited accounts carry an unusable password"
    );

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "mail.confirm_email");
    assert_eq!(events[0].payload["recipient"], "dave@example.com");
    assert_eq!(events[0].payload["variables"]["token"], token.as_str());
}

#[tokio::test]
async fn should_reject_duplicate_or_malformed_invites() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let uc = InviteUserUseCase {
        users,
        outbox: MockOutboxRepo::empty(),
    };

    let result = uc
        .execute(InviteUserInput {
            name: "alice".to_owned(),
            email: "other@example.com".to_owned(),
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::DuplicateName)),
        "expected DuplicateName, got {result:?}"
    );

    let result = uc
        .execute(InviteUserInput {
            name: "alice2".to_owned(),
            email: "alice@example.com".to_owned(),
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::DuplicateEmail)),
        "expected DuplicateEmail, got {result:?}"
    );

    let result = uc
        .execute(InviteUserInput {
            name: "al".to_owned(),
            email: "al@example.com".to_owned(),
        })
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidName)),
        "expected InvalidName, got {result:?}"
    );
}

#[tokio::test]
async fn should_confirm_email_exactly_once() {
    let users = MockUserRepo::empty();
    let invited = InviteUserUseCase {
        users: users.clone(),
        outbox: MockOutboxRepo::empty(),
    }
    .execute(InviteUserInput {
        name: "dave".to_owned(),
        email: "dave@example.com".to_owned(),
    })
    .await
    .unwrap();
    let token = invited.email_confirm_token.clone().unwrap();

    let uc = ConfirmEmailUseCase {
        users: users.clone(),
    };
    uc.execute(consume(invited.id, &token)).await.unwrap();

    let stored = users.get(invited.id);
    assert!(stored.is_email_confirmed);
    assert!(stored.email_confirmed_at.is_some());
    assert!(stored.email_confirm_token.is_none());
    assert!(stored.email_confirm_token_expire_at.is_none());
    assert!(verify_password(NEW_PASSWORD, &stored.password_hash));

    let result = uc.execute(consume(invited.id, &token)).await;
    assert!(
        matches!(result, Err(AccountServiceError::AlreadyConfirmed)),
        "expected AlreadyConfirmed, got {result:?}"
    );
}

#[tokio::test]
async fn should_validate_new_password_before_confirming() {
    let mut user = test_user(1, "dave");
    user.is_email_confirmed = false;
    user.email_confirm_token = Some("tok".to_owned());
    user.email_confirm_token_expire_at = Some(Utc::now() + Duration::hours(1));
    let users = MockUserRepo::new(vec![user]);

    let result = ConfirmEmailUseCase {
        users: users.clone(),
    }
    .execute(ConsumeTokenInput {
        user_id: 1,
        token: "tok".to_owned(),
        new_password: "short".to_owned(),
    })
    .await;
    assert!(
        matches!(result, Err(AccountServiceError::InvalidPassword)),
        "expected InvalidPassword, got {result:?}"
    );
    assert!(!users.get(1).is_email_confirmed);
}

#[tokio::test]
async fn should_check_tokens_in_order() {
    let now = Utc::now();
    let mut inactive = test_user(1, "alice");
    inactive.is_active = false;
    let confirmed = test_user(2, "bob");
    let mut no_request = test_user(3, "carol");
    no_request.is_email_confirmed = false;
    let mut pending = test_user(4, "dave");
    pending.is_email_confirmed = false;
    pending.email_confirm_token = Some("right".to_owned());
    pending.email_confirm_token_expire_at = Some(now + Duration::hours(1));
    let mut expired = test_user(5, "erin");
    expired.is_email_confirmed = false;
    expired.email_confirm_token = Some("right".to_owned());
    expired.email_confirm_token_expire_at = Some(now - Duration::seconds(1));

    let uc = CheckChannelTokenUseCase {
        users: MockUserRepo::new(vec![inactive, confirmed, no_request, pending, expired]),
    };
    let result = uc.execute(TokenChannel::EmailConfirm, 1, "right").await;
    assert!(matches!(result, Err(AccountServiceError::InactiveUser)), "got {result:?}");
    let result = uc.execute(TokenChannel::EmailConfirm, 2, "right").await;
    assert!(matches!(result, Err(AccountServiceError::AlreadyConfirmed)), "got {result:?}");
    let result = uc.execute(TokenChannel::EmailConfirm, 3, "right").await;
    assert!(matches!(result, Err(AccountServiceError::NoActiveRequest)), "got {result:?}");
    let result = uc.execute(TokenChannel::EmailConfirm, 4, "wrong").await;
    assert!(matches!(result, Err(AccountServiceError::InvalidToken)), "got {result:?}");
    let result = uc.execute(TokenChannel::EmailConfirm, 5, "right").await;
    assert!(matches!(result, Err(AccountServiceError::TokenExpired)), "got {result:?}");
    uc.execute(TokenChannel::EmailConfirm, 4, "right").await.unwrap();
    let result = uc.execute(TokenChannel::EmailConfirm, 99, "right").await;
    assert!(matches!(result, Err(AccountServiceError::UserNotFound)), "got {result:?}");
}

#[tokio::test]
async fn should_unconfirm_and_reissue_on_reconfirm_request() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let outbox = MockOutboxRepo::empty();
    let events = outbox.events_handle();

    RequestReconfirmEmailUseCase {
        users: users.clone(),
        outbox,
    }
    .execute("alice@example.com")
    .await
    .unwrap();

    let stored = users.get(1);
    assert!(!stored.is_email_confirmed);
    assert!(stored.email_confirmed_at.is_none());
    assert!(stored.email_confirm_token.is_some());
    assert_eq!(events.lock().unwrap()[0].kind, "mail.confirm_email");
}

#[tokio::test]
async fn should_force_reconfirm_without_request_wait() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let outbox = MockOutboxRepo::empty();
    let events = outbox.events_handle();

    RequestReconfirmEmailUseCase {
        users: users.clone(),
        outbox: outbox.clone(),
    }
    .execute("alice")
    .await
    .unwrap();
    let first = users.get(1).email_confirm_token.unwrap();

    let forced = AdminReconfirmEmailUseCase {
        users: users.clone(),
        outbox,
    };
    forced.execute(1).await.unwrap();

    let stored = users.get(1);
    assert!(!stored.is_email_confirmed);
    assert!(stored.email_confirmed_at.is_none());
    assert_ne!(stored.email_confirm_token.unwrap(), first);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == "mail.confirm_email"));
    drop(events);

    let result = forced.execute(7).await;
    assert!(
        matches!(result, Err(AccountServiceError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
    users.modify(1, |u| u.is_active = false);
    let result = forced.execute(1).await;
    assert!(
        matches!(result, Err(AccountServiceError::InactiveUser)),
        "expected InactiveUser, got {result:?}"
    );
}

// ── Password reset ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_rate_limit_rerequests_within_a_minute() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let outbox = MockOutboxRepo::empty();
    let events = outbox.events_handle();
    let uc = RequestResetPasswordUseCase {
        users: users.clone(),
        outbox,
    };

    uc.execute("alice").await.unwrap();
    let first = users.get(1).password_reset_token.unwrap();

    let result = uc.execute("alice").await;
    match result {
        Err(AccountServiceError::RateLimited {
            retry_after_seconds,
        }) => assert!((1..=60).contains(&retry_after_seconds)),
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert_eq!(users.get(1).password_reset_token.unwrap(), first);
    assert_eq!(events.lock().unwrap().len(), 1);

    // Pretend the first request was issued 61 seconds ago.
    users.modify(1, |u| {
        u.password_reset_token_expire_at =
            Some(Utc::now() + TokenChannel::PasswordReset.validity() - Duration::seconds(61));
    });
    uc.execute("alice").await.unwrap();
    assert_ne!(users.get(1).password_reset_token.unwrap(), first);
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn should_refuse_reset_request_for_inactive_user() {
    let mut user = test_user(1, "alice");
    user.is_active = false;
    let result = RequestResetPasswordUseCase {
        users: MockUserRepo::new(vec![user]),
        outbox: MockOutboxRepo::empty(),
    }
    .execute("alice")
    .await;
    assert!(
        matches!(result, Err(AccountServiceError::InactiveUser)),
        "expected InactiveUser, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_reset_password_with_expired_token() {
    let mut user = test_user(1, "alice");
    user.password_reset_token = Some("reset-token".to_owned());
    user.password_reset_token_expire_at = Some(Utc::now() - Duration::seconds(1));
    let original_hash = user.password_hash.clone();
    let users = MockUserRepo::new(vec![user]);

    let result = ResetPasswordUseCase {
        users: users.clone(),
    }
    .execute(consume(1, "reset-token"))
    .await;
    assert!(
        matches!(result, Err(AccountServiceError::TokenExpired)),
        "expected TokenExpired, got {result:?}"
    );
    assert_eq!(users.get(1).password_hash, original_hash);
}

#[tokio::test]
async fn should_reset_password_and_consume_token() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    RequestResetPasswordUseCase {
        users: users.clone(),
        outbox: MockOutboxRepo::empty(),
    }
    .execute("alice")
    .await
    .unwrap();
    let token = users.get(1).password_reset_token.unwrap();

    let uc = ResetPasswordUseCase {
        users: users.clone(),
    };
    uc.execute(consume(1, &token)).await.unwrap();

    let stored = users.get(1);
    assert!(verify_password(NEW_PASSWORD, &stored.password_hash));
    assert!(stored.password_reset_token.is_none());

    let result = uc.execute(consume(1, &token)).await;
    assert!(
        matches!(result, Err(AccountServiceError::NoActiveRequest)),
        "expected NoActiveRequest, got {result:?}"
    );
}

// ── Two-factor disable by email ──────────────────────────────────────────────

#[tokio::test]
async fn should_disable_two_factor_through_mailed_token() {
    let mut user = test_user(1, "alice");
    user.two_factor_key = Some(two_factor::generate_secret());
    user.is_two_factor_enabled = true;
    let users = MockUserRepo::new(vec![user]);
    let outbox = MockOutboxRepo::empty();
    let events = outbox.events_handle();

    RequestDisableTwoFactorByEmailUseCase {
        users: users.clone(),
        outbox,
    }
    .execute(1)
    .await
    .unwrap();
    assert_eq!(events.lock().unwrap()[0].kind, "mail.disable_two_factor");
    let token = users.get(1).two_factor_disable_token.unwrap();

    DisableTwoFactorByEmailUseCase {
        users: users.clone(),
    }
    .execute(1, &token)
    .await
    .unwrap();

    let stored = users.get(1);
    assert!(!stored.is_two_factor_enabled);
    assert!(stored.two_factor_key.is_none());
    assert!(stored.two_factor_disable_token.is_none());
}

#[tokio::test]
async fn should_refuse_disable_mail_without_two_factor() {
    let result = RequestDisableTwoFactorByEmailUseCase {
        users: MockUserRepo::new(vec![test_user(1, "alice")]),
        outbox: MockOutboxRepo::empty(),
    }
    .execute(1)
    .await;
    assert!(
        matches!(result, Err(AccountServiceError::TwoFactorNotEnabled)),
        "expected TwoFactorNotEnabled, got {result:?}"
    );
}

// ── Profile / password ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_update_and_clear_nickname() {
    let mut other = test_user(2, "bob");
    other.nickname = Some("Bobby".to_owned());
    let users = MockUserRepo::new(vec![test_user(1, "alice"), other]);
    let uc = UpdateProfileUseCase {
        users: users.clone(),
    };

    let updated = uc
        .execute(
            users.get(1),
            ProfileUpdate {
                nickname: Some(Some("Ally".to_owned())),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.nickname.as_deref(), Some("Ally"));
    assert_eq!(users.get(1).nickname.as_deref(), Some("Ally"));

    let result = uc
        .execute(
            users.get(1),
            ProfileUpdate {
                nickname: Some(Some("Bobby".to_owned())),
            },
        )
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::DuplicateNickname)),
        "expected DuplicateNickname, got {result:?}"
    );

    let result = uc.execute(users.get(1), ProfileUpdate::default()).await;
    assert!(
        matches!(result, Err(AccountServiceError::MissingData)),
        "expected MissingData, got {result:?}"
    );

    uc.execute(users.get(1), ProfileUpdate { nickname: Some(None) })
        .await
        .unwrap();
    assert!(users.get(1).nickname.is_none());
}

#[tokio::test]
async fn should_require_old_password_to_change_it() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let uc = UpdatePasswordUseCase {
        users: users.clone(),
    };

    let result = uc
        .execute(
            users.get(1),
            UpdatePasswordInput {
                old_password: "not-my-password".to_owned(),
                new_password: NEW_PASSWORD.to_owned(),
            },
        )
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::WrongPassword)),
        "expected WrongPassword, got {result:?}"
    );

    uc.execute(
        users.get(1),
        UpdatePasswordInput {
            old_password: TEST_PASSWORD.to_owned(),
            new_password: NEW_PASSWORD.to_owned(),
        },
    )
    .await
    .unwrap();
    assert!(verify_password(NEW_PASSWORD, &users.get(1).password_hash));
}

// ── Administration ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_init_confirmed_user() {
    let users = MockUserRepo::empty();
    let created = InitUserUseCase {
        users: users.clone(),
    }
    .execute(InitUserInput {
        name: "root_admin".to_owned(),
        email: "root@example.com".to_owned(),
        password: NEW_PASSWORD.to_owned(),
    })
    .await
    .unwrap();

    let stored = users.get(created.id);
    assert!(stored.is_email_confirmed);
    assert!(stored.email_confirm_token.is_none());
    assert!(verify_password(NEW_PASSWORD, &stored.password_hash));
}

#[tokio::test]
async fn should_only_bind_configured_providers() {
    let users = MockUserRepo::new(vec![test_user(1, "alice")]);
    let uc = SetExternalAuthUseCase {
        users: users.clone(),
        external: MockExternalAuth::with("corp", Verdict::Accept),
    };

    let result = uc
        .execute(
            1,
            SetExternalAuthInput {
                provider_id: Some("elsewhere".to_owned()),
                enforced: true,
            },
        )
        .await;
    assert!(
        matches!(result, Err(AccountServiceError::UnknownExternalAuthProvider)),
        "expected UnknownExternalAuthProvider, got {result:?}"
    );

    uc.execute(
        1,
        SetExternalAuthInput {
            provider_id: Some("corp".to_owned()),
            enforced: true,
        },
    )
    .await
    .unwrap();
    let stored = users.get(1);
    assert_eq!(stored.external_auth_provider_id.as_deref(), Some("corp"));
    assert!(stored.external_auth_enforced);

    // Unbinding also drops enforcement.
    uc.execute(
        1,
        SetExternalAuthInput {
            provider_id: None,
            enforced: true,
        },
    )
    .await
    .unwrap();
    let stored = users.get(1);
    assert!(stored.external_auth_provider_id.is_none());
    assert!(!stored.external_auth_enforced);
}

#[tokio::test]
async fn should_list_login_records_newest_first() {
    let now = Utc::now();
    let older = failed_record(1, now - Duration::minutes(5));
    let mut newer = failed_record(1, now);
    newer.success = true;
    newer.reason = None;
    let uc = ListLoginRecordsUseCase {
        users: MockUserRepo::new(vec![test_user(1, "alice")]),
        login_records: MockLoginRecordRepo::new(vec![
            older,
            newer,
            failed_record(2, now),
        ]),
    };

    let records = uc.execute(1).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].success);
    assert!(!records[1].success);

    let result = uc.execute(42).await;
    assert!(
        matches!(result, Err(AccountServiceError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
}
