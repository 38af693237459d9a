use std::sync::Arc;

use auth_service::auth::AuthService;
use auth_service::configuration::{JwtSettings, PasswordSettings};
use auth_service::error::AuthError;
use auth_service::store::{InMemoryTokenStore, InMemoryUserDirectory};
use proptest::prelude::*;

fn service() -> AuthService {
    AuthService::new(
        Arc::new(InMemoryUserDirectory::new()),
        Arc::new(InMemoryTokenStore::new()),
        &JwtSettings {
            secret: "property-secret".into(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        },
        &PasswordSettings { hash_cost: 4 },
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,11}@[a-z]{1,8}\\.(com|org|io)"
}

fn password_strategy() -> impl Strategy<Value = String> {
    "[ -~]{1,40}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn register_then_authenticate_roundtrips(
        email in email_strategy(),
        password in password_strategy(),
        other in password_strategy(),
    ) {
        prop_assume!(password != other);

        runtime().block_on(async {
            let auth = service();
            let registered = auth.register("user", &email, &password).await.unwrap();

            let authenticated = auth.authenticate(&email, &password).await.unwrap();
            prop_assert_eq!(&authenticated.id, &registered.id);

            let rejected = auth.authenticate(&email, &other).await;
            prop_assert!(matches!(rejected, Err(AuthError::InvalidCredentials)));
            Ok(())
        })?;
    }

    #[test]
    fn second_registration_always_conflicts(
        email in email_strategy(),
        first in password_strategy(),
        second in password_strategy(),
    ) {
        runtime().block_on(async {
            let auth = service();
            auth.register("first", &email, &first).await.unwrap();

            let duplicate = auth.register("second", &email, &second).await;
            prop_assert!(matches!(duplicate, Err(AuthError::AlreadyExists)));
            Ok(())
        })?;
    }

    #[test]
    fn every_pair_rotates_exactly_once(rotations in 1usize..5) {
        runtime().block_on(async {
            let auth = service();
            let user = auth.register("user", "user@x.com", "pw").await.unwrap();
            let mut pair = auth.issue_tokens(&user.id).await.unwrap();

            for _ in 0..rotations {
                let next = auth.rotate(&pair.access_token, &pair.refresh_token).await.unwrap();
                let replay = auth.rotate(&pair.access_token, &pair.refresh_token).await;
                prop_assert!(matches!(replay, Err(AuthError::InvalidRefreshToken)));
                prop_assert!(auth.validate(&next.access_token).await.unwrap().is_valid());
                pair = next;
            }
            Ok(())
        })?;
    }
}
