use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::AuthService;
use crate::clock::{Clock, SystemClock};
use crate::configuration::{DatabaseSettings, Settings};
use crate::error::StartupError;
use crate::logger::RequestTracing;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    get_current_user, health_check, login, logout, refresh, register, validate, RefreshCookie,
};
use crate::store::{PgTokenStore, PgUserDirectory, TokenStore};

/// A bound, not yet running server plus its background tasks
pub struct Application {
    port: u16,
    server: Server,
    sweeper: Option<JoinHandle<()>>,
}

impl Application {
    /// Connect to Postgres, apply migrations and bind the listener.
    pub async fn build(settings: Settings) -> Result<Self, StartupError> {
        settings.jwt.validate()?;

        let pool = get_connection_pool(&settings.database)?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let users = Arc::new(PgUserDirectory::new(pool.clone()));
        let tokens: Arc<dyn TokenStore> = Arc::new(PgTokenStore::new(pool));
        let auth = Arc::new(AuthService::new(
            users,
            tokens.clone(),
            &settings.jwt,
            &settings.password,
        ));

        let address = format!("{}:{}", settings.application.host, settings.application.port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        tracing::info!(address = %address, port = port, "Listener bound");

        let sweeper = match settings.sweeper.interval_seconds {
            0 => {
                tracing::info!("Refresh token sweeper disabled");
                None
            }
            secs => Some(spawn_sweeper(
                tokens,
                Arc::new(SystemClock),
                Duration::from_secs(secs),
            )),
        };

        let cookie = RefreshCookie {
            secure: settings.application.secure_cookies,
            max_age_seconds: settings.jwt.refresh_token_expiry,
        };
        let server = run(listener, auth, cookie)?;

        Ok(Self {
            port,
            server,
            sweeper,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let result = self.server.await;
        if let Some(sweeper) = self.sweeper {
            sweeper.abort();
        }
        result
    }
}

/// Lazily connecting pool; every acquire is bounded by `acquire_timeout`.
pub fn get_connection_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect_lazy(&settings.connection_string())
}

/// Assemble the HTTP server around an already built `AuthService`.
pub fn run(
    listener: TcpListener,
    auth: Arc<AuthService>,
    cookie: RefreshCookie,
) -> Result<Server, std::io::Error> {
    let auth_data = web::Data::from(auth.clone());
    let cookie_data = web::Data::new(cookie);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestTracing)
            .app_data(auth_data.clone())
            .app_data(cookie_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/validate", web::post().to(validate))
                    .route("/logout", web::post().to(logout)),
            )
            // Protected routes
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Periodically purge expired refresh records.
pub fn spawn_sweeper(
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            match tokens.delete_expired(clock.now()).await {
                Ok(0) => tracing::debug!("No expired refresh tokens"),
                Ok(removed) => tracing::info!(removed = removed, "Purged expired refresh tokens"),
                Err(e) => tracing::error!(error = %e, "Refresh token sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::RefreshTokenRecord;
    use crate::store::InMemoryTokenStore;

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_expired_records() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(InMemoryTokenStore::new());
        store
            .put(&RefreshTokenRecord {
                user_id: "u1".into(),
                token_hash: "h".into(),
                access_token_id: "old".into(),
                expires_at: clock.now() - chrono::Duration::seconds(1),
            })
            .await
            .unwrap();
        store
            .put(&RefreshTokenRecord {
                user_id: "u1".into(),
                token_hash: "h".into(),
                access_token_id: "live".into(),
                expires_at: clock.now() + chrono::Duration::days(1),
            })
            .await
            .unwrap();

        let handle = spawn_sweeper(store.clone(), clock, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.len(), 1);
        assert!(store.find_by_access_token_id("live").await.unwrap().is_some());
        handle.abort();
    }
}
