// src/main.rs

use dotenvy::dotenv;
use sman1_backend::config::Config;
use sman1_backend::models::user::{Role, User};
use sman1_backend::routes;
use sman1_backend::state::AppState;
use sman1_backend::store::{Store, keys, new_id};
use sman1_backend::utils::hash::hash_password;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database opened...");

    let store = Store::new(pool);

    // Create the storage table if this is a fresh database
    store
        .init_schema()
        .await
        .expect("Failed to initialize storage schema");

    // Seed Admin User
    if let Err(e) = seed_admin_user(&store, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Create AppState
    let state = AppState {
        store,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("sman1-backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

async fn seed_admin_user(store: &Store, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let mut users: Vec<User> = store.load(keys::USERS).await?;

        if !users.iter().any(|u| u.username == *username) {
            tracing::info!("Seeding admin user: {}", username);
            let hashed_password = hash_password(password)?;

            users.push(User {
                id: new_id(Role::Admin.id_prefix()),
                name: "Administrator".to_string(),
                email: None,
                username: username.clone(),
                password: hashed_password,
                role: Role::Admin,
                nis: None,
                nip: None,
                mata_pelajaran: None,
                kelas: None,
                status: "active".to_string(),
                created_by: None,
                created_at: chrono::Utc::now(),
                updated_at: None,
            });
            store.save(keys::USERS, &users).await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
