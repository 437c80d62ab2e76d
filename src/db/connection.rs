use crate::error::{MergeError, MergeResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

/// Mask password in database URL for display
pub fn mask_url_password(url: &str) -> String {
    let Some((protocol, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    // user:pass@host -> user:***@host
    if let Some(at_pos) = rest.rfind('@') {
        let user_info = &rest[..at_pos];
        let host_and_path = &rest[at_pos + 1..];

        if let Some((username, _)) = user_info.split_once(':') {
            return format!("{}://{}:***@{}", protocol, username, host_and_path);
        }
    }

    url.to_string()
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum number of retries for database connections
    pub max_retries: u32,
    /// Delay between connection retries
    pub retry_delay: Duration,
    /// How long a pool checkout may wait before failing
    pub acquire_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_millis(200),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Connect to database with retry logic
///
/// Handles transient startup problems (server still booting, brief network loss).
/// Gives up with [`MergeError::Connection`] once the retries are spent.
pub async fn connect_with_retry_config(url: &str, config: &ConnectionConfig) -> MergeResult<PgPool> {
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let result = PgPoolOptions::new()
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await;

        match result {
            Ok(pool) => {
                if attempt > 0 {
                    info!(
                        "✅ Connected to database (after {} retry{})",
                        attempt,
                        if attempt == 1 { "" } else { "ies" }
                    );
                } else {
                    info!("✅ Connected to database");
                }
                return Ok(pool);
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < config.max_retries {
                    if attempt == 0 {
                        info!("🔄 Database not ready, retrying...");
                    }
                    tokio::time::sleep(config.retry_delay).await;
                }
            }
        }
    }

    Err(MergeError::Connection(format!(
        "Failed to connect to database at {} after {} attempts: {}",
        mask_url_password(url),
        config.max_retries + 1,
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string())
    )))
}
