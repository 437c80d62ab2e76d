pub mod connection;
pub mod error_context;
pub mod lock;

pub use connection::{ConnectionConfig, connect_with_retry_config, mask_url_password};
pub use error_context::SqlErrorContext;
pub use lock::lock_target_schema;
