use std::sync::Arc;

use sqlx::PgPool;

use autoloan_config::{CorsConfig, JwtConfig, SignupConfig, UploadConfig};
use autoloan_core::{AttachmentStorage, LocalAttachmentStorage, UploadPolicy};

use crate::cleanup::CleanupQueue;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub upload_config: UploadConfig,
    pub signup_config: SignupConfig,
    pub storage: Arc<dyn AttachmentStorage>,
    pub cleanup: CleanupQueue,
}

impl AppState {
    /// Builds the state around a local attachment directory and starts the
    /// cleanup worker. Must be called from within a tokio runtime.
    pub fn new(
        db: PgPool,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
        upload_config: UploadConfig,
        signup_config: SignupConfig,
    ) -> Self {
        let storage: Arc<dyn AttachmentStorage> =
            Arc::new(LocalAttachmentStorage::new(upload_config.dir.clone()));
        Self::with_storage(
            db,
            jwt_config,
            cors_config,
            upload_config,
            signup_config,
            storage,
        )
    }

    pub fn with_storage(
        db: PgPool,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
        upload_config: UploadConfig,
        signup_config: SignupConfig,
        storage: Arc<dyn AttachmentStorage>,
    ) -> Self {
        let cleanup = CleanupQueue::spawn(storage.clone());
        Self {
            db,
            jwt_config,
            cors_config,
            upload_config,
            signup_config,
            storage,
            cleanup,
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.upload_config.max_bytes)
    }
}
