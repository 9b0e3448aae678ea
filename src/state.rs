use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    services::{
        notification_service::{DbNotifier, Notifier},
        otp_store::OtpStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub notifier: Arc<dyn Notifier>,
    pub otp: Arc<OtpStore>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let orm = orm_from_pool(&pool);
        let notifier = Arc::new(DbNotifier::new(orm.clone()));
        let otp = Arc::new(OtpStore::new(config.otp_ttl));
        Self {
            pool,
            orm,
            config: Arc::new(config),
            notifier,
            otp,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
