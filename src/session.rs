use crate::cache::{Clock, ResponseCache};
use crate::config::Config;
use crate::filesystem::MediaStore;
use crate::user::{get_client_user_by_id, ClientUser};
use actix_session::Session;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Session key holding the authenticated user's id.
pub const SESSION_USER_KEY: &str = "user_id";

/// Shared state handed to every worker.
pub struct MainData {
    pub pool: DatabaseConnection,
    pub config: Config,
    pub cache: ResponseCache,
    pub media: MediaStore,
}

impl MainData {
    pub fn new(pool: DatabaseConnection, config: Config, clock: Arc<dyn Clock>) -> Self {
        let cache = ResponseCache::new(chrono::Duration::seconds(config.index_cache_seconds), clock);
        let media = MediaStore::new(config.media_root.to_owned());
        Self {
            pool,
            config,
            cache,
            media,
        }
    }
}

/// Resolves the session cookie to a user. Stale ids are purged from the session.
pub async fn authenticate_client_by_session(
    db: &DatabaseConnection,
    session: &Session,
) -> Option<ClientUser> {
    let id = match session.get::<i32>(SESSION_USER_KEY) {
        Ok(Some(id)) => id,
        Ok(None) => return None,
        Err(e) => {
            log::error!("authenticate_client_by_session: session.get() {}", e);
            return None;
        }
    };

    match get_client_user_by_id(db, id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            log::info!("authenticate_client_by_session: user {} no longer exists", id);
            session.purge();
            None
        }
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}

/// Binds the session to `user`. The session id is renewed to avoid fixation.
pub fn remember_client(
    session: &Session,
    user: &ClientUser,
) -> Result<(), actix_session::SessionInsertError> {
    session.renew();
    session.insert(SESSION_USER_KEY, user.id)
}

pub fn forget_client(session: &Session) {
    session.purge();
}
