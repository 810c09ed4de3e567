use std::sync::Arc;

use tracing::{debug, info};

use crate::admin::AdminService;
use crate::core::engine::KvEngine;
use crate::export::exporter::CsvExporter;
use crate::infra::config::TrashLogConfig;
use crate::infra::error::Result;
use crate::security::auth::Authorizer;
use crate::security::token::TokenIssuer;
use crate::trash::clock::{Clock, SystemClock};
use crate::trash::content::ContentResolver;
use crate::trash::dedup::{DedupGuard, KvMarkerStore, MarkerStore, MemoryMarkerStore};
use crate::trash::logger::EventLogger;
use crate::trash::store::EntryStore;

const TOKEN_SECRET_KEY: &str = "trash_log_token_secret";

/// Every component, wired once against one data directory.
pub struct TrashLog {
    pub config: TrashLogConfig,
    pub engine: Arc<KvEngine>,
    pub store: Arc<EntryStore>,
    pub logger: Arc<EventLogger>,
    pub exporter: Arc<CsvExporter>,
    pub tokens: Arc<TokenIssuer>,
    pub admin: Arc<AdminService>,
}

impl TrashLog {
    pub fn open(
        config: TrashLogConfig,
        resolver: Arc<dyn ContentResolver>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self> {
        Self::open_with_clock(config, resolver, authorizer, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        config: TrashLogConfig,
        resolver: Arc<dyn ContentResolver>,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = Arc::new(KvEngine::new(config.store.clone())?);
        let store = Arc::new(EntryStore::new(Arc::clone(&engine)));

        let markers: Arc<dyn MarkerStore> = if config.capture.persistent_markers {
            let kv_markers = KvMarkerStore::new(Arc::clone(&engine), Arc::clone(&clock));
            // expired markers left by earlier runs
            let removed = kv_markers.purge_expired()?;
            if removed > 0 {
                debug!("dropped {removed} expired dedup markers");
            }
            Arc::new(kv_markers)
        } else {
            Arc::new(MemoryMarkerStore::new(Arc::clone(&clock)))
        };
        let guard = DedupGuard::new(markers, config.capture.dedup_ttl_secs);
        let logger = Arc::new(EventLogger::new(
            Arc::clone(&store),
            guard,
            resolver,
            Arc::clone(&clock),
            config.capture.utc_offset_minutes,
        ));

        let secret = token_secret(&engine, &config)?;
        let tokens = Arc::new(TokenIssuer::new(
            &secret,
            config.security.token_lifetime_secs,
            clock,
        )?);

        let exporter = Arc::new(CsvExporter::new(
            Arc::clone(&store),
            Arc::clone(&tokens),
            &config,
        ));
        let admin = Arc::new(AdminService::new(
            Arc::clone(&store),
            Arc::clone(&exporter),
            Arc::clone(&tokens),
            authorizer,
        ));

        info!(
            "trash log ready: data at {}, csv at {}",
            config.store.dir_path.display(),
            exporter
                .path()
                .map_or_else(|| "<unavailable>".to_string(), |p| p.display().to_string())
        );

        Ok(Self {
            config,
            engine,
            store,
            logger,
            exporter,
            tokens,
            admin,
        })
    }
}

/// Configured secret, else the one persisted on first start.
fn token_secret(engine: &KvEngine, config: &TrashLogConfig) -> Result<Vec<u8>> {
    if let Some(secret) = &config.security.secret {
        return Ok(secret.as_bytes().to_vec());
    }
    if let Some(stored) = engine.get(TOKEN_SECRET_KEY)? {
        if !stored.is_empty() {
            return Ok(stored);
        }
    }

    let secret = TokenIssuer::generate_secret();
    engine.set(TOKEN_SECRET_KEY, secret.clone())?;
    info!("generated a new token secret");
    Ok(secret)
}
