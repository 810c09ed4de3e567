use std::sync::Arc;

use tracing::error;

use trash_log::api::{start_server, ServerConfig};
use trash_log::infra::logging::init_tracing;
use trash_log::{ContentCatalog, RoleAuthorizer, TrashLog, TrashLogConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let config = TrashLogConfig::from_env();
    let catalog = Arc::new(ContentCatalog::new());
    let authorizer = Arc::new(RoleAuthorizer::new(config.security.network));

    let trash_log = match TrashLog::open(config, catalog.clone(), authorizer) {
        Ok(app) => app,
        Err(e) => {
            error!("failed to open trash log: {e}");
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    start_server(trash_log, catalog, ServerConfig::from_env()).await
}
