mod config;

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::admin::AdminRequest;
use crate::app::TrashLog;
use crate::export::exporter::CsvDownload;
use crate::infra::error::TrashLogError;
use crate::security::token::TokenAction;
use crate::trash::content::{Actor, ContentCatalog, ContentDescriptor, ContentId, Role};
use crate::trash::logger::CaptureOutcome;

pub use config::ServerConfig;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_NAME_HEADER: &str = "X-Actor-Name";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";
pub const HOOK_SECRET_HEADER: &str = "X-Hook-Secret";

pub struct AppState {
    pub trash_log: Arc<TrashLog>,
    pub catalog: Arc<ContentCatalog>,
    /// Required on every `/hooks/*` call when set.
    pub hook_secret: Option<String>,
}

impl AppState {
    fn hook_allowed(&self, req: &HttpRequest) -> bool {
        let Some(expected) = &self.hook_secret else {
            return true;
        };
        let presented = req
            .headers()
            .get(HOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented == Some(expected.as_str()) {
            return true;
        }
        warn!("rejected hook call to {}: bad hook secret", req.path());
        false
    }
}

#[derive(Deserialize)]
pub struct NonceRequest {
    #[serde(default)]
    pub nonce: String,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// The acting user, as asserted by the authenticating proxy in front of us.
/// No id header means an anonymous request.
pub fn actor_from_headers(req: &HttpRequest) -> Option<Actor> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    let id = header(ACTOR_ID_HEADER)?.parse::<u64>().ok()?;
    let name = header(ACTOR_NAME_HEADER).unwrap_or_default();
    let role = header(ACTOR_ROLE_HEADER)
        .and_then(|r| r.parse::<Role>().ok())
        .unwrap_or(Role::Subscriber);
    Some(Actor::new(id, name, role))
}

fn status_for(err: &TrashLogError) -> StatusCode {
    match err {
        e if e.is_access_denied() => StatusCode::FORBIDDEN,
        TrashLogError::FileNotFound => StatusCode::NOT_FOUND,
        TrashLogError::NoEntries => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: TrashLogError) -> HttpResponse {
    HttpResponse::build(status_for(&err)).json(ApiResponse {
        success: false,
        message: err.to_string(),
        data: None,
    })
}

fn ok_response(message: impl Into<String>, data: Option<serde_json::Value>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: message.into(),
        data,
    })
}

fn download_response(download: CsvDownload) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    for (name, value) in download.headers() {
        // actix derives Content-Length from the body
        if name != "Content-Length" {
            builder.insert_header((name, value));
        }
    }
    builder.body(download.body)
}

fn capture_response(outcome: crate::infra::error::Result<CaptureOutcome>) -> HttpResponse {
    match outcome {
        Ok(CaptureOutcome::Logged(entry)) => ok_response(
            "Deletion logged",
            Some(serde_json::json!({ "outcome": "logged", "entry": entry })),
        ),
        Ok(CaptureOutcome::Duplicate) => ok_response(
            "Already logged",
            Some(serde_json::json!({ "outcome": "duplicate" })),
        ),
        Ok(CaptureOutcome::Unresolved) => ok_response(
            "Content not found",
            Some(serde_json::json!({ "outcome": "unresolved" })),
        ),
        Ok(CaptureOutcome::Skipped) => ok_response(
            "Not handled by this hook",
            Some(serde_json::json!({ "outcome": "skipped" })),
        ),
        Err(e) => error_response(e),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    ok_response("Trash Log API is running", None)
}

#[get("/admin/status")]
async fn status(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let actor = actor_from_headers(&req);
    match data.trash_log.admin.status(actor.as_ref()) {
        Ok(view) => ok_response(
            "Status retrieved",
            Some(serde_json::to_value(view).unwrap_or_default()),
        ),
        Err(e) => error_response(e),
    }
}

#[post("/admin/csv/generate")]
async fn generate_csv(
    req: HttpRequest,
    body: web::Json<NonceRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = AdminRequest::new(actor_from_headers(&req), body.into_inner().nonce);
    match data.trash_log.admin.generate_csv(&request) {
        Ok(outcome) => ok_response(
            outcome.message.clone(),
            Some(serde_json::to_value(outcome).unwrap_or_default()),
        ),
        Err(e) => error_response(e),
    }
}

#[post("/admin/csv/delete")]
async fn delete_csv(
    req: HttpRequest,
    body: web::Json<NonceRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = AdminRequest::new(actor_from_headers(&req), body.into_inner().nonce);
    match data.trash_log.admin.delete_csv(&request) {
        Ok(outcome) => ok_response(outcome.message, None),
        Err(e) => error_response(e),
    }
}

#[post("/admin/logs/purge")]
async fn purge_logs(
    req: HttpRequest,
    body: web::Json<NonceRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = AdminRequest::new(actor_from_headers(&req), body.into_inner().nonce);
    match data.trash_log.admin.purge_logs(&request) {
        Ok(outcome) => ok_response(outcome.message, None),
        Err(e) => error_response(e),
    }
}

#[post("/admin/csv/download")]
async fn download_csv(
    req: HttpRequest,
    body: web::Json<NonceRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = AdminRequest::new(actor_from_headers(&req), body.into_inner().nonce);
    match data.trash_log.admin.download_csv(&request) {
        Ok(download) => download_response(download),
        Err(e) => error_response(e),
    }
}

#[get("/admin/csv/download")]
async fn secured_download(
    req: HttpRequest,
    query: web::Query<DownloadQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    let query = query.into_inner();
    if query.action != TokenAction::DownloadLink.as_str() {
        return error_response(TrashLogError::SecurityCheckFailed);
    }

    let request = AdminRequest::new(actor_from_headers(&req), query.nonce);
    match data.trash_log.admin.secured_download(&request) {
        Ok(download) => download_response(download),
        Err(e) => error_response(e),
    }
}

#[post("/hooks/content")]
async fn register_content(
    req: HttpRequest,
    body: web::Json<ContentDescriptor>,
    data: web::Data<AppState>,
) -> impl Responder {
    if !data.hook_allowed(&req) {
        return error_response(TrashLogError::SecurityCheckFailed);
    }
    let descriptor = body.into_inner();
    let id = descriptor.id;
    data.catalog.register(descriptor);
    ok_response(
        format!("Content {} registered", id),
        Some(serde_json::json!({ "id": id })),
    )
}

#[post("/hooks/trash/{id}")]
async fn trash_hook(
    req: HttpRequest,
    path: web::Path<ContentId>,
    data: web::Data<AppState>,
) -> impl Responder {
    if !data.hook_allowed(&req) {
        return error_response(TrashLogError::SecurityCheckFailed);
    }
    let actor = actor_from_headers(&req);
    capture_response(data.trash_log.logger.on_trash(path.into_inner(), actor.as_ref()))
}

#[post("/hooks/delete/{id}")]
async fn delete_hook(
    req: HttpRequest,
    path: web::Path<ContentId>,
    data: web::Data<AppState>,
) -> impl Responder {
    if !data.hook_allowed(&req) {
        return error_response(TrashLogError::SecurityCheckFailed);
    }
    let actor = actor_from_headers(&req);
    capture_response(
        data.trash_log
            .logger
            .on_permanent_delete(path.into_inner(), actor.as_ref()),
    )
}

/// Registers every route. Shared by the server and the HTTP tests.
///
/// Actor identity comes from the `X-Actor-*` headers, so the server must sit
/// behind a proxy that authenticates users and overwrites those headers. The
/// `/hooks/*` routes additionally check [`AppState::hook_secret`] when set.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(status)
        .service(generate_csv)
        .service(delete_csv)
        .service(purge_logs)
        .service(download_csv)
        .service(secured_download)
        .service(register_content)
        .service(trash_hook)
        .service(delete_hook);
}

pub async fn start_server(
    trash_log: TrashLog,
    catalog: Arc<ContentCatalog>,
    server_config: ServerConfig,
) -> std::io::Result<()> {
    let trash_log = Arc::new(trash_log);

    server_config.print_info();
    info!("starting server at {}:{}", server_config.host, server_config.port);

    if server_config.hook_secret.is_none() {
        warn!("HOOK_SECRET not set: capture hooks accept unauthenticated calls");
    }

    let max_json = server_config.max_json_payload_size;
    let hook_secret = server_config.hook_secret.clone();
    let host = server_config.host.clone();
    let port = server_config.port;

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(AppState {
                trash_log: Arc::clone(&trash_log),
                catalog: Arc::clone(&catalog),
                hook_secret: hook_secret.clone(),
            }))
            .app_data(web::JsonConfig::default().limit(max_json))
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
