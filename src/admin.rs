//! Administrative actions behind the token + capability boundary.
//!
//! Every action verifies its token first, then the actor's permission, and
//! only then touches the store or the filesystem.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::export::exporter::{CsvDownload, CsvExporter};
use crate::infra::error::{Result, TrashLogError};
use crate::security::auth::Authorizer;
use crate::security::token::{TokenAction, TokenIssuer};
use crate::trash::content::Actor;
use crate::trash::store::EntryStore;

/// An authenticated request: who is asking and the token they presented.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdminRequest {
    pub actor: Option<Actor>,
    pub nonce: String,
}

impl AdminRequest {
    pub fn new(actor: Option<Actor>, nonce: impl Into<String>) -> Self {
        Self {
            actor,
            nonce: nonce.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ActionOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_url: Option<String>,
}

impl ActionOutcome {
    fn message(message: &str) -> Self {
        Self {
            message: message.to_string(),
            csv_size: None,
            csv_url: None,
        }
    }
}

/// Everything the admin page renders.
#[derive(Clone, Debug, Serialize)]
pub struct StatusView {
    pub csv_exists: bool,
    pub csv_size: String,
    pub csv_url: String,
    pub db_size: String,
    pub entries_count: usize,
    /// Admin token for the in-page actions.
    pub nonce: String,
}

pub struct AdminService {
    store: Arc<EntryStore>,
    exporter: Arc<CsvExporter>,
    tokens: Arc<TokenIssuer>,
    authorizer: Arc<dyn Authorizer>,
}

impl AdminService {
    pub fn new(
        store: Arc<EntryStore>,
        exporter: Arc<CsvExporter>,
        tokens: Arc<TokenIssuer>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            store,
            exporter,
            tokens,
            authorizer,
        }
    }

    fn check(&self, req: &AdminRequest, action: TokenAction) -> Result<()> {
        let actor_id = req.actor.as_ref().map_or(0, |a| a.id);
        if !self.tokens.verify(&req.nonce, action, actor_id) {
            warn!("rejected {action} request from actor {actor_id}: bad token");
            return Err(TrashLogError::SecurityCheckFailed);
        }
        if !self.authorizer.can_manage(req.actor.as_ref()) {
            warn!("rejected {action} request from actor {actor_id}: not permitted");
            return Err(TrashLogError::PermissionDenied);
        }
        Ok(())
    }

    /// Fresh admin token for `actor`.
    pub fn nonce_for(&self, actor: Option<&Actor>) -> String {
        self.tokens
            .create(TokenAction::Admin, actor.map_or(0, |a| a.id))
    }

    pub fn status(&self, actor: Option<&Actor>) -> Result<StatusView> {
        if !self.authorizer.can_manage(actor) {
            return Err(TrashLogError::PermissionDenied);
        }

        Ok(StatusView {
            csv_exists: self.exporter.exists(),
            csv_size: self.exporter.size(),
            csv_url: self.exporter.url(actor),
            db_size: self.store.estimate_size()?,
            entries_count: self.store.count()?,
            nonce: self.nonce_for(actor),
        })
    }

    pub fn generate_csv(&self, req: &AdminRequest) -> Result<ActionOutcome> {
        self.check(req, TokenAction::Admin)?;
        self.exporter.generate()?;

        Ok(ActionOutcome {
            message: "CSV file generated successfully.".to_string(),
            csv_size: Some(self.exporter.size()),
            csv_url: Some(self.exporter.url(req.actor.as_ref())),
        })
    }

    pub fn delete_csv(&self, req: &AdminRequest) -> Result<ActionOutcome> {
        self.check(req, TokenAction::Admin)?;
        self.exporter.delete()?;
        Ok(ActionOutcome::message("CSV file deleted successfully."))
    }

    pub fn purge_logs(&self, req: &AdminRequest) -> Result<ActionOutcome> {
        self.check(req, TokenAction::Admin)?;
        if !self.store.clear()? {
            return Err(TrashLogError::PurgeFailed);
        }

        info!(
            "trash log purged by actor {}",
            req.actor.as_ref().map_or(0, |a| a.id)
        );
        Ok(ActionOutcome::message(
            "All log entries have been purged from the database.",
        ))
    }

    /// In-page download. Generates the file first when it is missing.
    pub fn download_csv(&self, req: &AdminRequest) -> Result<CsvDownload> {
        self.check(req, TokenAction::Admin)?;
        self.fetch()
    }

    /// Direct link download. The actor must be logged in before the link
    /// token is even looked at.
    pub fn secured_download(&self, req: &AdminRequest) -> Result<CsvDownload> {
        if req.actor.is_none() {
            return Err(TrashLogError::NotLoggedIn);
        }
        self.check(req, TokenAction::DownloadLink)?;
        self.fetch()
    }

    fn fetch(&self) -> Result<CsvDownload> {
        if !self.exporter.exists() {
            self.exporter.generate()?;
        }
        self.exporter.download()
    }
}
