use std::sync::Arc;

use tracing::{debug, info};

use crate::infra::error::Result;
use crate::trash::clock::Clock;
use crate::trash::content::{Actor, ContentDescriptor, ContentId, ContentResolver};
use crate::trash::dedup::DedupGuard;
use crate::trash::entry::{LogEntry, AUTOMATIC_ACTION};
use crate::trash::format::{format_date, size_format};
use crate::trash::store::EntryStore;

/// What a hook invocation did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Logged(LogEntry),
    /// Already captured inside the dedup window.
    Duplicate,
    /// Content could not be resolved (gone, invalid id).
    Unresolved,
    /// The hook does not handle this kind of content.
    Skipped,
}

/// Turns host deletion signals into stored [`LogEntry`] values.
///
/// Two entry points exist. [`EventLogger::on_trash`] runs before regular
/// content is moved to the trash; [`EventLogger::on_permanent_delete`] runs
/// when an attachment is deleted for good, because attachments bypass the
/// trash. Whichever fires first for an id wins the dedup window.
pub struct EventLogger {
    store: Arc<EntryStore>,
    guard: DedupGuard,
    resolver: Arc<dyn ContentResolver>,
    clock: Arc<dyn Clock>,
    utc_offset_minutes: i32,
}

impl EventLogger {
    pub fn new(
        store: Arc<EntryStore>,
        guard: DedupGuard,
        resolver: Arc<dyn ContentResolver>,
        clock: Arc<dyn Clock>,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            store,
            guard,
            resolver,
            clock,
            utc_offset_minutes,
        }
    }

    /// Reversible trash. Attachments are left to the permanent-delete hook.
    pub fn on_trash(&self, id: ContentId, actor: Option<&Actor>) -> Result<CaptureOutcome> {
        let Some(content) = self.resolver.resolve(id) else {
            return Ok(CaptureOutcome::Unresolved);
        };
        if content.is_attachment() {
            return Ok(CaptureOutcome::Skipped);
        }
        if self.guard.already_marked(id) {
            return Ok(CaptureOutcome::Duplicate);
        }

        self.guard.mark(id);
        self.record(&content, actor)
    }

    /// Irreversible deletion of an attachment. Size and URL come from the
    /// resolver's cached descriptor since the stored file may already be gone.
    pub fn on_permanent_delete(
        &self,
        id: ContentId,
        actor: Option<&Actor>,
    ) -> Result<CaptureOutcome> {
        if self.guard.already_marked(id) {
            return Ok(CaptureOutcome::Duplicate);
        }
        let Some(content) = self.resolver.resolve(id) else {
            return Ok(CaptureOutcome::Unresolved);
        };
        if !content.is_attachment() {
            return Ok(CaptureOutcome::Skipped);
        }

        self.guard.mark(id);
        self.record(&content, actor)
    }

    /// Captures an already resolved descriptor, honouring the dedup window.
    pub fn capture(
        &self,
        content: &ContentDescriptor,
        actor: Option<&Actor>,
    ) -> Result<CaptureOutcome> {
        if self.guard.already_marked(content.id) {
            return Ok(CaptureOutcome::Duplicate);
        }
        self.guard.mark(content.id);
        self.record(content, actor)
    }

    fn record(&self, content: &ContentDescriptor, actor: Option<&Actor>) -> Result<CaptureOutcome> {
        let now = self.clock.now_secs();

        let contributor = actor
            .map(|a| a.display_name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(AUTOMATIC_ACTION);

        let deleted_at = content
            .trash_meta_time
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(now);
        let deletion_date = format_date(deleted_at, self.utc_offset_minutes);

        let label = self
            .resolver
            .type_label(&content.content_type)
            .unwrap_or_else(|| content.content_type.clone());

        let media_size = if content.is_attachment() {
            resolve_media_size(content)
        } else {
            String::new()
        };

        let url = if content.is_attachment() {
            content.media.as_ref().and_then(|m| m.url.clone())
        } else {
            content.permalink.clone()
        }
        .unwrap_or_default();

        let entry = LogEntry::new(contributor, &label, &deletion_date, &media_size, &url, now);
        self.store.append(entry.clone())?;
        self.guard.mark(content.id);

        info!(
            "deletion logged: id={} type={} by '{}'",
            content.id, content.content_type, entry.contributor_name
        );
        Ok(CaptureOutcome::Logged(entry))
    }
}

/// Indexed size first, then a best-effort probe of the stored file.
fn resolve_media_size(content: &ContentDescriptor) -> String {
    let Some(media) = content.media.as_ref() else {
        return String::new();
    };

    if let Some(size) = media.indexed_size.filter(|s| *s > 0) {
        return size_format(size);
    }

    let Some(path) = media.file_path.as_ref() else {
        return String::new();
    };
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => size_format(meta.len()),
        Ok(_) => String::new(),
        Err(e) => {
            debug!("attachment {} file not measurable: {e}", content.id);
            String::new()
        }
    }
}
