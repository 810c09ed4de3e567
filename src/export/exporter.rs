use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::{info, warn};

use crate::export::htaccess::protect_directory;
use crate::infra::config::TrashLogConfig;
use crate::infra::error::{Result, TrashLogError};
use crate::security::token::{TokenAction, TokenIssuer};
use crate::trash::content::Actor;
use crate::trash::format::size_format;
use crate::trash::store::EntryStore;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub const CSV_HEADER: [&str; 5] = [
    "Contributor Name",
    "Content Type",
    "Date",
    "Document Size",
    "URL",
];

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// A CSV file ready to be streamed to a client.
#[derive(Debug, Clone)]
pub struct CsvDownload {
    pub file_name: String,
    pub content_type: &'static str,
    pub content_length: u64,
    pub body: Vec<u8>,
}

impl CsvDownload {
    /// Response headers forcing a non-cached attachment download.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type.to_string()),
            (
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.file_name),
            ),
            ("Content-Length", self.content_length.to_string()),
            ("Pragma", "no-cache".to_string()),
            ("Expires", "0".to_string()),
            (
                "Cache-Control",
                "no-cache, no-store, must-revalidate".to_string(),
            ),
        ]
    }
}

/// Renders the entry collection to a `;` separated file inside a protected
/// directory under the upload location.
pub struct CsvExporter {
    store: Arc<EntryStore>,
    tokens: Arc<TokenIssuer>,
    csv_dir: Option<PathBuf>,
    file_name: String,
    base_url: String,
}

impl CsvExporter {
    pub fn new(store: Arc<EntryStore>, tokens: Arc<TokenIssuer>, config: &TrashLogConfig) -> Self {
        Self {
            store,
            tokens,
            csv_dir: config.csv_dir(),
            file_name: config.export.csv_file_name.clone(),
            base_url: config.security.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `None` when the host has no usable upload directory.
    pub fn path(&self) -> Option<PathBuf> {
        self.csv_dir.as_ref().map(|dir| dir.join(&self.file_name))
    }

    pub fn exists(&self) -> bool {
        self.path().is_some_and(|p| p.is_file())
    }

    /// Human-readable size, empty when the file is absent or empty.
    pub fn size(&self) -> String {
        match self.path().and_then(|p| fs::metadata(p).ok()) {
            Some(meta) if meta.is_file() && meta.len() > 0 => size_format(meta.len()),
            _ => String::new(),
        }
    }

    /// Direct download link carrying a link token for `actor`.
    pub fn url(&self, actor: Option<&Actor>) -> String {
        let actor_id = actor.map_or(0, |a| a.id);
        let nonce = self.tokens.create(TokenAction::DownloadLink, actor_id);
        format!(
            "{}/admin/csv/download?action={}&nonce={}",
            self.base_url,
            TokenAction::DownloadLink,
            nonce
        )
    }

    pub fn generate(&self) -> Result<()> {
        let entries = self.store.get_all()?;
        if entries.is_empty() {
            return Err(TrashLogError::NoEntries);
        }

        let dir = self
            .csv_dir
            .as_ref()
            .ok_or(TrashLogError::StorageUnavailable)?;
        fs::create_dir_all(dir)
            .map_err(|e| TrashLogError::DirectoryCreateFailed(e.to_string()))?;

        if let Err(e) = protect_directory(dir, &self.file_name) {
            warn!("could not protect {}: {e}", dir.display());
        }

        let path = dir.join(&self.file_name);

        let mut file = File::create(&path).map_err(write_failed)?;
        file.write_all(UTF8_BOM).map_err(write_failed)?;

        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);

        writer.write_record(CSV_HEADER).map_err(write_failed)?;
        for entry in &entries {
            writer
                .write_record(entry.csv_row())
                .map_err(write_failed)?;
        }

        let file = writer.into_inner().map_err(write_failed)?;
        file.sync_all().map_err(write_failed)?;

        info!("CSV generated at {} ({} entries)", path.display(), entries.len());
        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        let path = self.path().ok_or(TrashLogError::FileNotFound)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("CSV deleted at {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TrashLogError::FileNotFound),
            Err(e) => Err(TrashLogError::DeleteFailed(e.to_string())),
        }
    }

    pub fn download(&self) -> Result<CsvDownload> {
        let path = self.path().ok_or(TrashLogError::FileNotFound)?;
        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TrashLogError::FileNotFound)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(CsvDownload {
            file_name: self.file_name.clone(),
            content_type: CSV_CONTENT_TYPE,
            content_length: body.len() as u64,
            body,
        })
    }
}

fn write_failed(e: impl std::fmt::Display) -> TrashLogError {
    TrashLogError::FileWriteFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::KvEngine;
    use crate::export::htaccess::HTACCESS_FILE;
    use crate::trash::clock::ManualClock;
    use crate::trash::content::Role;
    use crate::trash::entry::LogEntry;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        store: Arc<EntryStore>,
        tokens: Arc<TokenIssuer>,
        exporter: CsvExporter,
    }

    fn fixture() -> Result<Fixture> {
        let dir = tempdir()?;
        let config = TrashLogConfig::builder()
            .dir_path(dir.path().join("data"))
            .upload_dir(dir.path().join("uploads"))
            .base_url("https://site.test/")
            .build();
        let engine = Arc::new(KvEngine::new(config.store.clone())?);
        let store = Arc::new(EntryStore::new(engine));
        let tokens = Arc::new(TokenIssuer::new(
            b"exporter-test-secret",
            3600,
            Arc::new(ManualClock::new(0)),
        )?);
        let exporter = CsvExporter::new(store.clone(), tokens.clone(), &config);
        Ok(Fixture {
            dir,
            store,
            tokens,
            exporter,
        })
    }

    fn alice() -> LogEntry {
        LogEntry::new("Alice", "Page", "01/01/2024", "", "https://x/y", 1_704_067_200)
    }

    #[test]
    fn empty_collection_touches_nothing() -> Result<()> {
        let f = fixture()?;
        assert!(matches!(f.exporter.generate(), Err(TrashLogError::NoEntries)));
        assert!(!f.dir.path().join("uploads").exists());
        assert!(!f.exporter.exists());
        assert_eq!(f.exporter.size(), "");
        Ok(())
    }

    #[test]
    fn generate_writes_bom_header_and_rows() -> Result<()> {
        let f = fixture()?;
        f.store.append(alice())?;
        f.exporter.generate()?;

        let bytes = fs::read(f.exporter.path().unwrap())?;
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Contributor Name;Content Type;Date;Document Size;URL");
        assert_eq!(lines[1], "Alice;Page;01/01/2024;;https://x/y");
        assert_eq!(lines.len(), 2);
        assert!(!f.exporter.size().is_empty());
        Ok(())
    }

    #[test]
    fn awkward_fields_round_trip() -> Result<()> {
        let f = fixture()?;
        f.store.append(LogEntry::new(
            "O\"Brien; Jr",
            "Post",
            "01/01/2024",
            "",
            "",
            0,
        ))?;
        f.exporter.generate()?;

        let bytes = fs::read(f.exporter.path().unwrap())?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(&bytes[UTF8_BOM.len()..]);
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "O\"Brien; Jr");
        assert_eq!(&row[1], "Post");
        Ok(())
    }

    #[test]
    fn directory_is_protected_once() -> Result<()> {
        let f = fixture()?;
        f.store.append(alice())?;
        f.exporter.generate()?;
        f.exporter.generate()?;

        let htaccess = f
            .dir
            .path()
            .join("uploads")
            .join("trash-log")
            .join(HTACCESS_FILE);
        let contents = fs::read_to_string(htaccess)?;
        assert_eq!(contents.matches("# BEGIN Trash Log").count(), 1);
        Ok(())
    }

    #[test]
    fn delete_and_download_report_missing_file() -> Result<()> {
        let f = fixture()?;
        assert!(matches!(f.exporter.delete(), Err(TrashLogError::FileNotFound)));
        assert!(matches!(f.exporter.download(), Err(TrashLogError::FileNotFound)));

        f.store.append(alice())?;
        f.exporter.generate()?;
        assert!(f.exporter.exists());

        let download = f.exporter.download()?;
        assert_eq!(download.file_name, "trash-log.csv");
        assert_eq!(download.content_length, download.body.len() as u64);
        assert!(download
            .headers()
            .contains(&("Content-Disposition", "attachment; filename=\"trash-log.csv\"".to_string())));

        f.exporter.delete()?;
        assert!(!f.exporter.exists());
        assert!(matches!(f.exporter.delete(), Err(TrashLogError::FileNotFound)));
        Ok(())
    }

    #[test]
    fn missing_upload_dir_is_storage_unavailable() -> Result<()> {
        let f = fixture()?;
        let config = TrashLogConfig::builder().without_upload_dir().build();
        let exporter = CsvExporter::new(f.store.clone(), f.tokens.clone(), &config);
        f.store.append(alice())?;

        assert!(exporter.path().is_none());
        assert!(matches!(exporter.generate(), Err(TrashLogError::StorageUnavailable)));
        Ok(())
    }

    #[test]
    fn url_carries_a_link_token_for_the_actor() -> Result<()> {
        let f = fixture()?;
        let admin = Actor::new(4, "Root", Role::Administrator);
        let url = f.exporter.url(Some(&admin));

        let prefix = "https://site.test/admin/csv/download?action=trash_log_download_csv&nonce=";
        assert!(url.starts_with(prefix), "{url}");
        let nonce = &url[prefix.len()..];
        assert!(f.tokens.verify(nonce, TokenAction::DownloadLink, 4));
        assert!(!f.tokens.verify(nonce, TokenAction::Admin, 4));
        Ok(())
    }
}
