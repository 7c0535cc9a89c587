//! Streaming multipart form parsing.
//!
//! File parts are spooled to temp files as they arrive rather than buffered
//! in memory, so the relay's footprint stays flat regardless of upload size.
//! Spool files are removed automatically when the parsed form is dropped.

use std::collections::HashMap;

use axum::extract::Multipart;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::config::UploadConfig;
use crate::errors::{Error, Result};

/// A single file part spooled to disk.
#[derive(Debug)]
pub struct FilePart {
    /// Form field name the part arrived under
    pub field_name: String,
    /// Spool file backing the part. Deleted on drop.
    pub file: NamedTempFile,
    /// Client-supplied file name, if any
    pub file_name: Option<String>,
    /// Client-supplied content type, if any
    pub content_type: Option<String>,
    /// Bytes written to the spool file
    pub size_bytes: u64,
}

/// A fully parsed multipart form: scalar fields plus spooled file parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Scalar (non-file) fields. Repeated names keep the last value.
    pub fields: HashMap<String, String>,
    /// File parts in arrival order
    pub files: Vec<FilePart>,
}

impl UploadForm {
    /// First file part submitted under `name`, if any.
    pub fn file_by_name(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|part| part.field_name == name)
    }
}

/// Drain a multipart stream, spooling every file part to `config.spool_dir()`.
///
/// A part counts as a file when the client sent a filename for it; everything
/// else is read as UTF-8 text into `fields`. The combined size of all file
/// parts is checked incrementally against `config.max_file_size` (0 disables
/// the check) so oversized uploads are rejected before they finish arriving.
pub async fn parse_upload_form(mut multipart: Multipart, config: &UploadConfig) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    let spool_dir = config.spool_dir();
    let max_file_size = config.max_file_size;
    let mut total_size = 0u64;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::FormParse {
        message: format!("Failed to read multipart field: {e}"),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        if field.file_name().is_none() {
            // Scalar field. Repeated names overwrite, matching HTML form semantics.
            let value = field.text().await.map_err(|e| Error::FormParse {
                message: format!("Failed to read field '{field_name}': {e}"),
            })?;
            form.fields.insert(field_name, value);
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());

        let spool = NamedTempFile::new_in(&spool_dir).map_err(|e| Error::FormParse {
            message: format!("Failed to create spool file: {e}"),
        })?;
        let mut writer = tokio::fs::File::from_std(spool.reopen().map_err(|e| Error::FormParse {
            message: format!("Failed to open spool file: {e}"),
        })?);

        // Stream file chunks straight to the spool file
        let mut part_size = 0u64;
        let mut chunk_stream = field;

        while let Some(chunk) = chunk_stream.chunk().await.map_err(|e| Error::FormParse {
            message: format!("Failed to read file chunk: {e}"),
        })? {
            part_size += chunk.len() as u64;
            total_size += chunk.len() as u64;

            // Check size limit incrementally to fail fast
            if max_file_size > 0 && total_size > max_file_size {
                tracing::warn!(
                    field_name = %field_name,
                    total_size = total_size,
                    max_file_size = max_file_size,
                    "Upload size limit exceeded, aborting"
                );
                return Err(Error::PayloadTooLarge {
                    message: format!(
                        "File size exceeds maximum allowed size of {} bytes ({} MB)",
                        max_file_size,
                        max_file_size / (1024 * 1024)
                    ),
                });
            }

            writer.write_all(&chunk).await.map_err(|e| Error::FormParse {
                message: format!("Failed to write spool file: {e}"),
            })?;
        }

        writer.flush().await.map_err(|e| Error::FormParse {
            message: format!("Failed to flush spool file: {e}"),
        })?;

        tracing::debug!(
            field_name = %field_name,
            file_name = ?file_name,
            size_bytes = part_size,
            spool_path = %spool.path().display(),
            "Spooled file part"
        );

        form.files.push(FilePart {
            field_name,
            file: spool,
            file_name,
            content_type,
            size_bytes: part_size,
        });
    }

    Ok(form)
}
