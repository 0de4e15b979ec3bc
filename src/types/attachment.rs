//! File and image attachments sent alongside a prompt.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::AskflowError;

use super::message::ContentPart;

/// A document or image carried as a base64 data URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub data_uri: String,
}

/// How an attachment is presented to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Image,
}

impl Attachment {
    /// Wrap raw bytes of the given MIME type.
    pub fn from_bytes(name: impl Into<String>, mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            data_uri: format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
        }
    }

    /// A PDF document.
    pub fn pdf(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::from_bytes(name, "application/pdf", bytes)
    }

    /// A PNG image.
    pub fn png(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::from_bytes(name, "image/png", bytes)
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AskflowError> {
        let path = path.as_ref();
        let mime_type = mime_for_path(path).ok_or_else(|| {
            AskflowError::Configuration(format!(
                "unsupported attachment type: {}",
                path.display()
            ))
        })?;
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_bytes(name, mime_type, &bytes))
    }

    /// Classify by the MIME type embedded in the data URI.
    pub fn kind(&self) -> Option<AttachmentKind> {
        let header = self.data_uri.split(',').next().unwrap_or_default();
        if header.contains("/pdf") {
            Some(AttachmentKind::Pdf)
        } else if header.contains("image/") {
            Some(AttachmentKind::Image)
        } else {
            None
        }
    }

    pub(crate) fn to_content_part(&self) -> ContentPart {
        match self.kind() {
            Some(AttachmentKind::Image) => ContentPart::Image {
                data_uri: self.data_uri.clone(),
            },
            _ => ContentPart::File {
                name: self.name.clone(),
                data_uri: self.data_uri.clone(),
            },
        }
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
