//! Documents: listing, details, files and page images.

use std::path::Path;

use reqwest::StatusCode;
use serde_json::{json, Value};

use super::{ensure_success, expect_status, KonfuzioClient, TRACING_TARGET};
use crate::error::{Error, Result};
use crate::models::{CreatedResource, DatasetStatus, DocumentDetails, DocumentMeta};
use crate::session::{Body, FilePart, HttpResponse, Request, Transport};
use crate::utils::{self, FileSource, DEFAULT_MAXIMUM_SIZE};

/// Content types accepted for downloaded document files.
const DOWNLOAD_CONTENT_TYPES: [&str; 4] = ["application/pdf", "image/jpeg", "image/png", "image/jpg"];

/// Content types accepted for page images.
const IMAGE_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Which rendition of a document file to download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileVariant {
    /// The PDF produced by OCR.
    #[default]
    Ocr,
    /// The file as it was uploaded.
    Original,
}

/// Training and test documents, ordered by id.
pub fn select_dataset_documents(mut documents: Vec<DocumentMeta>) -> Vec<DocumentMeta> {
    documents.sort_by_key(|document| document.id);
    documents.retain(|document| document.dataset_status.is_some_and(DatasetStatus::is_dataset));
    documents
}

/// Body of a file download, if the server actually sent a PDF or image.
pub fn check_downloaded_file(document_id: u64, response: HttpResponse) -> Result<Vec<u8>> {
    if !response.status.is_success() {
        let detail = response.detail();
        tracing::error!(
            target: TRACING_TARGET,
            document_id,
            status = %response.status,
            %detail,
            "Requests error"
        );
        return Err(Error::NotFound(detail));
    }
    match response.mime_essence() {
        Some(mime) if DOWNLOAD_CONTENT_TYPES.contains(&mime.as_str()) => Ok(response.body),
        other => Err(Error::NotFound(format!(
            "CONTENT TYPE of {document_id} is {} and no PDF or image.",
            other.as_deref().unwrap_or("missing")
        ))),
    }
}

impl<T: Transport> KonfuzioClient<T> {
    /// Training and test documents of the configured project, ordered by id.
    pub fn list_documents_meta(&self) -> Result<Vec<DocumentMeta>> {
        let url = self.urls.documents_meta(self.project_id()?);
        let documents = self.fetcher.fetch_all(&self.transport, &url)?;
        Ok(select_dataset_documents(documents))
    }

    fn fetch_document(
        &self,
        document_id: u64,
        include_extractions: bool,
        extra_fields: &str,
    ) -> Result<DocumentDetails> {
        let url = self.urls.document_details(
            self.project_id()?,
            document_id,
            include_extractions,
            extra_fields,
        );
        self.fetcher.get_json(&self.transport, &url)
    }

    /// Full document record, including bounding boxes and hOCR.
    ///
    /// A document without text is returned as well; OCR may still be running.
    pub fn document_details(&self, document_id: u64) -> Result<DocumentDetails> {
        let details = self.fetch_document(document_id, false, "bbox,hocr")?;
        match &details.text {
            None => tracing::warn!(
                target: TRACING_TARGET,
                document_id,
                "Document does not contain any text, check OCR status"
            ),
            Some(text) => tracing::info!(
                target: TRACING_TARGET,
                document_id,
                characters = text.chars().count(),
                annotations = details.annotations.len(),
                sections = details.sections.len(),
                "Fetched document"
            ),
        }
        Ok(details)
    }

    /// Text of a document, `None` until OCR has finished.
    pub fn document_text(&self, document_id: u64) -> Result<Option<String>> {
        let text = self.fetch_document(document_id, false, "bbox")?.text;
        match &text {
            None => tracing::warn!(
                target: TRACING_TARGET,
                document_id,
                "Document does not contain any text, check OCR status"
            ),
            Some(text) => tracing::info!(
                target: TRACING_TARGET,
                document_id,
                characters = text.chars().count(),
                "Fetched document text"
            ),
        }
        Ok(text)
    }

    /// hOCR markup of a document, if the server has it.
    pub fn document_hocr(&self, document_id: u64) -> Result<Option<String>> {
        let hocr = self.fetch_document(document_id, false, "bbox,hocr")?.hocr;
        if hocr.is_none() {
            tracing::warn!(target: TRACING_TARGET, document_id, "Document does not contain hocr");
        }
        Ok(hocr)
    }

    pub(super) fn document_for_annotations(
        &self,
        document_id: u64,
        include_extractions: bool,
    ) -> Result<DocumentDetails> {
        self.fetch_document(document_id, include_extractions, "bbox")
    }

    /// Bounding boxes found by the segmentation model.
    pub fn segmentation_results(&self, document_id: u64) -> Result<Vec<Value>> {
        let url = self
            .urls
            .document_segmentation(self.project_id()?, document_id);
        self.fetcher.get_json(&self.transport, &url)
    }

    /// Download the OCR or original file of a document.
    ///
    /// Fails with [`Error::NotFound`] on an error status or when the server
    /// sends something other than a PDF or image (a login page, for example).
    pub fn download_document(&self, document_id: u64, variant: FileVariant) -> Result<Vec<u8>> {
        let url = match variant {
            FileVariant::Ocr => self.urls.document_ocr_file(document_id),
            FileVariant::Original => self.urls.document_original_file(document_id),
        };
        let content = check_downloaded_file(document_id, self.transport.get(&url)?)?;
        tracing::info!(
            target: TRACING_TARGET,
            document_id,
            host = %self.urls.host(),
            bytes = content.len(),
            "Downloaded file"
        );
        Ok(content)
    }

    /// Whether `url` serves a PNG or JPEG image.
    pub fn is_url_image(&self, url: &str) -> Result<bool> {
        let response = self.transport.head(url)?;
        let mime = response.mime_essence();
        tracing::info!(target: TRACING_TARGET, %url, content_type = ?mime, "Checked content type");
        Ok(mime.is_some_and(|mime| IMAGE_CONTENT_TYPES.contains(&mime.as_str())))
    }

    /// Download and decode images. Every url must serve an image; images
    /// that fail to decode come back as `None`.
    pub fn download_images(&self, urls: &[String]) -> Result<Vec<Option<image::DynamicImage>>> {
        for url in urls {
            if !self.is_url_image(url)? {
                return Err(Error::NotImplemented(format!(
                    "Only images are supported, {url} is not one"
                )));
            }
        }
        urls.iter()
            .map(|url| {
                let response = self.transport.get(url)?;
                if !response.status.is_success() {
                    return Err(Error::NotFound(response.detail()));
                }
                utils::load_image(&FileSource::Bytes(response.body))
            })
            .collect()
    }

    /// Upload a file into the configured project.
    pub fn upload_document(
        &self,
        path: &Path,
        dataset_status: DatasetStatus,
    ) -> Result<CreatedResource> {
        utils::check_file(path, DEFAULT_MAXIMUM_SIZE, false)?;
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document")
            .to_string();

        let body = Body::Multipart {
            fields: vec![
                ("project".to_string(), self.project_id()?.to_string()),
                ("dataset_status".to_string(), dataset_status.code().to_string()),
            ],
            file: FilePart {
                field: "data_file".to_string(),
                file_name: file_name.clone(),
                data,
            },
        };

        let url = self.urls.upload_document();
        let response = self.transport.send(Request::post(&url, body))?;
        let created: CreatedResource = ensure_success(&url, response)?.json()?;
        tracing::info!(
            target: TRACING_TARGET,
            document_id = created.id,
            file = %file_name,
            "Uploaded document"
        );
        Ok(created)
    }

    /// Delete a document. The server must answer 204.
    pub fn delete_document(&self, document_id: u64) -> Result<()> {
        let url = self.urls.document_v1(document_id);
        let body = Body::Json(json!({ "id": document_id }));
        let response = self.transport.send(Request::delete(&url, body))?;
        expect_status(&url, response.status, StatusCode::NO_CONTENT)?;
        tracing::info!(target: TRACING_TARGET, document_id, "Deleted document");
        Ok(())
    }
}
