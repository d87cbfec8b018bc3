//! Endpoint URLs of the Konfuzio server.

/// Builds endpoint URLs relative to one host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Urls {
    host: String,
}

impl Urls {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn auth_token(&self) -> String {
        format!("{}/api/token-auth/", self.host)
    }

    /// Listing and creating projects share one endpoint.
    pub fn projects(&self) -> String {
        format!("{}/api/projects/", self.host)
    }

    pub fn project(&self, project_id: u64) -> String {
        format!("{}/api/projects/{project_id}/", self.host)
    }

    pub fn documents_meta(&self, project_id: u64) -> String {
        format!("{}/api/projects/{project_id}/docs/", self.host)
    }

    pub fn document_details(
        &self,
        project_id: u64,
        document_id: u64,
        include_extractions: bool,
        extra_fields: &str,
    ) -> String {
        // The server is a Django app and expects Python-style booleans.
        let include = if include_extractions { "True" } else { "False" };
        format!(
            "{}/api/projects/{project_id}/docs/{document_id}/?include_extractions={include}&extra_fields={extra_fields}",
            self.host
        )
    }

    pub fn document_annotations(&self, project_id: u64, document_id: u64) -> String {
        format!(
            "{}/api/projects/{project_id}/docs/{document_id}/annotations/",
            self.host
        )
    }

    pub fn document_annotation(&self, project_id: u64, document_id: u64, annotation_id: u64) -> String {
        format!(
            "{}/api/projects/{project_id}/docs/{document_id}/annotations/{annotation_id}/",
            self.host
        )
    }

    pub fn document_segmentation(&self, project_id: u64, document_id: u64) -> String {
        format!(
            "{}/api/projects/{project_id}/docs/{document_id}/segmentation/",
            self.host
        )
    }

    pub fn upload_document(&self) -> String {
        format!("{}/api/v2/docs/", self.host)
    }

    pub fn document_v1(&self, document_id: u64) -> String {
        format!("{}/api/v1/docs/{document_id}/", self.host)
    }

    pub fn document_ocr_file(&self, document_id: u64) -> String {
        format!("{}/doc/show/{document_id}/", self.host)
    }

    pub fn document_original_file(&self, document_id: u64) -> String {
        format!("{}/doc/show-original/{document_id}/", self.host)
    }

    pub fn create_label(&self) -> String {
        format!("{}/api/v2/labels/", self.host)
    }

    /// Page image paths come back host-relative from the document endpoint.
    pub fn page_image(&self, image_path: &str) -> String {
        if image_path.starts_with("http://") || image_path.starts_with("https://") {
            image_path.to_string()
        } else {
            format!("{}/{}", self.host, image_path.trim_start_matches('/'))
        }
    }
}

/// Whether a string is an absolute URL with scheme and host.
pub fn is_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_document_details_url() {
        let urls = Urls::new("https://app.konfuzio.com/");
        assert_eq!(
            urls.document_details(1, 44, false, "bbox,hocr"),
            "https://app.konfuzio.com/api/projects/1/docs/44/?include_extractions=False&extra_fields=bbox,hocr"
        );
    }

    #[test]
    fn page_image_accepts_relative_and_absolute_paths() {
        let urls = Urls::new("https://app.konfuzio.com");
        assert_eq!(
            urls.page_image("/page/show/1/"),
            "https://app.konfuzio.com/page/show/1/"
        );
        assert_eq!(
            urls.page_image("https://cdn.example.com/p.png"),
            "https://cdn.example.com/p.png"
        );
    }

    #[test]
    fn detects_urls() {
        assert!(is_url("https://app.konfuzio.com/api/"));
        assert!(!is_url("app.konfuzio.com"));
        assert!(!is_url("/relative/path"));
    }
}
