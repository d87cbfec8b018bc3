//! Annotations of a document.

use serde::Serialize;

use super::{ensure_success, KonfuzioClient, TRACING_TARGET};
use crate::error::Result;
use crate::models::{Annotation, NewAnnotation};
use crate::session::{form_fields, Body, Request, Transport};

/// Order by start offset; annotations without one go last.
pub fn sort_by_start_offset(annotations: &mut [Annotation]) {
    annotations.sort_by_key(|annotation| (annotation.start_offset.is_none(), annotation.start_offset));
}

/// Human revised or correct annotations plus local proposals (no server id yet).
pub fn select_annotations(mut annotations: Vec<Annotation>) -> Vec<Annotation> {
    annotations.retain(|a| a.revised || a.is_correct || a.id.is_none());
    sort_by_start_offset(&mut annotations);
    annotations
}

/// Only human revised or correct annotations.
pub fn select_confirmed_annotations(mut annotations: Vec<Annotation>) -> Vec<Annotation> {
    annotations.retain(|a| a.revised || a.is_correct);
    sort_by_start_offset(&mut annotations);
    annotations
}

#[derive(Serialize)]
struct AnnotationForm<'a> {
    #[serde(flatten)]
    annotation: &'a NewAnnotation,
    csrfmiddlewaretoken: &'a str,
}

impl<T: Transport> KonfuzioClient<T> {
    /// Revised and correct annotations of a document plus unsaved proposals,
    /// ordered by start offset.
    pub fn document_annotations(
        &self,
        document_id: u64,
        include_extractions: bool,
    ) -> Result<Vec<Annotation>> {
        let document = self.document_for_annotations(document_id, include_extractions)?;
        let annotations = select_annotations(document.annotations);
        tracing::info!(
            target: TRACING_TARGET,
            document_id,
            annotations = annotations.len(),
            "Fetched annotations"
        );
        Ok(annotations)
    }

    /// Revised and correct annotations of a document, ordered by start offset.
    pub fn confirmed_annotations(&self, document_id: u64) -> Result<Vec<Annotation>> {
        let document = self.document_for_annotations(document_id, false)?;
        Ok(select_confirmed_annotations(document.annotations))
    }

    /// Add one annotation through the form endpoint.
    ///
    /// The form is CSRF protected, so a fresh token is read from the host's
    /// cookie first.
    pub fn post_annotation(
        &self,
        document_id: u64,
        annotation: &NewAnnotation,
    ) -> Result<Annotation> {
        let url = self
            .urls
            .document_annotations(self.project_id()?, document_id);
        let csrf = self.transport.csrf_token(self.urls.host())?;
        let form = serde_json::to_value(AnnotationForm {
            annotation,
            csrfmiddlewaretoken: &csrf,
        })?;
        let request = Request::post(&url, Body::Form(form_fields(&form))).with_referer(self.urls.host());
        let created: Annotation = ensure_success(&url, self.transport.send(request)?)?.json()?;
        tracing::info!(
            target: TRACING_TARGET,
            document_id,
            annotation_id = ?created.id,
            "Posted annotation"
        );
        Ok(created)
    }

    /// Add many annotations in one JSON request.
    pub fn post_annotations_bulk(
        &self,
        document_id: u64,
        annotations: &[NewAnnotation],
    ) -> Result<()> {
        let url = self
            .urls
            .document_annotations(self.project_id()?, document_id);
        let body = Body::Json(serde_json::to_value(annotations)?);
        ensure_success(&url, self.transport.send(Request::post(&url, body))?)?;
        tracing::info!(
            target: TRACING_TARGET,
            document_id,
            count = annotations.len(),
            "Posted annotations"
        );
        Ok(())
    }

    /// Delete one annotation of a document in the configured project.
    pub fn delete_annotation(&self, document_id: u64, annotation_id: u64) -> Result<()> {
        let url = self
            .urls
            .document_annotation(self.project_id()?, document_id, annotation_id);
        ensure_success(&url, self.transport.send(Request::delete(&url, Body::Empty))?)?;
        tracing::info!(target: TRACING_TARGET, document_id, annotation_id, "Deleted annotation");
        Ok(())
    }
}
