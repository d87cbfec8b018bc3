//! Labels and templates of a project.

use reqwest::StatusCode;
use serde_json::json;

use super::{ensure_success, expect_status, KonfuzioClient, TRACING_TARGET};
use crate::error::Result;
use crate::models::{CreatedResource, Label, Template};
use crate::session::{Body, Request, Transport};

impl<T: Transport> KonfuzioClient<T> {
    /// Labels of the configured project, ordered by id.
    pub fn project_labels(&self) -> Result<Vec<Label>> {
        let mut labels = self.project_details(None)?.labels;
        labels.sort_by_key(|label| label.id);
        Ok(labels)
    }

    /// Templates of the configured project, ordered by id.
    pub fn project_templates(&self) -> Result<Vec<Template>> {
        let mut templates = self.project_details(None)?.section_labels;
        templates.sort_by_key(|template| template.id);
        Ok(templates)
    }

    /// Create a label used by `templates` and return its id.
    ///
    /// The server must answer 201.
    pub fn create_label(&self, project_id: u64, name: &str, templates: &[Template]) -> Result<u64> {
        let url = self.urls.create_label();
        let template_ids: Vec<u64> = templates.iter().map(|template| template.id).collect();
        let body = json!({
            "project": project_id,
            "text": name,
            "templates": template_ids,
        });
        let response = ensure_success(&url, self.transport.send(Request::post(&url, Body::Json(body)))?)?;
        expect_status(&url, response.status, StatusCode::CREATED)?;
        let created: CreatedResource = response.json()?;
        tracing::info!(target: TRACING_TARGET, label_id = created.id, %name, "Created label");
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use reqwest::StatusCode;

    use crate::api::KonfuzioClient;
    use crate::error::Error;
    use crate::fetch::{Fetcher, RetryPolicy};
    use crate::models::Template;
    use crate::session::Body;
    use crate::settings::Settings;
    use crate::testing::{json_response, RecordingSleeper, ScriptedTransport};

    fn client(transport: ScriptedTransport) -> KonfuzioClient<ScriptedTransport> {
        let settings = Settings {
            host: "https://konfuzio.test".to_string(),
            project_id: Some(1),
            ..Settings::default()
        };
        let fetcher = Fetcher::with_sleeper(RetryPolicy::default(), RecordingSleeper::default());
        KonfuzioClient::with_transport(settings, transport, fetcher)
    }

    #[test]
    fn labels_and_templates_are_sorted_by_id() {
        let project = json!({
            "id": 1,
            "name": "Invoices",
            "labels": [{"id": 9, "text": "Total"}, {"id": 2, "text": "Date"}],
            "section_labels": [{"id": 30, "name": "Line item"}, {"id": 4, "name": "Header"}]
        });
        let transport = ScriptedTransport::new(vec![
            json_response(200, project.clone()),
            json_response(200, project),
        ]);
        let client = client(transport);

        let labels: Vec<u64> = client.project_labels().unwrap().iter().map(|l| l.id).collect();
        assert_eq!(labels, vec![2, 9]);
        let templates: Vec<String> = client
            .project_templates()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(templates, vec!["Header", "Line item"]);
    }

    #[test]
    fn create_label_posts_template_ids() {
        let transport = ScriptedTransport::new(vec![json_response(201, json!({"id": 15}))]);
        let client = client(transport);
        let templates: Vec<Template> =
            serde_json::from_value(json!([{"id": 4, "name": "Header"}])).unwrap();
        assert_eq!(client.create_label(1, "Total", &templates).unwrap(), 15);

        let sent = client.transport().sent();
        assert_eq!(
            sent[0].body,
            Body::Json(json!({"project": 1, "text": "Total", "templates": [4]}))
        );
    }

    #[test]
    fn create_label_rejects_status_other_than_created() {
        let transport = ScriptedTransport::new(vec![json_response(200, json!({"id": 15}))]);
        let err = client(transport).create_label(1, "Total", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedStatus {
                expected: StatusCode::CREATED,
                actual: StatusCode::OK,
                ..
            }
        ));
    }
}
