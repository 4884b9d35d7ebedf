//! Client for the external document renderer that turns report data into PDFs.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use strum_macros::{AsRefStr, Display};
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no document renderer configured")]
    NotConfigured,

    #[error("renderer unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("renderer answered with status {0}")]
    Status(u16),
}

impl RenderError {
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, RenderError::NotConfigured)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReportTemplate {
    ReportLateness,
    ReportHoursWorked,
    ReportAbsences,
}

impl ReportTemplate {
    /// Download name, e.g. `report_lateness_20240301_20240331.pdf`.
    pub fn file_name(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}_{}_{}.pdf",
            self.as_ref(),
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }
}

#[derive(Clone)]
pub struct DocumentRenderer {
    client: reqwest::Client,
    url: Option<String>,
}

impl DocumentRenderer {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// POSTs `{template, data}` and returns the rendered bytes.
    pub async fn render<T: Serialize>(
        &self,
        template: ReportTemplate,
        data: &T,
    ) -> Result<Vec<u8>, RenderError> {
        let url = self.url.as_deref().ok_or(RenderError::NotConfigured)?;

        debug!(template = %template, url, "Rendering report");

        let response = self
            .client
            .post(url)
            .json(&json!({ "template": template.as_ref(), "data": data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(template = %template, status = %status, "Renderer rejected report");
            return Err(RenderError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_includes_period() {
        let name = ReportTemplate::ReportHoursWorked.file_name(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        assert_eq!(name, "report_hours_worked_20240301_20240331.pdf");
    }

    #[actix_web::test]
    async fn unconfigured_renderer_fails_fast() {
        let renderer = DocumentRenderer::new(None);
        let err = renderer
            .render(ReportTemplate::ReportAbsences, &json!([]))
            .await
            .unwrap_err();
        assert!(err.is_unconfigured());
    }
}
