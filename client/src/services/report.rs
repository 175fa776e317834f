//! Advisory report export (text or CSV)

use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use shared::AdvisoryReport;

use crate::error::{AppError, AppResult};
use crate::services::advisory::{panels, render_text, PanelBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Csv,
}

impl ExportFormat {
    /// Pick the format from a file extension, defaulting to text
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Text,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(AppError::Configuration(format!(
                "Unknown export format: {}",
                other
            ))),
        }
    }
}

/// One CSV row of an exported report
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    dataset: &'a str,
    field: &'a str,
    value: &'a str,
}

pub struct ReportExporter;

impl ReportExporter {
    pub fn render(report: &AdvisoryReport, format: ExportFormat) -> AppResult<String> {
        match format {
            ExportFormat::Text => Ok(render_text(report)),
            ExportFormat::Csv => Self::to_csv(report),
        }
    }

    /// Report as `dataset,field,value` rows
    pub fn to_csv(report: &AdvisoryReport) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        let status = report.status().to_string();
        wtr.serialize(ReportRow {
            dataset: "report",
            field: "status",
            value: &status,
        })?;

        for panel in panels(report) {
            match &panel.body {
                PanelBody::Ready { lines } => {
                    for line in lines {
                        wtr.serialize(ReportRow {
                            dataset: &panel.title,
                            field: &line.label,
                            value: &line.value,
                        })?;
                    }
                }
                PanelBody::Failed { message } => {
                    wtr.serialize(ReportRow {
                        dataset: &panel.title,
                        field: "error",
                        value: message,
                    })?;
                }
            }
        }

        let bytes = wtr.into_inner().map_err(|e| AppError::Storage(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| AppError::Decode(format!("CSV output: {}", e)))
    }

    /// Write the report to `path`
    pub async fn export(
        report: &AdvisoryReport,
        path: &Path,
        format: ExportFormat,
    ) -> AppResult<()> {
        let body = Self::render(report, format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, body).await?;

        tracing::info!(
            farm_id = %report.farm_id,
            path = %path.display(),
            ?format,
            "Advisory report exported"
        );
        Ok(())
    }
}
