//! PDF rendering of a synthesized health report.
//!
//! A4 pages, builtin Helvetica, one section per workflow stage. Long lines
//! wrap and a fresh page is started when the cursor reaches the bottom
//! margin.

use printpdf::*;
use std::io::BufWriter;

use thiserror::Error;

use crate::agents::report::PatientHealthReport;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("PDF render error: {0}")]
    Render(String),
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 280.0;
const BOTTOM_MM: f32 = 20.0;
const WRAP_COLUMNS: usize = 90;

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: Mm,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Render(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Render(format!("font error: {e}")))?;
        Ok(Self { doc, layer, font, bold, y: Mm(TOP_MM) })
    }

    fn advance(&mut self, step: f32) {
        self.y -= Mm(step);
        if self.y < Mm(BOTTOM_MM) {
            let (page, layer) =
                self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = Mm(TOP_MM);
        }
    }

    fn heading(&mut self, text: &str) {
        self.advance(4.0);
        self.layer.use_text(text, 12.0, Mm(20.0), self.y, &self.bold);
        self.advance(6.0);
    }

    fn line(&mut self, text: &str, indent: f32) {
        for wrapped in wrap_text(text, WRAP_COLUMNS) {
            self.layer.use_text(&wrapped, 9.0, Mm(indent), self.y, &self.font);
            self.advance(4.5);
        }
    }

    fn bullet(&mut self, text: &str) {
        self.line(&format!("· {text}"), 25.0);
    }

    fn finish(self) -> Result<Vec<u8>, PdfError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| PdfError::Render(format!("save error: {e}")))?;
        buf.into_inner().map_err(|e| PdfError::Render(format!("buffer error: {e}")))
    }
}

/// Word-wrap a line to at most `max_chars` columns.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Render the report to PDF bytes.
pub fn render_report_pdf(
    report: &PatientHealthReport,
    generated_at: &str,
) -> Result<Vec<u8>, PdfError> {
    let mut pdf = PdfWriter::new("Overall Health Report")?;

    pdf.layer.use_text("Overall Health Report", 16.0, Mm(20.0), pdf.y, &pdf.bold);
    pdf.advance(6.0);
    pdf.line(&format!("Generated: {generated_at}"), 20.0);

    // Patient overview
    pdf.heading("PATIENT OVERVIEW");
    if report.final_report.patient_overview.is_empty() {
        pdf.line("No overview available.", 25.0);
    } else {
        pdf.line(&report.final_report.patient_overview, 25.0);
    }
    if !report.final_report.risk_level.is_empty() {
        pdf.line(&format!("Risk level: {}", report.final_report.risk_level), 25.0);
    }
    if let Some(comment) = &report.final_report.summary_comment {
        pdf.line(comment, 25.0);
    }

    // Risk and severity
    let risk = &report.risk_and_severity;
    if !risk.disease_risks.is_empty() || risk.overall_health_index.is_some() {
        pdf.heading("RISK & SEVERITY");
        if let Some(index) = risk.overall_health_index {
            let severity = risk.overall_severity.as_deref().unwrap_or("n/a");
            pdf.line(
                &format!("Overall health index: {index:.0}/100 — severity {severity}"),
                25.0,
            );
        }
        for disease in &risk.disease_risks {
            pdf.bullet(&format!(
                "{}: {:.0}/100 ({})",
                disease.disease, disease.risk_score, disease.severity_level
            ));
        }
    }

    // Timeline
    if !report.timeline.events.is_empty() {
        pdf.heading("MEDICAL TIMELINE");
        for event in &report.timeline.events {
            let date = event.date.as_deref().unwrap_or("undated");
            pdf.bullet(&format!("{date} — {}: {}", event.event_type, event.description));
        }
    }

    // Clinical trends
    if !report.clinical_trends.trends.is_empty() {
        pdf.heading("CLINICAL TRENDS");
        for trend in &report.clinical_trends.trends {
            let value = trend
                .current_value
                .map(|v| format!("{v}"))
                .unwrap_or_else(|| "n/a".into());
            pdf.bullet(&format!(
                "{}: {} ({}, {})",
                trend.metric, value, trend.trend, trend.status
            ));
        }
        if let Some(summary) = &report.clinical_trends.overall_summary {
            pdf.line(summary, 25.0);
        }
    }

    // Possible conditions
    if !report.possible_conditions.conditions.is_empty() {
        pdf.heading("POSSIBLE CONDITIONS");
        for condition in &report.possible_conditions.conditions {
            pdf.bullet(&format!(
                "{} ({:.0}% confidence) — {}",
                condition.condition, condition.confidence, condition.recommended_action
            ));
        }
    }

    // Medications
    let meds = &report.medication_overview;
    if !meds.current_medications.is_empty() || !meds.past_medications.is_empty() {
        pdf.heading("MEDICATIONS");
        for med in &meds.current_medications {
            pdf.bullet(&format_medication(med, "current"));
        }
        for med in &meds.past_medications {
            pdf.bullet(&format_medication(med, "past"));
        }
        if let Some(summary) = &meds.medication_summary {
            pdf.line(summary, 25.0);
        }
    }

    // Next steps
    if !report.final_report.next_steps.is_empty() {
        pdf.heading("NEXT STEPS");
        for (i, step) in report.final_report.next_steps.iter().enumerate() {
            pdf.line(&format!("{}. {step}", i + 1), 25.0);
        }
    }

    pdf.finish()
}

fn format_medication(med: &crate::agents::report::MedicationEntry, status: &str) -> String {
    let mut parts = vec![med.name.clone()];
    if let Some(dosage) = &med.dosage {
        parts.push(dosage.clone());
    }
    if let Some(frequency) = &med.frequency {
        parts.push(frequency.clone());
    }
    format!("[{status}] {}", parts.join(" — "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::report::{
        DiseaseRisk, FinalReport, MedicationEntry, MedicationOverview, RiskAndSeverity, Timeline,
        TimelineEvent,
    };

    fn sample_report() -> PatientHealthReport {
        PatientHealthReport {
            timeline: Timeline {
                events: vec![TimelineEvent {
                    date: Some("2024-03-01".into()),
                    event_type: "doctor_visit".into(),
                    description: "Hypertension follow-up".into(),
                    source: None,
                }],
            },
            risk_and_severity: RiskAndSeverity {
                disease_risks: vec![DiseaseRisk {
                    disease: "Diabetes".into(),
                    risk_score: 58.0,
                    severity_level: "Moderate".into(),
                }],
                overall_health_index: Some(67.0),
                overall_severity: Some("Moderate".into()),
                clinical_comment: None,
            },
            medication_overview: MedicationOverview {
                current_medications: vec![MedicationEntry {
                    name: "Amlodipine".into(),
                    dosage: Some("5mg".into()),
                    frequency: Some("once daily".into()),
                    ..Default::default()
                }],
                ..Default::default()
            },
            final_report: FinalReport {
                patient_overview: "Stable with moderate metabolic risk.".into(),
                risk_level: "Moderate".into(),
                next_steps: vec!["Repeat fasting glucose".into()],
                summary_comment: Some("Glucose trending upward.".into()),
            },
            ..Default::default()
        }
    }

    #[test]
    fn renders_well_formed_pdf_bytes() {
        let bytes = render_report_pdf(&sample_report(), "2024-06-01").unwrap();
        assert!(bytes.len() > 500);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn empty_report_still_renders() {
        let bytes = render_report_pdf(&PatientHealthReport::default(), "2024-06-01").unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn long_report_spills_onto_multiple_pages() {
        let mut report = sample_report();
        report.timeline.events = (0..200)
            .map(|i| TimelineEvent {
                date: Some(format!("2024-01-{:02}", (i % 28) + 1)),
                event_type: "lab_test".into(),
                description: format!("Routine panel number {i} with a long descriptive note"),
                source: None,
            })
            .collect();

        let bytes = render_report_pdf(&report, "2024-06-01").unwrap();
        // Two pages minimum → two /Page objects in the raw stream
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.matches("/Page").count() > 1);
    }

    #[test]
    fn wrap_text_respects_column_limit() {
        let wrapped = wrap_text(
            "one two three four five six seven eight nine ten eleven twelve",
            20,
        );
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| l.len() <= 20));
    }

    #[test]
    fn wrap_text_handles_empty_input() {
        assert_eq!(wrap_text("", 20), vec![String::new()]);
    }
}
