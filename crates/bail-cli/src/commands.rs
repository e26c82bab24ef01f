//! Subcommand helpers that do not touch the terminal

use bail_render::ProgressReport;
use bail_schema::Schema;
use bail_state::MutationOp;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum OpsInput {
    Many(Vec<MutationOp>),
    One(MutationOp),
}

/// Parse a JSON batch: an array of operations or a single one
///
/// # Errors
/// Returns the JSON error for anything else
pub fn parse_ops(input: &str) -> Result<Vec<MutationOp>, serde_json::Error> {
    Ok(match serde_json::from_str(input)? {
        OpsInput::Many(ops) => ops,
        OpsInput::One(op) => vec![op],
    })
}

/// Field catalogue, one line per field
#[must_use]
pub fn schema_listing(schema: &Schema) -> String {
    let mut out = format!("{} ({})\n", schema.name(), schema.fingerprint().short());
    for section in schema.sections() {
        out.push_str(&format!("\n[{}] {}\n", section.key(), section.label()));
        for spec in schema.section_fields(section) {
            out.push_str(&line(
                spec.key(),
                spec.kind().type_name(),
                spec.is_required(),
                spec.visible_when().is_some(),
                spec.label(),
            ));
            for item in schema.item_fields(spec) {
                out.push_str(&line(
                    item.key(),
                    item.kind().type_name(),
                    item.is_required(),
                    item.visible_when().is_some(),
                    item.label(),
                ));
            }
        }
    }
    out
}

fn line(key: &str, kind: &str, required: bool, conditional: bool, label: &str) -> String {
    let flags = match (required, conditional) {
        (true, true) => "required, conditional",
        (true, false) => "required",
        (false, true) => "conditional",
        (false, false) => "",
    };
    format!("  {key:<70} {kind:<8} {flags:<22} {label}\n")
}

/// Human-readable progress summary
#[must_use]
pub fn progress_text(report: &ProgressReport) -> String {
    let percent = |p: Option<u8>| p.map_or_else(|| "   -".to_string(), |p| format!("{p:>3}%"));
    let mut out = String::new();
    for section in &report.sections {
        out.push_str(&format!(
            "{} {:<24} {}/{}\n",
            percent(section.percent),
            section.key,
            section.filled,
            section.required
        ));
        for path in &section.missing {
            out.push_str(&format!("       missing {path}\n"));
        }
    }
    out.push_str(&format!(
        "{} total {}/{}{}\n",
        percent(report.percent),
        report.filled,
        report.required,
        if report.complete { " (complete)" } else { "" }
    ));
    out
}
