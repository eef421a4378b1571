use std::io::{self, Write};

use paylens_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(&mut out, envelope)?,
    }

    Ok(())
}

fn render_table(out: &mut impl Write, envelope: &Envelope<Value>) -> Result<(), CliError> {
    writeln!(out, "request_id  : {}", envelope.meta.request_id)?;
    writeln!(out, "schema      : {}", envelope.meta.schema_version)?;
    writeln!(out, "generated_at: {}", envelope.meta.generated_at)?;
    writeln!(out, "latency_ms  : {}", envelope.meta.latency_ms)?;

    if !envelope.meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    match &envelope.data {
        Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => {
            writeln!(out, "data:")?;
            write_rows(out, rows)?;
        }
        Value::Null => {}
        data => {
            writeln!(out, "data:")?;
            for line in serde_json::to_string_pretty(data)?.lines() {
                writeln!(out, "  {line}")?;
            }
        }
    }

    if !envelope.errors.is_empty() {
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            writeln!(out, "  - {}: {}", error.code, error.message)?;
        }
    }

    Ok(())
}

/// Aligned columns for a list of flat objects. Keys come from the first row.
fn write_rows(out: &mut impl Write, rows: &[Value]) -> io::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        return Ok(());
    };
    let headers = first.keys().cloned().collect::<Vec<_>>();
    let cells = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|key| cell_text(row.get(key).unwrap_or(&Value::Null)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain([header.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    write_line(out, &headers, &widths)?;
    for row in &cells {
        write_line(out, row, &widths)?;
    }
    Ok(())
}

fn write_line(out: &mut impl Write, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "  {}", line.trim_end())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::from("-"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paylens_core::EnvelopeMeta;
    use serde_json::json;

    fn rendered(data: Value) -> String {
        let meta = EnvelopeMeta::new("request-12345", "v1.0.0", 3).expect("meta");
        let envelope = Envelope::success(meta, data);
        let mut buffer = Vec::new();
        render_table(&mut buffer, &envelope).expect("render");
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn object_lists_render_as_aligned_columns() {
        let text = rendered(json!([
            {"slug": "market-expansion", "table": "agg_trans"},
            {"slug": "user-registration", "table": "map_user"},
        ]));

        assert!(text.contains("  slug               table"));
        assert!(text.contains("  market-expansion   agg_trans"));
        assert!(text.contains("  user-registration  map_user"));
    }

    #[test]
    fn nested_data_renders_as_indented_json() {
        let text = rendered(json!({"summary": {"mean_amount": null}}));
        assert!(text.contains("data:\n  {"));
        assert!(text.contains("\"mean_amount\": null"));
    }
}
