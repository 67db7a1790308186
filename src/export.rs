// JSON and HTML report export. Both paths write through a temp file in the
// destination directory and persist over the target, so a failed export
// never leaves a partial file behind.

use std::io::Write;
use std::path::Path;

use minijinja::Environment;

use crate::models::SystemSnapshot;

static REPORT_TEMPLATE: &str = include_str!("../templates/report.html");

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("rendering report: {0}")]
    Render(#[from] minijinja::Error),
}

/// Format a byte count with 1024-based units, two decimals, capped at TB.
pub fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Pretty-printed JSON, UTF-8 with non-ASCII preserved.
pub fn save_json(snapshot: &SystemSnapshot, out_path: &Path) -> Result<(), ExportError> {
    let body = serde_json::to_string_pretty(snapshot)?;
    write_atomic(out_path, body.as_bytes())
}

/// Render the embedded HTML template and write it out. All presentation
/// formatting lives in the template; the snapshot is bound as `data`.
pub fn save_report(snapshot: &SystemSnapshot, out_path: &Path) -> Result<(), ExportError> {
    let html = render_report(snapshot)?;
    write_atomic(out_path, html.as_bytes())
}

pub(crate) fn render_report(snapshot: &SystemSnapshot) -> Result<String, ExportError> {
    let mut env = Environment::new();
    env.add_filter("human_bytes", human_bytes);
    // The .html name keeps minijinja's default auto-escaping on.
    env.add_template("report.html", REPORT_TEMPLATE)?;
    let tmpl = env.get_template("report.html")?;
    Ok(tmpl.render(minijinja::context! { data => snapshot })?)
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_atomic(out_path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let dir = out_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(out_path, e))?;
    tmp.write_all(bytes).map_err(|e| io_error(out_path, e))?;
    tmp.persist(out_path)
        .map(|_| ())
        .map_err(|e| io_error(out_path, e.error))
}
