//! Rendering of diagnostics against source text.
//!
//! The core never prints; embedders hand a diagnostic list plus the source it
//! was produced from to [`render`] and decide what to do with the resulting
//! string.

use ariadne::{Config, Label, Report, ReportKind, Source};

use super::Error;

/// Renders diagnostics as human-readable reports.
///
/// Aggregates are flattened so each underlying diagnostic gets its own report.
/// Diagnostics without a span degrade to a single summary line.
pub fn render(source: &str, file_name: &str, errors: &[Error]) -> String {
    let mut out = String::new();
    for error in errors {
        render_one(source, file_name, error, &mut out);
    }
    out
}

fn render_one(source: &str, file_name: &str, error: &Error, out: &mut String) {
    if let Error::MultipleErrors { errors } = error {
        for inner in errors {
            render_one(source, file_name, inner, out);
        }
        return;
    }

    match error.span() {
        Some(span) => {
            let range = span.start..span.end().max(span.start + 1);
            let report = Report::build(ReportKind::Error, file_name, span.start)
                .with_config(Config::default().with_color(false))
                .with_message(error.to_string())
                .with_label(
                    Label::new((file_name, range)).with_message(label_message(error)),
                )
                .finish();

            let mut buf = Vec::new();
            if report
                .write((file_name, Source::from(source)), &mut buf)
                .is_ok()
            {
                out.push_str(&String::from_utf8_lossy(&buf));
            } else {
                out.push_str(&format!("error: {error}\n"));
            }
        }
        None => {
            out.push_str(&format!("error: {error}\n"));
        }
    }
}

fn label_message(error: &Error) -> String {
    match error {
        Error::TypeMismatch { expected, .. } => format!("expected {expected} here"),
        Error::ArityMismatch { expected, .. } => format!("expected {expected} elements"),
        Error::UnresolvedSymbol { name, .. } => format!("`{name}` is not in scope"),
        Error::DuplicateDefinition { name, .. } => format!("`{name}` already defined"),
        Error::NonExhaustiveMatch {
            missing_patterns, ..
        } => format!("missing: {}", missing_patterns.join(", ")),
        Error::InfiniteType { var, .. } => format!("`{var}` would be infinite"),
        Error::ResultErrorTypeViolation { error_type, .. } => {
            format!("`{error_type}` is not Throwable-compatible")
        }
        Error::UnknownPrimitiveType { name, .. } => format!("`{name}` is not a primitive"),
        _ => "here".to_string(),
    }
}
