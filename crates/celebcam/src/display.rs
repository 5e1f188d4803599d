use anyhow::{Context, Result};
use celebcam_core::output::{to_html_fragment, to_html_page, to_text};
use celebcam_core::ResultView;
use clap::ValueEnum;
use std::io::Write;
use std::path::Path;

/// Output format for results written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Html,
    Json,
}

pub fn format_view(view: &ResultView, format: Format) -> Result<String> {
    Ok(match format {
        Format::Text => to_text(view),
        Format::Html => to_html_fragment(view),
        Format::Json => serde_json::to_string_pretty(view)? + "\n",
    })
}

/// Write the formatted view and flush, so a closed pipe surfaces as an error.
pub fn write_view<W: Write>(out: &mut W, view: &ResultView, format: Format) -> Result<()> {
    out.write_all(format_view(view, format)?.as_bytes())
        .context("failed to write result")?;
    out.flush().context("failed to flush output")?;
    Ok(())
}

/// Print the view to stdout, and write a standalone page to `html_out` if set.
pub fn emit(view: &ResultView, format: Format, html_out: Option<&Path>) -> Result<()> {
    write_view(&mut std::io::stdout().lock(), view, format)?;
    if let Some(path) = html_out {
        std::fs::write(path, to_html_page(view))
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote result page");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use celebcam_core::ResultItem;

    #[test]
    fn test_json_is_tagged() {
        let view = ResultView {
            items: vec![ResultItem::NoMatch { face: 1 }],
        };
        let json = format_view(&view, Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["items"][0]["kind"], "no_match");
        assert_eq!(value["items"][0]["face"], 1);
    }

    #[test]
    fn test_text_and_html_differ() {
        let view = ResultView {
            items: vec![ResultItem::NoFaces],
        };
        let text = format_view(&view, Format::Text).unwrap();
        let html = format_view(&view, Format::Html).unwrap();
        assert_eq!(text, "No faces detected in the uploaded image\n");
        assert!(html.contains("<p>No faces detected in the uploaded image</p>"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_closed_output_is_an_error() {
        let view = ResultView {
            items: vec![ResultItem::NoFaces],
        };
        let err = write_view(&mut ClosedPipe, &view, Format::Text).unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_write_view_writes_formatted_text() {
        let view = ResultView {
            items: vec![ResultItem::NoMatch { face: 2 }],
        };
        let mut buf = Vec::new();
        write_view(&mut buf, &view, Format::Text).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), format_view(&view, Format::Text).unwrap());
    }
}
