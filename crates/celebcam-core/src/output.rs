//! HTML and plain-text output for a [`ResultView`].

use crate::render::{Card, ResultItem, ResultView, PROFILE_LINK_TEXT};
use escaper::{encode_attribute, encode_minimal};
use std::fmt::Write;

/// Render the `#result` container as an HTML fragment.
///
/// Messages come first as paragraphs, followed by an `images-container`
/// holding every card. Backend-provided text is escaped.
pub fn to_html_fragment(view: &ResultView) -> String {
    let mut out = String::from("<div id=\"result\">\n");

    for item in &view.items {
        match item {
            ResultItem::Card(_) => {}
            ResultItem::Error { .. } => {
                let text = item.message().unwrap_or_default();
                let _ = writeln!(out, "  <p class=\"error\">{}</p>", encode_minimal(&text));
            }
            _ => {
                let text = item.message().unwrap_or_default();
                let _ = writeln!(out, "  <p>{}</p>", encode_minimal(&text));
            }
        }
    }

    let cards: Vec<&Card> = view.cards().collect();
    if !cards.is_empty() {
        out.push_str("  <div class=\"images-container\">\n");
        for card in cards {
            write_card(&mut out, card);
        }
        out.push_str("  </div>\n");
    }

    out.push_str("</div>\n");
    out
}

fn write_card(out: &mut String, card: &Card) {
    let _ = writeln!(out, "    <div class=\"card\" data-face=\"{}\">", card.face);
    out.push_str("      <div class=\"celeb-image-container\">\n");
    let _ = writeln!(
        out,
        "        <img src=\"{}\" alt=\"{}\" class=\"celeb-image img-fluid\" style=\"max-height: 300px\">",
        encode_attribute(&card.portrait_url),
        encode_attribute(&card.name),
    );
    out.push_str("      </div>\n");
    out.push_str("      <ul style=\"color: #000\">\n");
    for line in card.lines() {
        let _ = writeln!(out, "        <li>{}</li>", encode_minimal(&line));
    }
    let _ = writeln!(
        out,
        "        <li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>",
        encode_attribute(&card.profile_url),
        PROFILE_LINK_TEXT,
    );
    out.push_str("      </ul>\n");
    out.push_str("    </div>\n");
}

/// Render a standalone HTML page around the result fragment.
pub fn to_html_page(view: &ResultView) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>celebcam results</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        to_html_fragment(view)
    )
}

const STYLE: &str = "\
.images-container { display: flex; flex-wrap: wrap; gap: 1rem; }
.card { border: 1px solid #ccc; border-radius: 8px; padding: 1rem; background: #fff; }
.error { color: #b00020; }
";

/// Render the view as plain text, one block per item in face order.
pub fn to_text(view: &ResultView) -> String {
    let mut out = String::new();
    for item in &view.items {
        match item {
            ResultItem::Card(card) => {
                let _ = writeln!(out, "[face {}]", card.face);
                for line in card.lines() {
                    let _ = writeln!(out, "  {line}");
                }
                let _ = writeln!(out, "  {PROFILE_LINK_TEXT}: {}", card.profile_url);
                let _ = writeln!(out, "  Portrait: {}", card.portrait_url);
            }
            other => {
                let _ = writeln!(out, "{}", other.message().unwrap_or_default());
            }
        }
    }
    out
}
