use crate::error::GlyphBookError;
use crate::numwords;
use crate::paginate::{PagePlan, TocEntry};
use base64::Engine;
use std::fmt::Display;
use std::fmt::Write as _;
use std::path::Path;

/// Presentation switches shared by every generated page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageStyle {
    /// Render glyphs in grayscale.
    pub bw: bool,
    /// Stretch every image to the full column width (word books).
    pub normalize_width: bool,
    /// Embed images as data URIs instead of file:// references.
    pub inline_images: bool,
    pub column_width_px: u32,
}

const PAGE_CSS: &str = "\
@page { size: letter; margin: 0.88in 2in 1in 2in; }\n\
* { margin: 0; padding: 0; box-sizing: border-box; }\n\
body { font-family: Georgia, serif; color: #1a1a1a; }\n\
.running-head { display: flex; justify-content: space-between; align-items: baseline;\n\
  height: 0.75in; font-size: 10pt; font-variant-numeric: oldstyle-nums; }\n\
.running-head.verso { flex-direction: row-reverse; }\n\
.columns { display: flex; gap: 10px; align-items: flex-start; }\n\
.column { display: flex; flex-direction: column; }\n\
.column img { max-width: 100%; display: block; margin-bottom: 4px; }\n\
body.bw img { filter: grayscale(100%); }\n\
body.normalize .column img { width: 100%; }\n\
.toc h1, .title h1 { font-size: 24pt; font-weight: normal; margin-bottom: 0.5in; }\n\
.toc table { width: 100%; border-collapse: collapse; font-size: 11pt; }\n\
.toc td { padding: 3pt 0; }\n\
.toc td.page { text-align: right; }\n\
.title { display: flex; flex-direction: column; justify-content: center;\n\
  text-align: center; height: 9in; }\n\
.title .subtitle { font-size: 14pt; font-style: italic; margin-top: 0.25in; }\n";

/// One content page: running head plus the laid-out image columns.
pub fn content_page<T: Display>(
    plan: &PagePlan<T>,
    style: &PageStyle,
) -> Result<String, GlyphBookError> {
    let mut body_class = String::new();
    if style.bw {
        body_class.push_str(" bw");
    }
    if style.normalize_width {
        body_class.push_str(" normalize");
    }

    let mut out = document_head(&body_class);
    let side = if plan.is_recto { "recto" } else { "verso" };
    let _ = write!(
        out,
        "<div class=\"running-head {}\"><span class=\"range\">{}&ndash;{}</span>\
         <span class=\"page-number\">{}</span></div>\n",
        side, plan.start, plan.end, plan.page_number
    );

    out.push_str("<div class=\"columns\">\n");
    for column in &plan.columns {
        let _ = write!(
            out,
            "<div class=\"column\" style=\"width: {}px\">\n",
            style.column_width_px
        );
        for item in column {
            let src = image_src(&item.image, style.inline_images)?;
            let _ = write!(out, "<img src=\"{}\" alt=\"{}\">\n", src, item.id);
        }
        out.push_str("</div>\n");
    }
    out.push_str("</div>\n</body>\n</html>\n");
    Ok(out)
}

/// Table of contents: one chapter row per 1000-wide range.
pub fn toc_page(entries: &[TocEntry], style: &PageStyle) -> String {
    let body_class = if style.bw { " bw" } else { "" };
    let mut out = document_head(body_class);
    out.push_str("<div class=\"toc\">\n<h1>Contents</h1>\n<table>\n");
    for (chapter, entry) in entries.iter().enumerate() {
        let chapter_word = numwords::to_words(chapter as u64 + 1);
        let _ = write!(
            out,
            "<tr><td>Chapter {}</td><td>{}&ndash;{}</td><td class=\"page\">{}</td></tr>\n",
            escape(&chapter_word),
            entry.range_start,
            entry.range_end,
            entry.page_number
        );
    }
    out.push_str("</table>\n</div>\n</body>\n</html>\n");
    out
}

/// Title page for a number book.
pub fn title_page(start: u64, max_number: u64, style: &PageStyle) -> String {
    let body_class = if style.bw { " bw" } else { "" };
    let mut out = document_head(body_class);
    let _ = write!(
        out,
        "<div class=\"title\">\n<h1>The Numbers</h1>\n\
         <div class=\"subtitle\">from {} to {}</div>\n</div>\n</body>\n</html>\n",
        escape(&numwords::to_words(start)),
        escape(&max_number_text(max_number))
    );
    out
}

fn document_head(body_class: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>\n{}</style>\n</head>\n<body class=\"{}\">\n",
        PAGE_CSS,
        body_class.trim()
    )
}

/// "50 thousand" for round thousands, comma-grouped digits otherwise.
fn max_number_text(max_number: u64) -> String {
    if max_number >= 1000 && max_number % 1000 == 0 {
        format!("{} thousand", max_number / 1000)
    } else {
        group_thousands(max_number)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn image_src(path: &Path, inline: bool) -> Result<String, GlyphBookError> {
    if inline {
        let bytes = std::fs::read(path)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        return Ok(format!("data:image/png;base64,{}", encoded));
    }
    let absolute = std::path::absolute(path)?;
    Ok(format!("file://{}", absolute.display()))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
