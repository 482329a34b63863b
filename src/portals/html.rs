// src/portals/html.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

const HIDDEN_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Elements that start a new line of text. Everything else is inline.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "option", "p", "pre", "section", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

/// Table cells stay on their row's line, separated by a space.
const CELL_TAGS: [&str; 2] = ["td", "th"];

/// Visible text of an HTML document in document order, skipping script/style/head.
/// Inline markup keeps the source whitespace, so `<b>Licitación</b> Pública` reads
/// as one phrase; block elements end a line. Whitespace runs collapse and blank
/// lines are dropped.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut raw = String::new();
    push_text(doc.root_element(), &mut raw);
    raw.lines()
        .map(collapse_ws)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if HIDDEN_TAGS.contains(&name) {
        return;
    }
    let sep = if BLOCK_TAGS.contains(&name) {
        Some('\n')
    } else if CELL_TAGS.contains(&name) {
        Some(' ')
    } else {
        None
    };

    out.extend(sep);
    for child in el.children() {
        match child.value() {
            // Source line breaks are plain whitespace; only blocks break lines.
            Node::Text(text) => out.extend(text.chars().map(|c| match c {
                '\n' | '\r' => ' ',
                c => c,
            })),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_text(child_el, out);
                }
            }
            _ => {}
        }
    }
    out.extend(sep);
}

/// `<title>` content, trimmed; `None` when missing or blank.
pub fn title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel)
        .next()
        .map(|n| collapse_ws(&n.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

pub fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_and_styles_are_not_visible() {
        let html = r#"<html><head><title> Boletín  Oficial </title><style>.x{}</style></head>
            <body><script>var licitacion = 1;</script>
            <h1>Licitación   Pública</h1><p>Provisión de agua</p></body></html>"#;
        let text = visible_text(html);
        assert_eq!(text, "Licitación Pública\nProvisión de agua");
        assert_eq!(title(html).as_deref(), Some("Boletín Oficial"));
    }

    #[test]
    fn entities_are_decoded() {
        let text = visible_text("<p>Suministro&nbsp;de&nbsp;cloro &amp; soda</p>");
        assert_eq!(text, "Suministro de cloro & soda");
    }

    #[test]
    fn inline_markup_does_not_split_phrases() {
        let html = r#"<body><p><strong>Licitación</strong> Pública para
            <a href="/p">provisión</a> <span>de</span> agua</p>
            <div>Expediente <em>12/2025</em></div></body>"#;
        assert_eq!(
            visible_text(html),
            "Licitación Pública para provisión de agua\nExpediente 12/2025"
        );
    }

    #[test]
    fn block_elements_and_table_cells_separate_text() {
        let html = "<ul><li>Obras</li><li>Servicios</li></ul>Uno<br>Dos\
            <table><tr><td>LP 12/25</td><td>Planta potabilizadora</td></tr></table>";
        assert_eq!(
            visible_text(html),
            "Obras\nServicios\nUno\nDos\nLP 12/25 Planta potabilizadora"
        );
    }
}
