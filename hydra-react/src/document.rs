// HTML document assembly

use crate::error::Result;
use hydra_core::HttpStatus;
use serde_json::Value;

/// The HTML page wrapped around server-rendered markup.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    title: &'a str,
    mount_id: &'a str,
    state_global: &'a str,
    stylesheet: Option<&'a str>,
    script: Option<&'a str>,
}

impl<'a> Document<'a> {
    pub fn new(title: &'a str, mount_id: &'a str, state_global: &'a str) -> Self {
        Self {
            title,
            mount_id,
            state_global,
            stylesheet: None,
            script: None,
        }
    }

    pub fn stylesheet(mut self, href: Option<&'a str>) -> Self {
        self.stylesheet = href;
        self
    }

    pub fn script(mut self, src: &'a str) -> Self {
        self.script = Some(src);
        self
    }

    /// Render the page. `markup` is inserted verbatim; `state` is serialized
    /// into a script assignment the client reads back when hydrating.
    pub fn render(&self, markup: &str, state: &Value) -> Result<String> {
        let state = serialize_state(state)?;

        let mut html = String::with_capacity(markup.len() + state.len() + 512);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"UTF-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!("<title>{}</title>\n", escape_html(self.title)));
        if let Some(href) = self.stylesheet {
            html.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                escape_html(href)
            ));
        }
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!(
            "<div id=\"{}\">{}</div>\n",
            escape_html(self.mount_id),
            markup
        ));
        html.push_str(&format!(
            "<script>window.{}={}</script>\n",
            self.state_global, state
        ));
        if let Some(src) = self.script {
            html.push_str(&format!("<script src=\"{}\"></script>\n", escape_html(src)));
        }
        html.push_str("</body>\n</html>\n");

        Ok(html)
    }
}

/// JSON for embedding inside a `<script>` element. Characters that could end
/// the element or break a JS string literal are written as unicode escapes,
/// so the output still parses as the same JSON.
pub fn serialize_state(state: &Value) -> Result<String> {
    let json = serde_json::to_string(state)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    Ok(out)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Small standalone page for 404/500 responses.
pub fn error_page(status: HttpStatus, message: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{status} | {title}</title>\n</head>\n<body>\n<h1>{status}</h1>\n\
         <p>{message}</p>\n</body>\n</html>\n",
        status = status,
        title = escape_html(title),
        message = escape_html(message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_layout() {
        let html = Document::new("Document", "app", "__INIT_STATE__")
            .stylesheet(Some("/c.1.css"))
            .script("/c.1.js")
            .render("<p>hi</p>", &json!({"a": 1}))
            .unwrap();

        assert!(html.contains("<title>Document</title>"));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/c.1.css\">"));
        assert!(html.contains("<div id=\"app\"><p>hi</p></div>"));
        assert!(html.contains("<script>window.__INIT_STATE__={\"a\":1}</script>"));
        assert!(html.contains("<script src=\"/c.1.js\"></script>"));
    }

    #[test]
    fn test_no_stylesheet() {
        let html = Document::new("Document", "app", "__INIT_STATE__")
            .script("/c.1.js")
            .render("", &json!(null))
            .unwrap();
        assert!(!html.contains("stylesheet"));
    }

    #[test]
    fn test_state_cannot_close_script() {
        let state = json!({"x": "</script><script>alert(1)</script>", "y": "a\u{2028}b&c"});
        let out = serialize_state(&state).unwrap();

        assert!(!out.contains("</script>"));
        assert!(!out.contains('<'));
        assert!(!out.contains('\u{2028}'));

        let back: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_error_page_escapes() {
        let page = error_page(HttpStatus::NotFound, "<b>/x</b>", "Document");
        assert!(page.contains("404 Not Found"));
        assert!(page.contains("&lt;b&gt;"));
    }
}
