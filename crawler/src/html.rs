//! HTML clean-up and link extraction for crawled pages.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Elements removed together with everything inside them.
const BLOCK_ELEMENTS: [&str; 6] = ["head", "style", "script", "noscript", "iframe", "svg"];

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid regex");
    // A tag never contains `<`, so a stray `<` in text does not swallow what follows.
    static ref TAG: Regex = Regex::new(r"<[^<>]*>").expect("valid regex");
    static ref ENTITY: Regex = Regex::new(r"&[^\s&;]+;").expect("valid regex");
    static ref BLOCKS: Vec<Regex> = BLOCK_ELEMENTS
        .iter()
        .map(|name| element_regex(name))
        .collect();
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
}

fn element_regex(name: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{name}[>\s].*?</{name}\s*>\s*")).expect("valid regex")
}

pub fn strip_comments(html: &str) -> String {
    COMMENT.replace_all(html, "").into_owned()
}

/// Removes every `name` element including its content. `name` is matched case-insensitively.
pub fn strip_element(html: &str, name: &str) -> String {
    element_regex(&regex::escape(name)).replace_all(html, "").into_owned()
}

/// Removes comments and the head, style, script, noscript, iframe and svg elements.
pub fn strip_block_elements(html: &str) -> String {
    let mut cleaned = strip_comments(html);
    for block in BLOCKS.iter() {
        cleaned = block.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Decodes known character references and drops the ones left undecoded.
/// `text` must already be free of tags; a literal `<` is kept as text.
pub fn strip_entities(text: &str) -> String {
    let escaped = text.replace('<', "&lt;");
    let decoded: String = Html::parse_fragment(&escaped).root_element().text().collect();
    ENTITY.replace_all(&decoded, "").into_owned()
}

/// Plain text of an HTML page.
pub fn strip_html(html: &str) -> String {
    strip_entities(&strip_tags(&strip_block_elements(html)))
}

/// Absolute http(s) targets of the anchors in `html`, resolved against `base`,
/// without fragments, in document order. Unparseable links are skipped.
pub fn links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut found = Vec::new();
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else { continue };
        match base.join(href.trim()) {
            Ok(url) if is_http(&url) => found.push(normalize(url)),
            Ok(_) => {}
            Err(err) => tracing::debug!(%base, href, %err, "dropping malformed link"),
        }
    }
    found
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Drops the fragment; the path and query keep the percent-encoding `url` applied while parsing.
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_across_lines() {
        assert_eq!(strip_comments("A<!-- B -->C"), "AC");
        assert_eq!(strip_comments("A<!--\nB -->C"), "AC");
    }

    #[test]
    fn strips_named_elements_only() {
        let html = "<header>keep</header><HEAD><title>t</title></head>body";
        assert_eq!(strip_element(html, "head"), "<header>keep</header>body");
        let style = "a<style type=\"text/css\">p { color: red }</style>b";
        assert_eq!(strip_block_elements(style), "ab");
    }

    #[test]
    fn strips_tags_and_entities() {
        assert_eq!(strip_tags("A<b>B</b>C"), "ABC");
        assert_eq!(strip_tags("<a\n  href=\"x\">A</a>"), "A");
        assert_eq!(strip_entities("2010&ndash;2012"), "2010\u{2013}2012");
        assert_eq!(strip_entities("&gt;&madeup;x"), ">x");
        assert_eq!(
            strip_html("<html><head><title>x</title></head><body><p>Hello&amp;bye</p><script>var y;</script></body></html>"),
            "Hello&bye"
        );
    }

    #[test]
    fn bare_angle_brackets_survive_entity_decoding() {
        assert_eq!(strip_entities("if x<y then stop"), "if x<y then stop");
        assert_eq!(strip_entities("a <b &lt; c"), "a <b < c");
        assert_eq!(strip_html("<p>if x<y then stop</p><p>done &amp; dusted</p>"), "if x<y then stopdone & dusted");
    }

    #[test]
    fn links_are_absolute_http_without_fragments() {
        let base = Url::parse("https://example.com/docs/index.html").unwrap();
        let html = r##"
            <a href="guide.html#intro">relative</a>
            <A HREF="/search?q=a b">query</A>
            <a href="mailto:someone@example.com">mail</a>
            <a href="http://other.org/">other</a>
            <a name="no-href">anchor</a>
            <a href="https://[broken">broken</a>
        "##;
        let found: Vec<String> = links(&base, html).into_iter().map(String::from).collect();
        assert_eq!(
            found,
            vec![
                "https://example.com/docs/guide.html",
                "https://example.com/search?q=a%20b",
                "http://other.org/",
            ]
        );
    }

    #[test]
    fn links_inside_scripts_are_ignored_after_cleaning() {
        let base = Url::parse("http://a/").unwrap();
        let html = "<script>document.write('<a href=\"/hidden\">x</a>')</script><a href=\"/shown\">y</a>";
        let found = links(&base, &strip_block_elements(html));
        assert_eq!(found, vec![Url::parse("http://a/shown").unwrap()]);
    }
}
