use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// The ways callers look elements up. Everything is compiled down to a CSS selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Tag(&'a str),
    Class(&'a str),
    Id(&'a str),
    Css(&'a str),
}

impl Lookup<'_> {
    pub fn to_css(&self) -> String {
        match self {
            Lookup::Tag(tag) => tag.to_string(),
            Lookup::Class(class) => format!(".{}", class),
            Lookup::Id(id) => format!("#{}", id),
            Lookup::Css(css) => css.to_string(),
        }
    }

    fn selector(&self) -> Option<Selector> {
        let css = self.to_css();
        match Selector::parse(&css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(selector = %css, error = ?e, "Invalid CSS selector");
                None
            }
        }
    }
}

/// A parsed HTML page. Lookups never fail loudly: no match is `None` or an empty list.
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    pub fn parse(bytes: &[u8]) -> Self {
        Self::parse_str(&String::from_utf8_lossy(bytes))
    }

    pub fn parse_str(content: &str) -> Self {
        Self {
            html: Html::parse_document(content),
        }
    }

    pub fn find_all(&self, tag: &str) -> Vec<ElementRef<'_>> {
        match Lookup::Tag(tag).selector() {
            Some(selector) => self.html.select(&selector).collect(),
            None => Vec::new(),
        }
    }

    pub fn find(&self, lookup: Lookup<'_>) -> Option<ElementRef<'_>> {
        let selector = lookup.selector()?;
        self.html.select(&selector).next()
    }
}

/// First descendant of `node` matching `lookup`.
pub fn find_in<'a>(node: ElementRef<'a>, lookup: Lookup<'_>) -> Option<ElementRef<'a>> {
    let selector = lookup.selector()?;
    node.select(&selector).next()
}

/// All text below `node`, concatenated and trimmed.
pub fn text_content(node: ElementRef<'_>) -> String {
    node.text().collect::<String>().trim().to_string()
}
