use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use ammonia::Builder;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Base that relative links in mail bodies are resolved against.
pub const DEFAULT_LINK_BASE: &str = "https://inkbunny.net";

/// Path of the backend's image proxy.
pub const IMAGE_PROXY: &str = "/api/image";

const ALLOWED_TAGS: &[&str] = &[
    "b", "i", "u", "strong", "em", "s", "strike", "del", "span", "br", "p", "a", "img",
    "blockquote", "ul", "ol", "li", "dl", "dt", "dd", "table", "thead", "tbody", "tfoot", "tr",
    "th", "td", "pre", "code", "h1", "h2", "h3", "h4", "h5", "h6", "div",
];

const ALLOWED_ATTRS: &[&str] = &[
    "href",
    "title",
    "src",
    "alt",
    "border",
    "cellpadding",
    "cellspacing",
    "colspan",
    "rowspan",
    "style",
];

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, as `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `/api/image?url=<encoded>` for a remote image.
pub fn image_proxy_path(url: &str) -> String {
    format!("{IMAGE_PROXY}?url={}", utf8_percent_encode(url, URI_COMPONENT))
}

/// Allow-list HTML cleaner for mail bodies.
///
/// Besides dropping everything not on the list it rewrites image sources to
/// go through the image proxy and turns relative links absolute.
pub struct Sanitizer {
    builder: Builder<'static>,
}

impl Sanitizer {
    pub fn new(link_base: &str) -> anyhow::Result<Self> {
        let base = Url::parse(link_base)?;

        let mut builder = Builder::default();
        builder
            .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
            .tag_attributes(HashMap::new())
            .generic_attributes(ALLOWED_ATTRS.iter().copied().collect::<HashSet<_>>())
            .attribute_filter(move |element, attribute, value| match (element, attribute) {
                ("img", "src") if !value.is_empty() => Some(Cow::Owned(image_proxy_path(value))),
                ("a", "href") => Some(absolute_link(&base, value)),
                _ => Some(Cow::Borrowed(value)),
            });

        Ok(Self { builder })
    }

    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_BASE).expect("DEFAULT_LINK_BASE is a valid url")
    }
}

fn absolute_link<'u>(base: &Url, href: &'u str) -> Cow<'u, str> {
    if href.is_empty() || href.starts_with("http") {
        return Cow::Borrowed(href);
    }
    match base.join(href) {
        Ok(abs) => Cow::Owned(abs.into()),
        Err(_) => Cow::Borrowed(href),
    }
}

/// Sanitize with the default link base.
pub fn sanitize(html: &str) -> String {
    Sanitizer::default().clean(html)
}

/// Plain-text rendering of an (already sanitized) body for the terminal.
pub fn to_text(html: &str, width: usize) -> String {
    html2text::from_read(html.as_bytes(), width.max(20)).unwrap_or_else(|_| html.to_string())
}
