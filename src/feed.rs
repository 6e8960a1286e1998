//! Feed transport: fetch a feed URL and reduce it to ordered `(title, link)`
//! entries. Understands RSS 2.0, RSS 1.0 (RDF) and Atom documents.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One entry of a fetched feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not parse feed: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }
}

/// Anything that can turn a feed URL into its entries.
pub trait FeedSource {
    fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FetchError>;
}

/// Rewrites the `rss://` pseudo-scheme to `https://`; other URLs pass through.
pub fn normalize_feed_url(url: &str) -> String {
    match url.strip_prefix("rss://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::blocking::Client,
}

impl HttpFeedSource {
    /// `timeout = None` leaves requests unbounded.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(request_err)?;
        let entries = parse_feed(&body)?;
        debug!(url, entries = entries.len(), "fetched feed");
        Ok(entries)
    }
}

#[derive(Default)]
struct PendingEntry {
    title: String,
    text_link: String,
    href_link: Option<String>,
    href_is_alternate: bool,
}

impl PendingEntry {
    fn offer_href(&mut self, element: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in element.attributes().flatten() {
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(String::from_utf8_lossy(&attr.value).trim().to_string()),
                b"rel" => rel = Some(String::from_utf8_lossy(&attr.value).to_string()),
                _ => {}
            }
        }
        let Some(href) = href else { return };
        let alternate = matches!(rel.as_deref(), None | Some("alternate"));
        if self.href_link.is_none() || (alternate && !self.href_is_alternate) {
            self.href_link = Some(href);
            self.href_is_alternate = alternate;
        }
    }

    fn finish(self) -> Option<FeedEntry> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let text_link = self.text_link.trim().to_string();
        let link = if text_link.is_empty() {
            self.href_link.unwrap_or_default()
        } else {
            text_link
        };
        Some(FeedEntry { title, link })
    }
}

fn is_entry_element(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Parses a feed document into entries, preserving document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    let mut current: Option<PendingEntry> = None;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            FetchError::Parse(format!("XML error at {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                if !seen_root {
                    check_root(&name)?;
                    seen_root = true;
                }
                if is_entry_element(&name) {
                    current = Some(PendingEntry::default());
                } else if name == b"link"
                    && path.last().is_some_and(|parent| is_entry_element(parent))
                    && let Some(entry) = current.as_mut()
                {
                    entry.offer_href(e);
                }
                path.push(name);
            }
            Event::Empty(ref e) => {
                let name = e.local_name();
                if !seen_root {
                    check_root(name.as_ref())?;
                    seen_root = true;
                }
                if name.as_ref() == b"link"
                    && path.last().is_some_and(|parent| is_entry_element(parent))
                    && let Some(entry) = current.as_mut()
                {
                    entry.offer_href(e);
                }
            }
            Event::End(_) => {
                if let Some(name) = path.pop()
                    && is_entry_element(&name)
                    && let Some(entry) = current.take().and_then(PendingEntry::finish)
                {
                    entries.push(entry);
                }
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|e| FetchError::Parse(format!("bad text: {e}")))?;
                append_entry_text(&path, current.as_mut(), &text);
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e);
                append_entry_text(&path, current.as_mut(), &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(FetchError::Parse("document has no root element".into()));
    }
    Ok(entries)
}

fn check_root(name: &[u8]) -> Result<(), FetchError> {
    match name {
        b"rss" | b"feed" | b"RDF" => Ok(()),
        other => Err(FetchError::Parse(format!(
            "unrecognized feed root <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn append_entry_text(path: &[Vec<u8>], current: Option<&mut PendingEntry>, text: &str) {
    let Some(entry) = current else { return };
    let [.., parent, element] = path else { return };
    if !is_entry_element(parent) {
        return;
    }
    match element.as_slice() {
        b"title" => entry.title.push_str(text),
        b"link" => entry.text_link.push_str(text),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Example</title>
    <link>http://example.com</link>
    <atom:link href="http://example.com/feed" rel="self"/>
    <item>
      <title>Post A</title>
      <link>http://a</link>
    </item>
    <item>
      <title><![CDATA[Post <B>]]></title>
      <link>http://b</link>
      <source url="http://elsewhere"><title>Other</title></source>
    </item>
    <item><description>no title here</description></item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom example</title>
  <link href="http://example.org/"/>
  <entry>
    <title>Fish &amp; Chips</title>
    <link rel="edit" href="http://example.org/edit/1"/>
    <link rel="alternate" href="http://example.org/1"/>
  </entry>
  <entry>
    <title type="text">Second</title>
    <link href="http://example.org/2"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_in_order() {
        let entries = parse_feed(RSS).unwrap();
        assert_eq!(
            entries,
            vec![
                FeedEntry::new("Post A", "http://a"),
                FeedEntry::new("Post <B>", "http://b"),
            ]
        );
    }

    #[test]
    fn parses_atom_entries_preferring_alternate_links() {
        let entries = parse_feed(ATOM).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], FeedEntry::new("Fish & Chips", "http://example.org/1"));
        assert_eq!(entries[1], FeedEntry::new("Second", "http://example.org/2"));
    }

    #[test]
    fn parses_rdf_items() {
        let rdf = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel rdf:about="http://example.com"><title>c</title></channel>
  <item rdf:about="http://example.com/1"><title>One</title><link>http://example.com/1</link></item>
</rdf:RDF>"#;
        let entries = parse_feed(rdf).unwrap();
        assert_eq!(entries, vec![FeedEntry::new("One", "http://example.com/1")]);
    }

    #[test]
    fn rejects_non_feed_documents() {
        let err = parse_feed("<html><body>nope</body></html>").unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("<html>"));
        assert!(parse_feed("").unwrap_err().is_parse());
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_feed("<rss><channel><item><title>x</item></rss>").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn rss_scheme_is_rewritten() {
        assert_eq!(
            normalize_feed_url("rss://example.com/feed"),
            "https://example.com/feed"
        );
        assert_eq!(normalize_feed_url("http://x/rss://y"), "http://x/rss://y");
    }
}
