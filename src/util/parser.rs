use anyhow::Result;
use feed_rs::{model::Entry, parser};

use crate::data::models::Episode;

/// Parses a feed document into episodes ordered oldest to newest.
///
/// Entries are sorted by publication date when every entry has one.
/// Otherwise document order is reversed, since feeds list newest first.
pub fn parse(content: &[u8]) -> Result<Vec<Episode>> {
    let feed = parser::parse(content)?;
    let mut entries = feed.entries;

    if entries.iter().all(|e| e.published.or(e.updated).is_some()) {
        entries.sort_by_key(|e| e.published.or(e.updated));
    } else {
        entries.reverse();
    }

    Ok(entries.into_iter().map(episode).collect())
}

fn episode(entry: Entry) -> Episode {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let url = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    Episode {
        title,
        url,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Podcast</title>
    <link>https://example.com</link>
    <description>Test</description>
    <item>
      <title>Episode 2</title>
      <link>https://example.com/2</link>
      <description>&lt;p&gt;Second&lt;/p&gt;</description>
      <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Episode 3</title>
      <link>https://example.com/3</link>
      <pubDate>Wed, 03 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Episode 1</title>
      <link>https://example.com/1</link>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn sorts_by_date_oldest_first() {
        let episodes = parse(RSS.as_bytes()).unwrap();
        let urls: Vec<_> = episodes.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://example.com/1", "https://example.com/2", "https://example.com/3"]
        );
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let episodes = parse(RSS.as_bytes()).unwrap();
        let latest = episodes.last().unwrap();
        assert_eq!(latest.title, "Episode 3");
        assert_eq!(latest.description, "");
        assert!(episodes[1].description.contains("Second"));
    }

    #[test]
    fn undated_feed_is_reversed() {
        let rss = r#"<rss version="2.0"><channel><title>P</title>
            <item><title>New</title><link>https://example.com/new</link></item>
            <item><title>Old</title><link>https://example.com/old</link></item>
            </channel></rss>"#;
        let episodes = parse(rss.as_bytes()).unwrap();
        assert_eq!(episodes.last().unwrap().title, "New");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse(b"not a feed").is_err());
    }
}
