//! HTML extraction for artist listings and lyric pages.
//!
//! The site has changed its markup over the years, so both extractions try
//! an ordered list of CSS selectors and stop at the first one that yields
//! something. The lists are plain data and can be reordered or extended
//! without touching the extraction code.

use std::collections::HashSet;
use std::ops::Deref;

use letras_model::SongJob;
use reqwest::Url;
use scraper::{ElementRef, Html, Node, Selector};

/// A named CSS selector tried during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub selector: &'static str,
}

pub const SONG_LIST_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "artist-songlist",
        selector: ".cnt-artist-songlist.artista-todas a",
    },
    Strategy {
        name: "songlist-table-row",
        selector: ".songList-table-row.--song a",
    },
    Strategy {
        name: "artista-todas",
        selector: ".artista-todas a",
    },
];

pub const LYRICS_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "lyric-original",
        selector: ".lyric-original",
    },
    Strategy {
        name: "cnt-letra",
        selector: ".cnt-letra",
    },
    Strategy {
        name: "letra",
        selector: ".letra",
    },
];

impl Strategy {
    fn parse(&self) -> Option<Selector> {
        match Selector::parse(self.selector) {
            Ok(selector) => Some(selector),
            Err(err) => {
                tracing::warn!(strategy = self.name, selector = self.selector, error = %err, "Skipping invalid selector");
                None
            }
        }
    }

    /// All `(title, url)` pairs this strategy finds on a listing page.
    pub fn song_links(&self, document: &Html, base_url: &str) -> Vec<(String, String)> {
        let Some(selector) = self.parse() else {
            return Vec::new();
        };
        document
            .select(&selector)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                let title = anchor.text().collect::<String>().trim().to_string();
                if title.is_empty() {
                    return None;
                }
                Some((title, resolve_url(base_url, href)))
            })
            .collect()
    }

    /// Text of every element this strategy matches, joined as stanzas.
    pub fn text(&self, document: &Html) -> String {
        let Some(selector) = self.parse() else {
            return String::new();
        };
        document
            .select(&selector)
            .map(element_text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Extract song jobs from an artist page.
///
/// The first strategy that produces at least one link wins. Links are
/// deduplicated by URL. An empty result means no strategy matched.
pub fn extract_song_links(html: &str, base_url: &str, strategies: &[Strategy]) -> Vec<SongJob> {
    let document = Html::parse_document(html);

    for strategy in strategies {
        let links = strategy.song_links(&document, base_url);
        if links.is_empty() {
            tracing::debug!(strategy = strategy.name, "No songs matched");
            continue;
        }
        tracing::debug!(strategy = strategy.name, candidates = links.len(), "Matched song list");
        let jobs = links
            .into_iter()
            .enumerate()
            .map(|(index, (title, url))| SongJob::new(index, title, url))
            .collect();
        return dedup_by_url(jobs);
    }

    Vec::new()
}

/// Extract lyrics from a song page, or `None` when every strategy is empty.
pub fn extract_lyrics(html: &str, strategies: &[Strategy]) -> Option<String> {
    let document = Html::parse_document(html);

    strategies.iter().find_map(|strategy| {
        let text = strategy.text(&document);
        if text.is_empty() {
            None
        } else {
            tracing::debug!(strategy = strategy.name, chars = text.len(), "Matched lyrics");
            Some(text)
        }
    })
}

/// Drop jobs whose URL was already seen, keeping the first occurrence, and
/// renumber the survivors in listing order.
pub fn dedup_by_url(jobs: Vec<SongJob>) -> Vec<SongJob> {
    let mut seen = HashSet::with_capacity(jobs.len());
    jobs.into_iter()
        .filter(|job| seen.insert(job.url.clone()))
        .enumerate()
        .map(|(index, job)| SongJob { index, ..job })
        .collect()
}

fn resolve_url(base_url: &str, href: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), href),
    }
}

/// Collect the visible text under an element.
///
/// `<br>` becomes a line break and block elements (`<p>`, `<div>`) become
/// stanza breaks, which is how lyric pages mark verses.
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(*element, &mut text);
    text
}

fn collect_text(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t.deref()),
            Node::Element(elem) => match elem.name() {
                "br" => out.push('\n'),
                "script" | "style" => {}
                "p" | "div" => {
                    stanza_break(out);
                    collect_text(child, out);
                    stanza_break(out);
                }
                _ => collect_text(child, out),
            },
            _ => {}
        }
    }
}

fn stanza_break(out: &mut String) {
    let trimmed = out.trim_end_matches([' ', '\t']).len();
    out.truncate(trimmed);
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}
