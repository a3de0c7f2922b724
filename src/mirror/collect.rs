use crate::model::Document;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Collects every image reference in a document, first occurrence first
///
/// Covers author icons, comment avatars and each `<img src>` inside post
/// author names, post bodies and comment bodies. References are returned verbatim;
/// normalization belongs to the mirror.
pub fn collect_image_urls(document: &Document) -> Vec<String> {
    let mut collector = Collector::new();

    for post in document.posts() {
        collector.push(post.author.icon.as_deref());
        collector.scan_markup(&post.author.name);
        collector.scan_markup(&post.body);

        for comment in &post.comments {
            collector.push(comment.avatar.as_deref());
            collector.scan_markup(&comment.body);
        }
    }

    collector.urls
}

struct Collector {
    img: Option<Selector>,
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl Collector {
    fn new() -> Self {
        Self {
            img: Selector::parse("img[src]").ok(),
            seen: HashSet::new(),
            urls: Vec::new(),
        }
    }

    fn push(&mut self, src: Option<&str>) {
        let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) else {
            return;
        };
        if self.seen.insert(src.to_string()) {
            self.urls.push(src.to_string());
        }
    }

    fn scan_markup(&mut self, markup: &str) {
        if !markup.contains("<img") {
            return;
        }
        let Some(img) = &self.img else {
            return;
        };

        let fragment = Html::parse_fragment(markup);
        let sources: Vec<String> = fragment
            .select(img)
            .filter_map(|element| element.value().attr("src"))
            .map(str::to_string)
            .collect();

        for src in sources {
            self.push(Some(&src));
        }
    }
}
