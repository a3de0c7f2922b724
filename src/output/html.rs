//! HTML rendering
//!
//! Renders a [`Document`] into a standalone page. Every image source (author
//! icons, comment avatars and `<img>` tags inside bodies) is looked up in the
//! mirror mapping, so a mirrored thread reads from local files.

use crate::config::Layout;
use crate::model::{Comment, Document, Post, PostBatch};
use crate::output::{OutputError, OutputResult};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

const STYLE: &str = "body{max-width:960px;margin:0 auto;padding:1em;font-family:sans-serif;color:#222}\
.post{border-bottom:1px solid #ddd;padding:1em 0}\
.author{display:flex;align-items:center;gap:.5em}\
.author .icon{width:48px;height:48px;border-radius:4px}\
.badge{font-size:.8em;color:#777}\
.op{font-size:.8em;color:#fff;background:#3385ff;border-radius:3px;padding:0 .3em}\
.content{margin:.8em 0;line-height:1.6;word-wrap:break-word}\
.content img{max-width:100%}\
.meta{font-size:.8em;color:#999}\
.comments{list-style:none;margin:.6em 0 0 2em;padding:.4em .8em;background:#f7f8fa}\
.comments li{padding:.3em 0}\
.comments .avatar{width:24px;height:24px;vertical-align:middle}\
.comments .time{font-size:.8em;color:#999;margin-left:.5em}\
.pager{margin:1em 0}\
.pager a{margin-right:.5em}";

/// Renders a document and writes it to `output_path`
///
/// # Arguments
///
/// * `document` - The thread to render
/// * `images` - Image reference to rendered source, as produced by the mirror
/// * `layout` - Single flow or one section per page
/// * `output_path` - Path where the HTML file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the page
/// * `Err(OutputError)` - Failed to write the page
pub fn generate_html(
    document: &Document,
    images: &HashMap<String, String>,
    layout: Layout,
    output_path: &Path,
) -> OutputResult<()> {
    let html = format_html(document, images, layout);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(output_path, html).map_err(|source| OutputError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;

    tracing::info!("Wrote {}", output_path.display());
    Ok(())
}

/// Formats a document as a standalone HTML page
pub fn format_html(document: &Document, images: &HashMap<String, String>, layout: Layout) -> String {
    let renderer = Renderer {
        images,
        img: Selector::parse("img[src]").ok(),
    };
    let title = escape(&document.title);

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str(&format!("<style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", title));

    match layout {
        Layout::Single => {
            html.push_str("<div class=\"posts\">\n");
            for post in document.posts() {
                renderer.post(&mut html, post);
            }
            html.push_str("</div>\n");
        }
        Layout::Paginated => {
            let nav = page_navigation(&document.pages);
            for batch in &document.pages {
                html.push_str(&format!(
                    "<section class=\"page\" id=\"page-{0}\">\n<h2>Page {0}</h2>\n",
                    batch.page_index
                ));
                html.push_str(&nav);
                for post in &batch.posts {
                    renderer.post(&mut html, post);
                }
                html.push_str("</section>\n");
            }
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn page_navigation(pages: &[PostBatch]) -> String {
    let links: Vec<String> = pages
        .iter()
        .map(|batch| format!("<a href=\"#page-{0}\">{0}</a>", batch.page_index))
        .collect();
    format!("<nav class=\"pager\">{}</nav>\n", links.join(""))
}

struct Renderer<'a> {
    images: &'a HashMap<String, String>,
    img: Option<Selector>,
}

impl Renderer<'_> {
    fn post(&self, html: &mut String, post: &Post) {
        html.push_str(&format!(
            "<div class=\"post\" id=\"post-{}\">\n<div class=\"author\">",
            escape(&post.pid)
        ));

        if let Some(icon) = &post.author.icon {
            html.push_str(&format!(
                "<img class=\"icon\" src=\"{}\" alt=\"\">",
                escape(self.source(icon))
            ));
        }
        html.push_str(&format!(
            "<span class=\"name\">{}</span>",
            self.rewrite_markup(&post.author.name)
        ));
        if let Some(badge) = &post.author.badge {
            let level = post
                .author
                .level
                .map(|lv| format!(" Lv.{}", lv))
                .unwrap_or_default();
            html.push_str(&format!(
                "<span class=\"badge\">{}{}</span>",
                escape(badge),
                level
            ));
        }
        if post.author.is_thread_author {
            html.push_str("<span class=\"op\">OP</span>");
        }
        html.push_str("</div>\n");

        html.push_str(&format!(
            "<div class=\"content\">{}</div>\n",
            self.rewrite_markup(&post.body)
        ));

        let mut meta = Vec::new();
        if let Some(floor) = post.floor {
            meta.push(format!("#{}", floor));
        }
        meta.push(escape(&post.timestamp));
        if let Some(ip) = &post.ip_location {
            meta.push(format!("IP: {}", escape(ip)));
        }
        html.push_str(&format!("<div class=\"meta\">{}</div>\n", meta.join(" · ")));

        if !post.comments.is_empty() {
            html.push_str("<ul class=\"comments\">\n");
            for comment in &post.comments {
                self.comment(html, comment);
            }
            html.push_str("</ul>\n");
        }

        html.push_str("</div>\n");
    }

    fn comment(&self, html: &mut String, comment: &Comment) {
        html.push_str("<li>");
        if let Some(avatar) = &comment.avatar {
            html.push_str(&format!(
                "<img class=\"avatar\" src=\"{}\" alt=\"\"> ",
                escape(self.source(avatar))
            ));
        }
        html.push_str(&format!(
            "<span class=\"name\">{}</span>: <span class=\"body\">{}</span><span class=\"time\">{}</span>",
            escape(&comment.author),
            self.rewrite_markup(&comment.body),
            escape(&comment.timestamp)
        ));
        html.push_str("</li>\n");
    }

    /// Rendered source of a plain image reference
    fn source<'s>(&'s self, reference: &'s str) -> &'s str {
        self.images
            .get(reference.trim())
            .map(String::as_str)
            .unwrap_or(reference)
    }

    /// Rewrites `src` attributes inside stored markup
    ///
    /// Only the `<img>` elements found in the fragment are looked up, keyed
    /// the way the collector keys them. Stored markup escapes `&` and `"` in
    /// attribute values, so each attribute is matched in its raw and escaped
    /// forms.
    fn rewrite_markup(&self, markup: &str) -> String {
        if !markup.contains("<img") {
            return markup.to_string();
        }
        let Some(img) = &self.img else {
            return markup.to_string();
        };

        let fragment = Html::parse_fragment(markup);
        let sources: HashSet<&str> = fragment
            .select(img)
            .filter_map(|element| element.value().attr("src"))
            .collect();

        let mut rewritten = markup.to_string();
        for src in sources {
            let Some(target) = self.images.get(src.trim()) else {
                continue;
            };
            if target == src {
                continue;
            }
            let target_attr = format!("src=\"{}\"", escape(target));
            for form in [src.to_string(), escape_attribute(src), escape(src)] {
                let needle = format!("src=\"{}\"", form);
                if rewritten.contains(&needle) {
                    rewritten = rewritten.replace(&needle, &target_attr);
                }
            }
        }
        rewritten
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escaping applied to attribute values when markup is serialized
fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
