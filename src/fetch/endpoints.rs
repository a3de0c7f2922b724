use crate::UrlError;
use url::Url;

/// Threads per forum listing page
pub const FORUM_PAGE_SIZE: u64 = 50;

/// Builds the source URLs a crawl requests
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Creates endpoints rooted at `base_url` (e.g. `https://tieba.baidu.com`)
    pub fn new(base_url: &str) -> Result<Self, UrlError> {
        let base = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base.scheme().to_string()));
        }
        if base.host_str().is_none() {
            return Err(UrlError::MissingHost(base_url.to_string()));
        }

        Ok(Self { base })
    }

    /// Site root, used to resolve root-relative image paths
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{base}/p/{tid}?pn={pn}&see_lz={0|1}`
    pub fn thread_page(&self, thread_id: u64, page: u32, author_only: bool) -> Url {
        let mut url = self.path(&format!("/p/{}", thread_id));
        url.query_pairs_mut()
            .append_pair("pn", &page.to_string())
            .append_pair("see_lz", see_lz(author_only));
        url
    }

    /// `{base}/p/totalComment?tid={tid}&pn={pn}&see_lz={0|1}`
    pub fn comment_index(&self, thread_id: u64, page: u32, author_only: bool) -> Url {
        let mut url = self.path("/p/totalComment");
        url.query_pairs_mut()
            .append_pair("tid", &thread_id.to_string())
            .append_pair("pn", &page.to_string())
            .append_pair("see_lz", see_lz(author_only));
        url
    }

    /// `{base}/p/comment?tid={tid}&pid={pid}&pn={sub_page + 1}`
    ///
    /// Sub-page 0 is the inline page, so sub-page `i` is served as `pn=i+1`.
    pub fn comment_page(&self, thread_id: u64, post_id: &str, sub_page: usize) -> Url {
        let mut url = self.path("/p/comment");
        url.query_pairs_mut()
            .append_pair("tid", &thread_id.to_string())
            .append_pair("pid", post_id)
            .append_pair("pn", &(sub_page + 1).to_string());
        url
    }

    /// `{base}/f?kw={forum}&pn={page * FORUM_PAGE_SIZE}`
    ///
    /// Listing pages are 0-based and addressed by thread offset.
    pub fn forum_page(&self, forum: &str, page: u32) -> Url {
        let mut url = self.path("/f");
        url.query_pairs_mut()
            .append_pair("kw", forum)
            .append_pair("pn", &(u64::from(page) * FORUM_PAGE_SIZE).to_string());
        url
    }

    fn path(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

fn see_lz(author_only: bool) -> &'static str {
    if author_only {
        "1"
    } else {
        "0"
    }
}
