use crate::UrlError;
use url::Url;

/// Normalizes an image reference into the absolute URL it is fetched from
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty references
/// 2. Protocol-relative references (`//host/x`) get the `https:` scheme
/// 3. Relative references (`/x`, `x`) are resolved against `base`
/// 4. Reject anything that is not HTTP or HTTPS
/// 5. Enforce HTTPS: convert `http://` to `https://`
/// 6. Require a host
/// 7. Remove the fragment
///
/// Normalization happens before hashing, so `http://a/x.jpg`,
/// `https://a/x.jpg` and `//a/x.jpg` all share one content hash.
///
/// # Arguments
///
/// * `raw` - The image reference as it appeared in the page
/// * `base` - Site root that relative references resolve against
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - The reference cannot name a fetchable image
///
/// # Examples
///
/// ```
/// use tieba_mirror::mirror::normalize_image_url;
/// use url::Url;
///
/// let base = Url::parse("https://tieba.baidu.com").unwrap();
/// let url = normalize_image_url("//imgsrc.baidu.com/a.jpg#x", &base).unwrap();
/// assert_eq!(url.as_str(), "https://imgsrc.baidu.com/a.jpg");
/// ```
pub fn normalize_image_url(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty image reference".to_string()));
    }

    let mut url = if let Some(rest) = raw.strip_prefix("//") {
        Url::parse(&format!("https://{}", rest))
    } else {
        match Url::parse(raw) {
            Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw),
            other => other,
        }
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            url.set_scheme("https")
                .map_err(|_| UrlError::InvalidScheme(raw.to_string()))?;
        }
        other => {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS images are mirrored, got: {}",
                other
            )));
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    url.set_fragment(None);

    Ok(url)
}
