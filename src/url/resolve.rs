use url::Url;

/// Resolves `link` against `base`
///
/// Relative links are joined onto the base location, absolute links pass
/// through. Returns None if the link cannot be parsed at all.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_trawl::url::absolutize;
///
/// let base = Url::parse("https://example.com/a/").unwrap();
/// assert_eq!(
///     absolutize(&base, "b.html"),
///     Some("https://example.com/a/b.html".to_string())
/// );
/// ```
pub fn absolutize(base: &Url, link: &str) -> Option<String> {
    base.join(link.trim()).ok().map(String::from)
}
