//! `Link` header pagination.

/// Pagination hints from a GitHub `Link` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
}

impl LinkPagination {
    /// Whether another page follows the one this header came with.
    pub fn has_next(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/repos?type=owner&page=2&per_page=30>; rel="next", <...&page=3...>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
            {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "last" => info.last_page = Some(page_num),
                "next" => info.next_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
fn extract_page_from_url(raw: &str) -> Option<u32> {
    let parsed = url::Url::parse(raw).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_header_full() {
        let header = r#"<https://api.github.com/user/repos?type=owner&page=2&per_page=30>; rel="next", <https://api.github.com/user/repos?type=owner&page=4&per_page=30>; rel="last""#;

        let info = parse_link_header(header);
        assert_eq!(info.next_page, Some(2));
        assert_eq!(info.last_page, Some(4));
        assert!(info.has_next());
    }

    #[test]
    fn test_parse_link_header_last_page_has_no_next() {
        let header = r#"<https://api.github.com/user/repos?type=owner&page=1&per_page=30>; rel="first", <https://api.github.com/user/repos?type=owner&page=3&per_page=30>; rel="prev""#;

        let info = parse_link_header(header);
        assert_eq!(info.next_page, None);
        assert_eq!(info.last_page, None);
        assert!(!info.has_next());
    }

    #[test]
    fn test_parse_link_header_empty() {
        assert_eq!(parse_link_header(""), LinkPagination::default());
    }

    #[test]
    fn test_extract_page_from_url() {
        assert_eq!(
            extract_page_from_url("https://api.github.com/user/repos?page=5"),
            Some(5)
        );
        assert_eq!(
            extract_page_from_url("https://api.github.com/user/repos?per_page=30&page=3"),
            Some(3)
        );
        assert_eq!(
            extract_page_from_url("https://api.github.com/user/repos?per_page=30"),
            None
        );
        assert_eq!(extract_page_from_url("not a url"), None);
    }
}
