//! Outbound URLs for the account-scoped APIs the portal calls.

use reqwest::Url;

/// Parse a configured base URL.
pub(crate) fn parse_base(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid base URL {raw:?}: {e}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("invalid base URL {raw:?}: cannot carry a path"));
    }
    Ok(url)
}

/// `{base}/v1/accounts/{account_id}/{resource}`.
///
/// `account_id` always lands as exactly one percent-encoded path segment:
/// `/`, `?` and `#` inside it are escaped. Ids that cannot be a segment
/// (empty, `.` or `..`) give `None`. `resource` is a fixed route and may
/// span several segments.
pub(crate) fn account_url(base: &Url, account_id: &str, resource: &str) -> Option<Url> {
    if matches!(account_id, "" | "." | "..") {
        return None;
    }
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments
            .pop_if_empty()
            .extend(["v1", "accounts", account_id])
            .extend(resource.split('/').filter(|s| !s.is_empty()));
    }
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        parse_base("http://accounts.local/").unwrap()
    }

    #[test]
    fn plain_ids_are_appended() {
        let url = account_url(&base(), "12", "onboarding-progress").unwrap();
        assert_eq!(
            url.as_str(),
            "http://accounts.local/v1/accounts/12/onboarding-progress"
        );
    }

    #[test]
    fn empty_resource_addresses_the_account() {
        let url = account_url(&base(), "12", "").unwrap();
        assert_eq!(url.as_str(), "http://accounts.local/v1/accounts/12");
    }

    #[test]
    fn base_path_is_kept() {
        let base = parse_base("https://gateway.local/psp").unwrap();
        let url = account_url(&base, "acct_1", "persons/representative").unwrap();
        assert_eq!(
            url.as_str(),
            "https://gateway.local/psp/v1/accounts/acct_1/persons/representative"
        );
    }

    #[test]
    fn traversal_and_query_stay_inside_one_segment() {
        let url = account_url(&base(), "../../admin/users/7?", "onboarding-progress").unwrap();
        assert_eq!(url.query(), None);
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "v1");
        assert_eq!(segments[1], "accounts");
        assert!(!segments[2].contains('/'));
        assert!(!segments[2].contains('?'));
        assert_eq!(segments[3], "onboarding-progress");
        assert!(url.path().starts_with("/v1/accounts/"));
    }

    #[test]
    fn fragment_marker_is_escaped() {
        let url = account_url(&base(), "12#frag", "").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn dot_segments_are_refused() {
        for id in ["", ".", ".."] {
            assert!(account_url(&base(), id, "onboarding-progress").is_none(), "{id:?}");
        }
    }

    #[test]
    fn bad_base_is_an_error() {
        assert!(parse_base("not a url").is_err());
        assert!(parse_base("mailto:ops@example.com").is_err());
    }
}
