//! Screening of model-proposed competitors.

use tracing::debug;
use url::Url;

use compete_shared::{Competitor, CompetitorCandidate, bare_host};

/// Names shorter than this are too generic to match against hosts.
const MIN_NAME_MATCH_CHARS: usize = 3;

/// Recognizes candidates that are really the target company itself.
#[derive(Debug, Clone)]
pub struct SelfMatch {
    name_forms: Vec<String>,
    target_host: Option<String>,
}

impl SelfMatch {
    pub fn new(company_name: &str, target: Option<&Url>) -> Self {
        let lowered = company_name.to_lowercase();
        let compact: String = lowered.split_whitespace().collect();
        let alnum: String = lowered.chars().filter(|c| c.is_alphanumeric()).collect();

        let mut name_forms = Vec::new();
        for form in [compact, alnum] {
            if form.chars().count() >= MIN_NAME_MATCH_CHARS && !name_forms.contains(&form) {
                name_forms.push(form);
            }
        }

        Self {
            name_forms,
            target_host: target.and_then(bare_host),
        }
    }

    /// Whether `host` (already lowercased, without `www.`) belongs to the target.
    pub fn matches_host(&self, host: &str) -> bool {
        if self.name_forms.iter().any(|form| host.contains(form.as_str())) {
            return true;
        }

        self.target_host.as_deref().is_some_and(|target| {
            host == target
                || host.ends_with(&format!(".{target}"))
                || target.ends_with(&format!(".{host}"))
        })
    }
}

/// Turn raw candidates into competitors.
///
/// Drops candidates whose URL is not absolute http(s) with a host, and those
/// that [`SelfMatch`] recognizes as the target. Keeps model order and returns
/// at most `count`.
pub fn screen_candidates(
    candidates: Vec<CompetitorCandidate>,
    self_match: &SelfMatch,
    count: usize,
) -> Vec<Competitor> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let Some(host) = Url::parse(&candidate.url)
                .ok()
                .filter(|u| matches!(u.scheme(), "http" | "https"))
                .and_then(|u| bare_host(&u))
            else {
                debug!(name = %candidate.name, url = %candidate.url, "dropping candidate with unusable URL");
                return false;
            };

            if self_match.matches_host(&host) {
                debug!(name = %candidate.name, %host, "dropping self-match");
                return false;
            }
            true
        })
        .take(count)
        .map(Competitor::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, url: &str) -> CompetitorCandidate {
        CompetitorCandidate {
            name: name.into(),
            url: url.into(),
            description: String::new(),
            relevance_score: 80.0,
            reasoning: String::new(),
        }
    }

    #[test]
    fn drops_candidates_whose_host_contains_the_company_name() {
        let target = Url::parse("https://acme.com").unwrap();
        let matcher = SelfMatch::new("Acme", Some(&target));

        let out = screen_candidates(
            vec![
                candidate("Acme", "https://acme.com"),
                candidate("Acme EU", "https://www.acme.eu"),
                candidate("Beta", "https://beta.io"),
            ],
            &matcher,
            5,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Beta");
        assert!(out[0].approved);
    }

    #[test]
    fn multi_word_names_match_compacted_hosts() {
        let matcher = SelfMatch::new("Acme Boards", None);
        assert!(matcher.matches_host("acmeboards.com"));
        assert!(!matcher.matches_host("boards.io"));
    }

    #[test]
    fn punctuation_is_ignored_in_names() {
        let matcher = SelfMatch::new("Monday.com", None);
        assert!(matcher.matches_host("monday.com"));
        assert!(matcher.matches_host("mondaycom.io"));
    }

    #[test]
    fn short_names_do_not_match_by_substring() {
        let matcher = SelfMatch::new("X", None);
        assert!(!matcher.matches_host("xero.com"));
    }

    #[test]
    fn target_domain_matches_on_label_boundary() {
        let target = Url::parse("https://www.hub.io/pricing").unwrap();
        let matcher = SelfMatch::new("Zz", Some(&target));

        assert!(matcher.matches_host("hub.io"));
        assert!(matcher.matches_host("app.hub.io"));
        assert!(!matcher.matches_host("github.io"));
    }

    #[test]
    fn subdomain_target_matches_its_parent() {
        let target = Url::parse("https://app.acme.dev").unwrap();
        let matcher = SelfMatch::new("Other", Some(&target));
        assert!(matcher.matches_host("acme.dev"));
    }

    #[test]
    fn drops_unusable_urls_and_truncates() {
        let matcher = SelfMatch::new("Acme", None);
        let out = screen_candidates(
            vec![
                candidate("Relative", "/beta"),
                candidate("Ftp", "ftp://files.example.com"),
                candidate("One", "https://one.com"),
                candidate("Two", "https://two.com"),
                candidate("Three", "https://three.com"),
            ],
            &matcher,
            2,
        );

        let names: Vec<_> = out.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["One", "Two"]);
    }
}
