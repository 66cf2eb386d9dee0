//! Title match filter
//!
//! Patterns use `*` as a wildcard and a leading `!` to exclude. A title is
//! selected when it matches no exclusion and, if any inclusion patterns are
//! given, at least one of them.

use regex::Regex;

use crate::error::{RunnerError, RunnerResult};

#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl TitleFilter {
    pub fn new<I, S>(patterns: I) -> RunnerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = TitleFilter::default();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match pattern.strip_prefix('!') {
                Some(negated) => filter.exclude.push(compile(negated)?),
                None => filter.include.push(compile(pattern)?),
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(title)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(title))
    }
}

fn compile(pattern: &str) -> RunnerResult<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).map_err(|_| RunnerError::config(format!("match pattern `{pattern}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = TitleFilter::new(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches("anything"));
    }

    #[test]
    fn test_wildcards_and_negation() {
        let filter = TitleFilter::new(["math*", "!*slow"]).unwrap();
        assert!(filter.matches("math adds"));
        assert!(!filter.matches("math is slow"));
        assert!(!filter.matches("strings"));
    }

    #[test]
    fn test_only_negations_select_the_rest() {
        let filter = TitleFilter::new(["!flaky*"]).unwrap();
        assert!(filter.matches("stable"));
        assert!(!filter.matches("flaky network"));
    }

    #[test]
    fn test_regex_characters_are_literal() {
        let filter = TitleFilter::new(["sum (a+b)"]).unwrap();
        assert!(filter.matches("sum (a+b)"));
        assert!(!filter.matches("sum (aab)"));
    }
}
