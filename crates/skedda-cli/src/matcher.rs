//! Fuzzy matching of user-typed names against venue and space names.
//!
//! A query matches a name when its characters appear in the name in order,
//! ignoring case and diacritics (`"brd rm"` matches `"Board Room"`).

use std::collections::HashSet;
use std::fmt::Display;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds a string to lowercase NFKD without combining marks.
fn fold(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns `true` if every char of `needle` appears in `haystack` in order.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut rest = haystack.chars();
    needle.chars().all(|n| rest.any(|h| h == n))
}

/// Matches queries against the display names of a list of items.
#[derive(Debug)]
pub struct Matcher<'a, T> {
    items: &'a [T],
    labels: Vec<String>,
}

impl<'a, T: Display> Matcher<'a, T> {
    /// Indexes `items` by their folded display names.
    pub fn new(items: &'a [T]) -> Self {
        let labels = items.iter().map(|item| fold(&item.to_string())).collect();
        Self { items, labels }
    }

    fn indices(&self, query: &str) -> Vec<usize> {
        let query = fold(query);
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| is_subsequence(&query, label))
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns every item matching `query`, in list order.
    pub fn match_one(&self, query: &str) -> Vec<&'a T> {
        let items = self.items;
        self.indices(query)
            .into_iter()
            .filter_map(|i| items.get(i))
            .collect()
    }

    /// Matches each query and concatenates the results, keeping only the
    /// first occurrence of each item.
    pub fn match_many<S: AsRef<str>>(&self, queries: &[S]) -> Vec<&'a T> {
        let mut seen = HashSet::new();
        let items = self.items;
        queries
            .iter()
            .flat_map(|query| self.indices(query.as_ref()))
            .filter(|i| seen.insert(*i))
            .filter_map(|i| items.get(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn names() -> Vec<String> {
        ["Board Room", "Café Corner", "Phone Booth 1", "Phone Booth 2", "BOARDWALK"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_fold_strips_case_and_marks() {
        // Arrange & Act & Assert
        assert_eq!(fold("Café Ångström"), "cafe angstrom");
        assert_eq!(fold("ＦＵＬＬ"), "full");
    }

    #[test]
    fn test_match_one_subsequence() {
        // Arrange
        let items = names();
        let matcher = Matcher::new(&items);

        // Act
        let found = matcher.match_one("brd");

        // Assert
        assert_eq!(found, vec!["Board Room", "BOARDWALK"]);
    }

    #[test]
    fn test_match_one_ignores_diacritics() {
        // Arrange
        let items = names();
        let matcher = Matcher::new(&items);

        // Act
        let found = matcher.match_one("cafe");

        // Assert
        assert_eq!(found, vec!["Café Corner"]);
    }

    #[test]
    fn test_match_one_requires_order() {
        // Arrange
        let items = names();
        let matcher = Matcher::new(&items);

        // Act
        let found = matcher.match_one("mrb");

        // Assert
        assert!(found.is_empty());
    }

    #[test]
    fn test_match_many_dedups_in_first_order() {
        // Arrange
        let items = names();
        let matcher = Matcher::new(&items);

        // Act
        let found = matcher.match_many(&["booth 2", "phone", "board room"]);

        // Assert
        assert_eq!(found, vec!["Phone Booth 2", "Phone Booth 1", "Board Room"]);
    }

    #[test]
    fn test_match_many_empty_queries() {
        // Arrange
        let items = names();
        let matcher = Matcher::new(&items);

        // Act
        let found = matcher.match_many::<&str>(&[]);

        // Assert
        assert!(found.is_empty());
    }
}
