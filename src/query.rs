//! Query-token classification.
//!
//! One raw token from the input line or the navigation bar selects exactly one
//! retrieval mode. Category names win over free-text search: typing
//! `Fantasia` browses the category instead of searching for the word.

use crate::catalog::RemoteQuery;

/// Retrieval strategy selected by a query token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// No query active: nothing fetched, nothing shown.
    Idle,
    /// Free-text search, trimmed but otherwise as typed.
    Search(String),
    /// Recognized category, lower-cased.
    Category(String),
    /// The locally stored favorites list.
    Curated,
}

impl Mode {
    /// The remote request this mode needs, if any.
    pub fn remote_query(&self) -> Option<RemoteQuery> {
        match self {
            Mode::Search(text) => Some(RemoteQuery::Search(text.clone())),
            Mode::Category(name) => Some(RemoteQuery::Category(name.clone())),
            Mode::Idle | Mode::Curated => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Mode::Search(_) | Mode::Category(_))
    }
}

/// Classifies query tokens against the configured category set and the
/// favorites sentinel.
#[derive(Debug, Clone)]
pub struct ModeResolver {
    sentinel: String,
    categories: Vec<String>,
}

impl ModeResolver {
    /// Names are compared case-insensitively; duplicates collapse and blank
    /// names are ignored.
    pub fn new<I, S>(sentinel: &str, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in categories {
            let name = name.as_ref().trim().to_lowercase();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        Self {
            sentinel: sentinel.trim().to_lowercase(),
            categories: names,
        }
    }

    /// Lower-cased recognized category names in configuration order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn is_category(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.categories.iter().any(|c| *c == name)
    }

    /// Map a token to its mode. Total: every input yields exactly one mode.
    pub fn resolve(&self, token: Option<&str>) -> Mode {
        let text = token.map(str::trim).unwrap_or("");
        if text.is_empty() {
            return Mode::Idle;
        }

        let folded = text.to_lowercase();
        if folded == self.sentinel {
            return Mode::Curated;
        }
        if self.categories.contains(&folded) {
            return Mode::Category(folded);
        }
        Mode::Search(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn resolver() -> ModeResolver {
        ModeResolver::new("favoritos", ["Fantasia", "dark", "Estudo", "quadrinhos"])
    }

    #[test]
    fn test_empty_and_absent_are_idle() {
        let r = resolver();
        assert_eq!(r.resolve(None), Mode::Idle);
        assert_eq!(r.resolve(Some("")), Mode::Idle);
        assert_eq!(r.resolve(Some("   \t")), Mode::Idle);
    }

    #[test]
    fn test_sentinel_is_curated_in_any_case() {
        let r = resolver();
        assert_eq!(r.resolve(Some("favoritos")), Mode::Curated);
        assert_eq!(r.resolve(Some("FAVORITOS")), Mode::Curated);
        assert_eq!(r.resolve(Some("  Favoritos ")), Mode::Curated);
    }

    #[test]
    fn test_category_is_lowercased() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some("fantasia")),
            Mode::Category("fantasia".to_string())
        );
        assert_eq!(
            r.resolve(Some("ESTUDO")),
            Mode::Category("estudo".to_string())
        );
    }

    #[test]
    fn test_free_text_is_trimmed_only() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some("  Machado de ASSIS  ")),
            Mode::Search("Machado de ASSIS".to_string())
        );
    }

    #[test]
    fn test_category_phrase_is_still_search() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some("Fantasia Épica")),
            Mode::Search("Fantasia Épica".to_string())
        );
    }

    #[test]
    fn test_non_ascii_case_folding() {
        let r = ModeResolver::new("favoritos", ["ficção"]);
        assert_eq!(
            r.resolve(Some("FICÇÃO")),
            Mode::Category("ficção".to_string())
        );
    }

    #[test]
    fn test_duplicate_and_blank_categories_collapse() {
        let r = ModeResolver::new("favoritos", ["Dark", "dark ", "", "DARK"]);
        assert_eq!(r.categories(), ["dark".to_string()]);
    }

    #[test]
    fn test_remote_query_only_for_remote_modes() {
        assert!(Mode::Idle.remote_query().is_none());
        assert!(Mode::Curated.remote_query().is_none());
        assert_eq!(
            Mode::Category("dark".to_string()).remote_query(),
            Some(RemoteQuery::Category("dark".to_string()))
        );
        assert!(Mode::Search("x".to_string()).is_remote());
    }

    fn mixed_case(s: &str, mask: &[bool]) -> String {
        s.chars()
            .zip(mask.iter().cycle())
            .map(|(c, upper)| {
                if *upper {
                    c.to_uppercase().collect::<String>()
                } else {
                    c.to_string()
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn any_casing_of_a_category_resolves_to_category(
            idx in 0usize..4,
            mask in proptest::collection::vec(any::<bool>(), 1..12),
            pad in "[ \\t]{0,3}",
        ) {
            let r = resolver();
            let name = r.categories()[idx].clone();
            let token = format!("{pad}{}{pad}", mixed_case(&name, &mask));
            prop_assert_eq!(r.resolve(Some(&token)), Mode::Category(name));
        }

        #[test]
        fn resolve_is_total(token in "\\PC{0,40}") {
            let r = resolver();
            let mode = r.resolve(Some(&token));
            let trimmed = token.trim();
            match mode {
                Mode::Idle => prop_assert!(trimmed.is_empty()),
                Mode::Curated => prop_assert_eq!(trimmed.to_lowercase(), "favoritos"),
                Mode::Category(name) => prop_assert!(r.is_category(&name)),
                Mode::Search(text) => {
                    prop_assert_eq!(text.as_str(), trimmed);
                    prop_assert!(!r.is_category(trimmed));
                }
            }
        }
    }
}
