//! Free-text input handling: sanitization of typed queries and client-side
//! narrowing of geocoding candidates by the selected country and region.

use crate::model::SearchResult;

/// Keep only ASCII letters and digits, whitespace, commas, dots and hyphens.
pub fn sanitize_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, ',' | '.' | '-'))
        .collect()
}

/// Narrow place suggestions to the selected country and (fuzzily) to the typed region.
///
/// A candidate without a region is never excluded by the region text.
pub fn filter_results(
    results: Vec<SearchResult>,
    country: Option<&str>,
    state: Option<&str>,
) -> Vec<SearchResult> {
    let state = state.filter(|s| !s.is_empty()).map(str::to_lowercase);

    results
        .into_iter()
        .filter(|item| matches_country(item, country))
        .filter(|item| match (&state, &item.region) {
            (Some(query), Some(region)) => {
                let region = region.to_lowercase();
                region.contains(query.as_str()) || query.contains(region.as_str())
            }
            _ => true,
        })
        .collect()
}

/// Narrow region suggestions to the selected country.
pub fn filter_by_country(results: Vec<SearchResult>, country: Option<&str>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|item| matches_country(item, country))
        .collect()
}

fn matches_country(item: &SearchResult, country: Option<&str>) -> bool {
    match country.filter(|c| !c.is_empty()) {
        Some(country) => item.country.as_deref() == Some(country),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, region: Option<&str>, country: &str) -> SearchResult {
        SearchResult {
            name: name.to_string(),
            region: region.map(str::to_string),
            country: Some(country.to_string()),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    fn names(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn sanitize_strips_markup_and_symbols() {
        assert_eq!(sanitize_input("<script>alert(1)</script>"), "scriptalert1script");
        assert_eq!(sanitize_input("St. John's, NL-1"), "St. Johns, NL-1");
        assert_eq!(sanitize_input("Zürich"), "Zrich");
        assert_eq!(sanitize_input("a\tb c"), "a\tb c");
    }

    #[test]
    fn filter_by_country_is_exact() {
        let results = vec![
            result("Hyderabad", Some("Telangana"), "India"),
            result("Hyderabad", Some("Sindh"), "Pakistan"),
        ];

        let kept = filter_results(results, Some("India"), None);
        assert_eq!(names(&kept), ["Hyderabad"]);
        assert_eq!(kept[0].region.as_deref(), Some("Telangana"));
    }

    #[test]
    fn region_matches_in_either_direction_ignoring_case() {
        let results = vec![
            result("Springfield", Some("Illinois"), "USA"),
            result("Springfield", Some("Missouri"), "USA"),
            result("Springfield", None, "USA"),
        ];

        let kept = filter_results(results.clone(), Some("USA"), Some("illi"));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].region.as_deref(), Some("Illinois"));
        assert_eq!(kept[1].region, None);

        let kept = filter_results(results, None, Some("State of Missouri"));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].region.as_deref(), Some("Missouri"));
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let results = vec![
            result("Paris", Some("Ile-de-France"), "France"),
            result("Paris", Some("Texas"), "United States"),
        ];

        assert_eq!(filter_results(results.clone(), None, None).len(), 2);
        assert_eq!(filter_results(results, Some(""), Some("")).len(), 2);
    }

    #[test]
    fn missing_country_fails_country_filter() {
        let mut orphan = result("Nowhere", None, "x");
        orphan.country = None;

        assert!(filter_by_country(vec![orphan.clone()], Some("India")).is_empty());
        assert_eq!(filter_by_country(vec![orphan], None).len(), 1);
    }
}
