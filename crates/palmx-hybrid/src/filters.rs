//! Structured filter rules applied to merged candidates.
use palmx_core::{CatalogEntry, FilterDimension, Filters};

fn lower(s: &str) -> String { s.trim().to_lowercase() }

/// Either string contains the other, ignoring case. Blank fields never match.
fn overlaps(field: Option<&String>, wanted: &str) -> bool {
    match field.map(|f| lower(f)) {
        Some(f) if !f.is_empty() => f.contains(wanted) || wanted.contains(f.as_str()),
        _ => false,
    }
}

/// `field` contains `wanted`, ignoring case. Blank fields never match.
fn contains(field: Option<&String>, wanted: &str) -> bool {
    field.map(|f| lower(f)).is_some_and(|f| !f.is_empty() && f.contains(wanted))
}

fn matches_dimension(entry: &CatalogEntry, dim: FilterDimension, wanted: &str) -> bool {
    let wanted = lower(wanted);
    match dim {
        FilterDimension::Type => entry.project_type.as_deref().is_some_and(|t| lower(t) == wanted),
        // Region overlaps either way; the area only when it contains the filter.
        FilterDimension::Region => overlaps(entry.region.as_ref(), &wanted) || contains(entry.area.as_ref(), &wanted),
        FilterDimension::Status => entry.status.as_deref().is_some_and(|s| lower(s).contains(&wanted)),
    }
}

/// True when `entry` satisfies every dimension that carries a value.
pub fn matches(entry: &CatalogEntry, filters: &Filters) -> bool {
    FilterDimension::ALL
        .iter()
        .all(|&dim| filters.get(dim).map_or(true, |wanted| matches_dimension(entry, dim, wanted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry::new("p", "P")
            .with_region("West Cairo")
            .with_area("6th of October")
            .with_type("Residential")
            .with_status("Under Construction")
    }

    #[test]
    fn empty_filters_accept_everything() {
        assert!(matches(&CatalogEntry::new("bare", "Bare"), &Filters::none()));
        assert!(matches(&entry(), &Filters::none().region("  ")));
    }

    #[test]
    fn type_is_exact_and_case_insensitive() {
        assert!(matches(&entry(), &Filters::none().project_type("residential")));
        assert!(!matches(&entry(), &Filters::none().project_type("resid")));
        assert!(!matches(&CatalogEntry::new("untyped", "U"), &Filters::none().project_type("residential")));
    }

    #[test]
    fn region_matches_in_both_directions() {
        assert!(matches(&entry(), &Filters::none().region("west")));
        assert!(matches(&entry(), &Filters::none().region("6th of October")));
        assert!(matches(&entry(), &Filters::none().region("greater west cairo area")));
        assert!(!matches(&entry(), &Filters::none().region("north coast")));
        assert!(!matches(&CatalogEntry::new("nowhere", "N"), &Filters::none().region("west")));
    }

    #[test]
    fn area_only_matches_when_it_contains_the_filter() {
        let east = CatalogEntry::new("e", "E").with_region("East").with_area("Cairo");
        assert!(!matches(&east, &Filters::none().region("New Cairo Heights")));
        assert!(matches(&east, &Filters::none().region("cairo")));
        let area_only = CatalogEntry::new("a", "A").with_area("New Cairo");
        assert!(matches(&area_only, &Filters::none().region("new cairo")));
        assert!(!matches(&area_only, &Filters::none().region("greater new cairo")));
    }

    #[test]
    fn status_is_a_substring_match() {
        assert!(matches(&entry(), &Filters::none().status("construction")));
        assert!(!matches(&entry(), &Filters::none().status("ready")));
    }

    #[test]
    fn all_dimensions_must_hold() {
        let f = Filters::none().region("west").project_type("commercial");
        assert!(!matches(&entry(), &f));
    }
}
