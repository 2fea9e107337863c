//! Project card rendering: the normalized text chunk embedded per entry.
//!
//! Only verified fields are rendered. Prices appear only when the entry's
//! `price_status` is `official`; `on_request` renders a fixed notice.

use crate::traits::CardRenderer;
use crate::types::CatalogEntry;

const DEFAULT_CURRENCY: &str = "EGP";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectCardRenderer;

fn joined<'a>(parts: impl IntoIterator<Item = Option<&'a String>>) -> String {
    parts.into_iter().flatten().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl ProjectCardRenderer {
    fn pricing_lines(entry: &CatalogEntry, lines: &mut Vec<String>) {
        let Some(price_status) = entry.price_status.as_deref() else { return };
        if price_status.eq_ignore_ascii_case("official") {
            let currency = entry.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
            if let Some(start) = &entry.starting_price {
                lines.push(format!("Starting Price: {} {}", start, currency));
            }
            if let (Some(min), Some(max)) = (&entry.price_range_min, &entry.price_range_max) {
                if entry.starting_price.as_ref() != Some(min) {
                    lines.push(format!("Price Range: {} - {} {}", min, max, currency));
                }
            }
        } else if price_status.eq_ignore_ascii_case("on_request") {
            lines.push("Pricing: On Request only".to_string());
        }
    }
}

impl CardRenderer for ProjectCardRenderer {
    fn render(&self, entry: &CatalogEntry) -> String {
        if let Some(card) = &entry.text_card {
            return card.clone();
        }
        let mut lines = vec![format!("Project: {}", entry.name)];
        lines.push(format!("Location: {}", joined([entry.region.as_ref(), entry.area.as_ref(), entry.micro_location.as_ref()])));
        lines.push(format!("Status: {}", joined([entry.project_type.as_ref(), entry.status.as_ref(), entry.sales_status.as_ref()])));
        Self::pricing_lines(entry, &mut lines);
        if !entry.unit_types.is_empty() { lines.push(format!("Units: {}", entry.unit_types.join(", "))); }
        if !entry.amenities.is_empty() { lines.push(format!("Amenities: {}", entry.amenities.join(", "))); }
        if !entry.zones.is_empty() { lines.push(format!("Zones: {}", entry.zones.join(", "))); }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CatalogEntry {
        CatalogEntry::new("hacienda_bay", "Hacienda Bay").with_region("North Coast").with_type("residential")
    }

    #[test]
    fn official_pricing_is_rendered() {
        let mut e = base();
        e.price_status = Some("Official".into());
        e.starting_price = Some("9000000".into());
        e.price_range_min = Some("9000000".into());
        e.price_range_max = Some("30000000".into());
        let card = ProjectCardRenderer.render(&e);
        assert!(card.contains("Starting Price: 9000000 EGP"));
        assert!(!card.contains("Price Range"), "range equal to start price is skipped");
    }

    #[test]
    fn unverified_pricing_is_hidden() {
        let mut e = base();
        e.price_status = Some("estimated".into());
        e.starting_price = Some("1".into());
        let card = ProjectCardRenderer.render(&e);
        assert!(!card.contains("Price"));
        assert_eq!(card.lines().next(), Some("Project: Hacienda Bay"));
        assert!(card.contains("Location: North Coast"));
        assert!(card.contains("Status: residential"));
    }

    #[test]
    fn on_request_and_lists() {
        let mut e = base();
        e.price_status = Some("on_request".into());
        e.amenities = vec!["Golf".into(), "Gym".into()];
        e.zones = vec!["Marina".into()];
        let card = ProjectCardRenderer.render(&e);
        assert!(card.contains("Pricing: On Request only"));
        assert!(card.contains("Amenities: Golf, Gym"));
        assert!(card.ends_with("Zones: Marina"));
    }

    #[test]
    fn supplied_card_wins() {
        let e = base().with_text_card("custom card");
        assert_eq!(ProjectCardRenderer.render(&e), "custom card");
    }
}
