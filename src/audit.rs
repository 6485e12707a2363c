use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::AuditError;
use crate::store::{ContentStore, Entry, ItemStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub total_count: usize,
    pub filled_count: usize,
    pub empty_count: usize,
    /// Filled share with one decimal, e.g. `"50.0"`.
    pub percentage: String,
    pub status_breakdown: IndexMap<ItemStatus, usize>,
    pub empty_entries: Vec<String>,
}

/// Read-only completion report over every item in the store.
pub fn audit(store: &ContentStore) -> Result<ProgressReport, AuditError> {
    let entries = store.entries();
    if entries.is_empty() {
        return Err(AuditError::NoContent);
    }

    let mut status_breakdown: IndexMap<ItemStatus, usize> =
        ItemStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for e in &entries {
        *status_breakdown.entry(e.item.effective_status()).or_default() += 1;
    }

    let empty_entries: Vec<String> = entries
        .iter()
        .filter(|e| e.item.is_empty())
        .map(Entry::label)
        .collect();
    let total_count = entries.len();
    let empty_count = empty_entries.len();
    let filled_count = total_count - empty_count;

    Ok(ProgressReport {
        total_count,
        filled_count,
        empty_count,
        percentage: percentage(filled_count, total_count),
        status_breakdown,
        empty_entries,
    })
}

/// `filled / total` as a percentage with one decimal, ties rounded up.
fn percentage(filled: usize, total: usize) -> String {
    let tenths = (filled * 2000 + total) / (2 * total);
    format!("{}.{}", tenths / 10, tenths % 10)
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total:     {}", self.total_count)?;
        writeln!(f, "Filled:    {}", self.filled_count)?;
        writeln!(f, "Empty:     {}", self.empty_count)?;
        writeln!(f, "Progress:  {}%", self.percentage)?;
        let statuses: Vec<String> = self
            .status_breakdown
            .iter()
            .map(|(s, n)| format!("{} {}", s.as_str(), n))
            .collect();
        writeln!(f, "Status:    {}", statuses.join(", "))?;

        if !self.empty_entries.is_empty() {
            writeln!(f, "\nUnfilled items ({}):", self.empty_count)?;
            for label in &self.empty_entries {
                writeln!(f, "  - {}", label)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(value: serde_json::Value) -> ContentStore {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn half_filled_news_category() {
        let s = store(json!({
            "news": [
                { "title": "Open day", "url": "https://uni.example/1", "details": ["x"] },
                { "title": "New campus", "url": "https://uni.example/2" }
            ]
        }));
        let r = audit(&s).unwrap();
        assert_eq!(r.total_count, 2);
        assert_eq!(r.filled_count, 1);
        assert_eq!(r.empty_count, 1);
        assert_eq!(r.percentage, "50.0");
        assert_eq!(r.empty_entries, vec!["news: New campus"]);
    }

    #[test]
    fn subcategories_are_qualified_and_other_shapes_skipped() {
        let s = store(json!({
            "programs": {
                "master": [
                    { "title": "Finance", "url": "https://uni.example/f", "details": [] },
                    { "title": "Law", "url": "https://uni.example/l", "details": ["LLM"] },
                    { "title": "Design", "url": "https://uni.example/d", "details": ["MA"] }
                ],
                "updated": "2024-05-01"
            },
            "title": "University"
        }));
        let r = audit(&s).unwrap();
        assert_eq!(r.total_count, 3);
        assert_eq!(r.percentage, "66.7");
        assert_eq!(r.empty_entries, vec!["programs/master: Finance"]);
    }

    #[test]
    fn percentage_ties_round_up() {
        let news: Vec<serde_json::Value> = (0..16)
            .map(|i| {
                let details = if i == 0 { json!(["x"]) } else { json!([]) };
                json!({ "title": format!("N{i}"), "url": format!("https://uni.example/{i}"), "details": details })
            })
            .collect();
        let r = audit(&store(json!({ "news": news }))).unwrap();
        assert_eq!((r.filled_count, r.total_count), (1, 16));
        assert_eq!(r.percentage, "6.3");

        assert_eq!(percentage(1, 8), "12.5");
        assert_eq!(percentage(1, 3), "33.3");
        assert_eq!(percentage(2, 3), "66.7");
        assert_eq!(percentage(0, 7), "0.0");
        assert_eq!(percentage(5, 5), "100.0");
    }

    #[test]
    fn malformed_item_next_to_an_empty_one() {
        let s = store(json!({
            "news": [
                { "title": "A", "url": "https://uni.example/a", "details": ["y"] },
                { "title": "B", "url": "https://uni.example/b" },
                { "title": "C" }
            ],
            "events": [
                { "title": "E", "url": "https://uni.example/e", "details": ["z"] }
            ]
        }));
        let r = audit(&s).unwrap();
        assert_eq!(r.total_count, 3);
        assert_eq!(r.empty_entries, vec!["news: B"]);
    }

    #[test]
    fn empty_store_is_an_error() {
        assert!(matches!(
            audit(&store(json!({}))),
            Err(AuditError::NoContent)
        ));
        assert!(matches!(
            audit(&store(json!({ "news": [] }))),
            Err(AuditError::NoContent)
        ));
    }

    #[test]
    fn repeated_audits_are_identical() {
        let s = store(json!({
            "events": [
                { "title": "Fair", "url": "https://uni.example/e", "status": "failed_permanent", "details": [] },
                { "title": "Expo", "url": "https://uni.example/x", "details": ["Hall A"] }
            ]
        }));
        let first = audit(&s).unwrap();
        let second = audit(&s).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.status_breakdown[&ItemStatus::FailedPermanent], 1);
        assert_eq!(first.status_breakdown[&ItemStatus::Succeeded], 1);
        assert_eq!(first.status_breakdown[&ItemStatus::Pending], 0);
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let s = store(json!({
            "news": [ { "title": "A", "url": "https://uni.example/a" } ]
        }));
        let v = serde_json::to_value(audit(&s).unwrap()).unwrap();
        assert_eq!(v["totalCount"], 1);
        assert_eq!(v["percentage"], "0.0");
        assert_eq!(v["statusBreakdown"]["pending"], 1);
        assert_eq!(v["emptyEntries"][0], "news: A");
    }

    #[test]
    fn render_lists_unfilled_items() {
        let s = store(json!({
            "news": [ { "title": "A", "url": "https://uni.example/a" } ]
        }));
        let text = audit(&s).unwrap().to_string();
        assert!(text.contains("Progress:  0.0%"));
        assert!(text.contains("  - news: A"));
    }
}
