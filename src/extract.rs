use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const MAX_DETAILS: usize = 30;
const DEDUP_PREFIX_CHARS: usize = 40;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static BOILERPLATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script, style, noscript, nav, footer, header, .menu, .sidebar, .widget")
        .unwrap()
});
static HEADINGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5").unwrap());
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static TABLE_ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

const HEADING_LEN: RangeInclusive<usize> = 6..=199;
const LIST_ITEM_LEN: RangeInclusive<usize> = 11..=299;
const PARAGRAPH_LEN: RangeInclusive<usize> = 31..=399;
const ROW_LEN: RangeInclusive<usize> = 11..=299;
const MIN_CELL_LEN: usize = 4;

/// Pull up to [`MAX_DETAILS`] snippets out of a page: headings, then list
/// items, then paragraphs, then table rows. A snippet is dropped when its
/// lowercased 40-char prefix was already taken by an earlier one.
pub fn extract_details(body: &str, title: &str) -> Vec<String> {
    let doc = strip_boilerplate(Html::parse_document(body));
    let mut acc = Collector::default();

    for el in doc.select(&HEADINGS) {
        acc.offer(element_text(el), &HEADING_LEN);
    }
    for el in doc.select(&LIST_ITEMS) {
        acc.offer(element_text(el), &LIST_ITEM_LEN);
    }
    for el in doc.select(&PARAGRAPHS) {
        acc.offer(element_text(el), &PARAGRAPH_LEN);
    }
    for row in doc.select(&TABLE_ROWS) {
        let cells: Vec<String> = row
            .select(&CELLS)
            .map(element_text)
            .filter(|c| c.chars().count() >= MIN_CELL_LEN)
            .collect();
        acc.offer(cells.join(" - "), &ROW_LEN);
    }

    debug!("{}: extracted {} details", title, acc.out.len());
    acc.out
}

fn strip_boilerplate(mut doc: Html) -> Html {
    let ids: Vec<_> = doc.select(&BOILERPLATE).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    doc
}

fn element_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    WS_RE.replace_all(&raw, " ").trim().to_string()
}

#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    out: Vec<String>,
}

impl Collector {
    fn offer(&mut self, text: String, bounds: &RangeInclusive<usize>) {
        if self.out.len() >= MAX_DETAILS || !bounds.contains(&text.chars().count()) {
            return;
        }
        let key: String = text
            .chars()
            .take(DEDUP_PREFIX_CHARS)
            .collect::<String>()
            .to_lowercase();
        if self.seen.insert(key) {
            self.out.push(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<html><head><title>t</title></head><body>{}</body></html>", body)
    }

    #[test]
    fn five_headings_in_document_order() {
        let html = page(
            "<h1>Admissions 2025</h1><h3>Tuition and fees</h3><h2>Scholarships</h2>\
             <h5>Student housing</h5><h4>International students</h4>",
        );
        assert_eq!(
            extract_details(&html, "Admissions"),
            vec![
                "Admissions 2025",
                "Tuition and fees",
                "Scholarships",
                "Student housing",
                "International students",
            ]
        );
    }

    #[test]
    fn stages_are_ordered_by_kind_not_position() {
        let html = page(
            "<table><tr><td>Duration</td><td>4 years full time</td></tr></table>\
             <p>The program combines lectures with a semester-long internship.</p>\
             <ul><li>Accredited by the ministry</li></ul>\
             <h2>Computer Science</h2>",
        );
        assert_eq!(
            extract_details(&html, ""),
            vec![
                "Computer Science",
                "Accredited by the ministry",
                "The program combines lectures with a semester-long internship.",
                "Duration - 4 years full time",
            ]
        );
    }

    #[test]
    fn boilerplate_regions_are_ignored() {
        let html = page(
            "<header><h1>University of Example</h1></header>\
             <nav><ul><li>Home page link for visitors</li></ul></nav>\
             <div class=\"sidebar\"><h2>Quick links sidebar</h2></div>\
             <script>var heading = '<h2>not a heading</h2>';</script>\
             <main><h2>Faculty of Law</h2></main>\
             <footer><p>Copyright University of Example, all rights reserved.</p></footer>",
        );
        assert_eq!(extract_details(&html, ""), vec!["Faculty of Law"]);
    }

    #[test]
    fn length_bounds_per_kind() {
        let long_para = "x".repeat(400);
        let html = page(&format!(
            "<h2>Short</h2><h2>Enough</h2>\
             <li>ten chars!</li><li>eleven char</li>\
             <p>Thirty characters exactly here</p><p>{}</p>\
             <p>This paragraph has thirty-one c</p>",
            long_para
        ));
        assert_eq!(
            extract_details(&html, ""),
            vec!["Enough", "eleven char", "This paragraph has thirty-one c"]
        );
    }

    #[test]
    fn duplicate_prefixes_are_dropped_across_stages() {
        let prefix = "Master of Business Administration program";
        let html = page(&format!(
            "<h2>{prefix} (full time)</h2>\
             <li>{prefix} (part time)</li>\
             <li>MASTER OF BUSINESS ADMINISTRATION PROGRAM, evening</li>\
             <li>Executive education short courses</li>"
        ));
        let out = extract_details(&html, "");
        assert_eq!(
            out,
            vec![
                format!("{prefix} (full time)"),
                "Executive education short courses".to_string(),
            ]
        );
    }

    #[test]
    fn table_rows_join_meaningful_cells() {
        let html = page(
            "<table>\
             <tr><th>Program</th><th>Fee</th><th>Seats</th></tr>\
             <tr><td>Medicine</td><td>n/a</td><td>120 seats</td></tr>\
             <tr><td>Law</td><td>-</td></tr>\
             </table>",
        );
        assert_eq!(
            extract_details(&html, ""),
            vec!["Program - Seats", "Medicine - 120 seats"]
        );
    }

    #[test]
    fn capped_at_thirty_with_early_stages_kept() {
        let mut body = String::new();
        for i in 0..25 {
            body.push_str(&format!("<h2>Heading number {i:02}</h2>"));
        }
        for i in 0..25 {
            body.push_str(&format!("<li>List item number {i:02}</li>"));
        }
        let out = extract_details(&page(&body), "");
        assert_eq!(out.len(), MAX_DETAILS);
        assert!(out[..25].iter().all(|d| d.starts_with("Heading")));
        assert_eq!(out[25], "List item number 00");
        assert_eq!(out[29], "List item number 04");
    }

    #[test]
    fn whitespace_is_collapsed() {
        let html = page("<h2>\n   Graduate\n\t  <em>school</em>  </h2>");
        assert_eq!(extract_details(&html, ""), vec!["Graduate school"]);
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(extract_details("", "").is_empty());
        assert!(extract_details(&page("<div><span>hi</span></div>"), "").is_empty());
    }

    #[test]
    fn output_keys_are_unique() {
        let mut body = String::new();
        for _ in 0..3 {
            body.push_str("<h2>Repeated heading text</h2><p>Repeated paragraph that is long enough to count.</p>");
        }
        let out = extract_details(&page(&body), "");
        let keys: HashSet<String> = out
            .iter()
            .map(|d| d.chars().take(40).collect::<String>().to_lowercase())
            .collect();
        assert_eq!(keys.len(), out.len());
        assert_eq!(out.len(), 2);
    }
}
