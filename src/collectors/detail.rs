//! Detail page extraction: description text and applicant count.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use crate::collectors::fetcher::Document;
use crate::collectors::listing::parse;
use crate::models::job::DESCRIPTION_NOT_FOUND;

static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| parse("div.description__text.description__text--rich"));
static APPLICANTS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        parse("figcaption.num-applicants__caption"),
        parse("span.num-applicants__caption"),
    ]
});

/// Fields read from a posting's detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDetails {
    pub description: String,
    pub applicant_count: Option<u32>,
}

pub fn extract_details(doc: Option<&Document>) -> JobDetails {
    let Some(doc) = doc else {
        return JobDetails {
            description: DESCRIPTION_NOT_FOUND.to_string(),
            applicant_count: None,
        };
    };
    let html = Html::parse_document(&doc.html);
    JobDetails {
        description: description(&html),
        applicant_count: applicant_count(&html),
    }
}

fn description(html: &Html) -> String {
    let Some(container) = html.select(&DESCRIPTION).next() else {
        return DESCRIPTION_NOT_FOUND.to_string();
    };

    let mut pieces = Vec::new();
    collect_text(container, false, &mut pieces);

    pieces
        .join("\n")
        .trim()
        .replace("\n\n", "")
        .replace("::marker", "-")
        .replace("-\n", "- ")
        .replace("Show less", "")
        .replace("Show more", "")
}

/// Text nodes in document order. Inline `span`/`a` subtrees are dropped
/// and every list item inside a `ul` gets a leading "-" piece.
fn collect_text(el: ElementRef<'_>, in_list: bool, pieces: &mut Vec<String>) {
    for child in el.children() {
        if let Node::Text(text) = child.value() {
            pieces.push(String::from(&**text));
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        match child.value().name() {
            "span" | "a" => {}
            "ul" => collect_text(child, true, pieces),
            "li" if in_list => {
                pieces.push("-".to_string());
                collect_text(child, in_list, pieces);
            }
            _ => collect_text(child, in_list, pieces),
        }
    }
}

fn applicant_count(html: &Html) -> Option<u32> {
    APPLICANTS.iter().find_map(|selector| {
        let caption = html.select(selector).next()?;
        first_number(&caption.text().collect::<String>())
    })
}

/// First number in `text`, allowing thousands separators ("1,024").
fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
