use serde::{Deserialize, Serialize};

use crate::navigation::NavigationTarget;

/// A source reference attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub citation_id: String,
    #[serde(default)]
    pub node_id: String,
    /// Empty for single-document answers, where the scope names the document.
    #[serde(rename = "doc_id", default)]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    /// Free text such as `p.12` or `pp.12-14`.
    #[serde(default)]
    pub page_range: String,
    #[serde(default)]
    pub excerpt: String,
}

impl Citation {
    pub fn page_number(&self) -> Option<u32> {
        leading_page_number(&self.page_range)
    }

    /// Where clicking this citation should go, if its page can be read.
    pub fn navigation_target(&self, scope_document: Option<&str>) -> Option<NavigationTarget> {
        let page_number = self.page_number()?;
        let document_id = if self.document_id.is_empty() {
            scope_document?
        } else {
            self.document_id.as_str()
        };
        Some(NavigationTarget::from_page_number(document_id, page_number))
    }
}

/// First run of ASCII digits in a page reference.
pub fn leading_page_number(range: &str) -> Option<u32> {
    let start = range.find(|c: char| c.is_ascii_digit())?;
    let digits: String = range[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
