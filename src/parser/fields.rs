// file: src/parser/fields.rs
// description: per-record field extraction from a markup block
// reference: internal parsing rules

use crate::parser::patterns::{
    AUTHOR_PATTERNS, COVER_PATTERNS, DESCRIPTION_PATTERNS, DOWNLOAD_PATTERNS, EMPTY_CODE_MARKERS,
    EXTERNAL_URL_PATTERNS, EXTRACT_CODE_PATTERNS, PUBLISH_DATE_PATTERNS, TITLE_BRACKETS,
    TITLE_PATTERNS,
};
use regex::Regex;

const DOUBAN_SUBJECT_URL: &str = "https://book.douban.com/subject/";

/// What a block says about its extract code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeMarker {
    Present(String),
    /// The code slot exists but holds nothing.
    ExplicitlyEmpty,
    Absent,
}

impl CodeMarker {
    pub fn value(&self) -> &str {
        match self {
            CodeMarker::Present(code) => code,
            CodeMarker::ExplicitlyEmpty | CodeMarker::Absent => "",
        }
    }
}

/// Raw field values lifted from one record block, before identity is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    /// `None` when the block names no title at all. The template's title
    /// attribute counts even when empty.
    pub title: Option<String>,
    pub author: String,
    pub cover: String,
    pub external_url: String,
    pub description: String,
    pub download_link: String,
    pub extract_code: CodeMarker,
    pub publish_date: String,
}

/// First pattern that matches wins, even when its capture is empty.
fn first_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

/// The template attribute decides when present; otherwise the first capture
/// that is more than book-title brackets wins.
fn extract_title(html: &str) -> Option<String> {
    let (template, fallbacks) = TITLE_PATTERNS.split_first()?;
    if let Some(value) = template.captures(html).and_then(|caps| caps.get(1)) {
        return Some(value.as_str().trim().to_string());
    }

    fallbacks.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !TITLE_BRACKETS.replace_all(value, "").trim().is_empty())
    })
}

fn extract_external_url(html: &str) -> String {
    match first_match(&EXTERNAL_URL_PATTERNS, html) {
        Some(value) if !value.is_empty() && !value.starts_with("http") => {
            // bare subject id from the last fallback
            format!("{}{}/", DOUBAN_SUBJECT_URL, value)
        }
        Some(value) => value,
        None => String::new(),
    }
}

fn extract_code(html: &str) -> CodeMarker {
    if let Some(code) = first_match(&EXTRACT_CODE_PATTERNS, html) {
        if code.is_empty() {
            return CodeMarker::ExplicitlyEmpty;
        }
        return CodeMarker::Present(code);
    }

    if EMPTY_CODE_MARKERS.iter().any(|marker| marker.is_match(html)) {
        CodeMarker::ExplicitlyEmpty
    } else {
        CodeMarker::Absent
    }
}

pub fn extract_fields(html: &str) -> ExtractedFields {
    ExtractedFields {
        title: extract_title(html),
        author: first_match(&AUTHOR_PATTERNS, html).unwrap_or_default(),
        cover: first_match(&COVER_PATTERNS, html).unwrap_or_default(),
        external_url: extract_external_url(html),
        description: first_match(&DESCRIPTION_PATTERNS, html).unwrap_or_default(),
        download_link: first_match(&DOWNLOAD_PATTERNS, html).unwrap_or_default(),
        extract_code: extract_code(html),
        publish_date: first_match(&PUBLISH_DATE_PATTERNS, html).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE_BLOCK: &str = r#"
                    <a href="https://book.douban.com/subject/1000000/" target="_blank" rel="noopener noreferrer" class="book-container">
                        <div class="book" title="我与地坛">
                            <img src="https://img.example.com/ditan.jpg" alt="我与地坛">
                        </div>
                    </a>
                    <div class="info-card">
                        <div class="hidden-content">
                            <p class="text">关于生命的沉思</p>
                        </div>
                        <h3>《我与地坛》</h3>
                        <p>作者：史铁生</p>
                        <p>出版时间：2011-01</p>
                        <p>
                            <a href="https://pan.example.com/s/ditan" target="_blank" rel="noopener noreferrer">📥 下载</a>
                        </p>
                        <p class="pwd-text">
                            提取码：ab12
                        </p>
"#;

    #[test]
    fn test_extracts_template_block() {
        let fields = extract_fields(TEMPLATE_BLOCK);
        assert_eq!(fields.title.as_deref(), Some("我与地坛"));
        assert_eq!(fields.author, "史铁生");
        assert_eq!(fields.cover, "https://img.example.com/ditan.jpg");
        assert_eq!(fields.external_url, "https://book.douban.com/subject/1000000/");
        assert_eq!(fields.description, "关于生命的沉思");
        assert_eq!(fields.download_link, "https://pan.example.com/s/ditan");
        assert_eq!(fields.extract_code, CodeMarker::Present("ab12".to_string()));
        assert_eq!(fields.publish_date, "2011-01");
    }

    #[test]
    fn test_empty_template_slots_stay_empty() {
        let html = TEMPLATE_BLOCK
            .replace("关于生命的沉思", "")
            .replace("ab12", "");
        let fields = extract_fields(&html);
        assert_eq!(fields.description, "");
        assert_eq!(fields.extract_code, CodeMarker::ExplicitlyEmpty);
        assert_eq!(fields.extract_code.value(), "");
    }

    #[test]
    fn test_loose_markup_fallbacks() {
        let html = r#"<div><strong>活着</strong><span>作者:余华</span>
            <a href="https://pan.example.com/x">点击下载</a> <span>密码：x9y8</span>
            <span>https://book.douban.com/subject/4913064/</span></div>"#;
        let fields = extract_fields(html);
        assert_eq!(fields.title.as_deref(), Some("活着"));
        assert_eq!(fields.author, "余华");
        assert_eq!(fields.download_link, "https://pan.example.com/x");
        assert_eq!(fields.extract_code, CodeMarker::Present("x9y8".to_string()));
        assert_eq!(fields.external_url, "https://book.douban.com/subject/4913064/");
    }

    #[test]
    fn test_missing_code_is_absent() {
        let fields = extract_fields("<h3>《活着》</h3><p>作者：余华</p>");
        assert_eq!(fields.title.as_deref(), Some("活着"));
        assert_eq!(fields.extract_code, CodeMarker::Absent);
    }

    #[test]
    fn test_empty_template_title_is_not_replaced() {
        let html = TEMPLATE_BLOCK.replace("我与地坛", "");
        let fields = extract_fields(&html);
        assert_eq!(fields.title.as_deref(), Some(""));
        assert_eq!(fields.author, "史铁生");
    }

    #[test]
    fn test_bare_brackets_are_not_a_title() {
        let fields = extract_fields("<h3>《》</h3><p>作者：余华</p>");
        assert_eq!(fields.title, None);
    }
}
