// file: src/parser/patterns.rs
// description: compiled regex patterns for catalog markup parsing
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

fn compile_all(patterns: &[&str], name: &str) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).unwrap_or_else(|e| panic!("{} regex {:?} is invalid: {}", name, pattern, e))
        })
        .collect()
}

lazy_static! {
    // Record blocks
    pub static ref STRICT_BLOCK: Regex = Regex::new(
        r#"<li>\s*<div class="info">([\s\S]*?)</div>\s*</div>\s*</li>"#
    ).expect("STRICT_BLOCK regex is valid");

    pub static ref RELAXED_CONTAINER: Regex = Regex::new(
        r"(?i)<ul[^>]*class=[^>]*content[^>]*>[\s\S]*?</ul>"
    ).expect("RELAXED_CONTAINER regex is valid");

    pub static ref RELAXED_BLOCKS: Vec<Regex> = compile_all(&[
        r#"<li>\s*<div class="info">([\s\S]*?)</div>\s*</div>\s*</li>"#,
        r"<li[^>]*>([\s\S]*?)</li>",
        r"<div[^>]*class=[^>]*info[^>]*>([\s\S]*?)</div>",
    ], "RELAXED_BLOCKS");

    pub static ref GENERIC_ELEMENTS: Vec<Regex> = compile_all(&[
        r"<[^>]*href=[^>]*douban\.com[^>]*>[\s\S]*?</[^>]*>",
        r"<[^>]*title=[^>]*>[\s\S]*?</[^>]*>",
        r"<li[^>]*>[\s\S]*?</li>",
        r"<div[^>]*>[\s\S]*?</div>",
    ], "GENERIC_ELEMENTS");

    // File structure
    pub static ref LIST_OPEN: Regex = Regex::new(
        r"(?i)<(ul|ol|div)[^>]*>"
    ).expect("LIST_OPEN regex is valid");

    // Content signals
    pub static ref BOOK_INDICATORS: Vec<Regex> = compile_all(&[
        r"douban\.com",
        r"作者：",
        r"出版时间：",
        r"提取码：",
        r"下载",
        r"《.*?》",
        r#"title=.*?书.*?""#,
    ], "BOOK_INDICATORS");

    pub static ref BOOK_SIGNALS: Regex = Regex::new(
        r"《[^》]*》|作者：|出版时间：|下载|douban\.com"
    ).expect("BOOK_SIGNALS regex is valid");

    // Fields. Each list opens with the exact form the renderer emits, which
    // may capture an empty value; looser fallbacks follow.
    pub static ref EXTERNAL_URL_PATTERNS: Vec<Regex> = compile_all(&[
        r#"<a href="([^"]*)"[^>]*class="book-container""#,
        r#"href="(https://book\.douban\.com/subject/[^"]+)""#,
        r"href='(https://book\.douban\.com/subject/[^']+)'",
        r"douban\.com/subject/(\d+)",
    ], "EXTERNAL_URL_PATTERNS");

    pub static ref TITLE_PATTERNS: Vec<Regex> = compile_all(&[
        r#"<div class="book" title="([^"]*)">"#,
        r#"title="([^"]+)""#,
        r"title='([^']+)'",
        r"<h[1-6][^>]*>《([^》]+)》</h[1-6]>",
        r"<h[1-6][^>]*>([^<]+)</h[1-6]>",
        r"《([^》]+)》",
        r"<[^>]*class=[^>]*title[^>]*>([^<]+)</[^>]*>",
        r"<strong[^>]*>([^<]+)</strong>",
    ], "TITLE_PATTERNS");

    pub static ref COVER_PATTERNS: Vec<Regex> = compile_all(&[
        r#"<img src="([^"]*)""#,
        r#"(?i)src="([^"]+\.(?:jpg|jpeg|png|gif|webp)[^"]*)"[^>]*alt="[^"]*书[^"]*""#,
        r#"src="([^"]+\.(?:jpg|jpeg|png|gif|webp)[^"]*)""#,
        r"src='([^']+\.(?:jpg|jpeg|png|gif|webp)[^']*)'",
    ], "COVER_PATTERNS");

    pub static ref DESCRIPTION_PATTERNS: Vec<Regex> = compile_all(&[
        r#"<p class="text">([^<]*)</p>"#,
        r"<p[^>]*class=[^>]*text[^>]*>([^<]+)</p>",
        r"<p[^>]*>([^<]{20,})</p>",
        r"<div[^>]*class=[^>]*desc[^>]*>([^<]+)</div>",
        r"<span[^>]*class=[^>]*desc[^>]*>([^<]+)</span>",
    ], "DESCRIPTION_PATTERNS");

    pub static ref AUTHOR_PATTERNS: Vec<Regex> = compile_all(&[
        r"<p>作者：([^<\n]*)</p>",
        r"作者：([^<\n]+)(?:<|$)",
        r"作者:([^<\n]+)(?:<|$)",
        r"著者：([^<\n]+)(?:<|$)",
        r"(?i)by ([^<\n]+)(?:<|$)",
        r"<[^>]*class=[^>]*author[^>]*>([^<]+)</[^>]*>",
    ], "AUTHOR_PATTERNS");

    pub static ref PUBLISH_DATE_PATTERNS: Vec<Regex> = compile_all(&[
        r"<p>出版时间：([^<\n]*)</p>",
        r"出版时间：([^<\n]+)(?:<|$)",
        r"出版时间:([^<\n]+)(?:<|$)",
        r"出版：([^<\n]+)(?:<|$)",
        r"(\d{4}年\d{1,2}月|\d{4}-\d{1,2}-\d{1,2}|\d{4}/\d{1,2}/\d{1,2})",
    ], "PUBLISH_DATE_PATTERNS");

    pub static ref DOWNLOAD_PATTERNS: Vec<Regex> = compile_all(&[
        r#"href="([^"]*)"[^>]*>📥 下载</a>"#,
        r#"href="([^"]+)"[^>]*>下载</a>"#,
        r#"href="([^"]+)"[^>]*>.*?下载.*?</a>"#,
        r#"(?i)<a[^>]*href="([^"]+)"[^>]*>.*?(?:下载|download).*?</a>"#,
    ], "DOWNLOAD_PATTERNS");

    pub static ref EXTRACT_CODE_PATTERNS: Vec<Regex> = compile_all(&[
        r#"<p class="pwd-text">\s*提取码：([^<\s]*)\s*</p>"#,
        r#"(?i)<p\s+class=["']pwd-text["'][^>]*>[\s\S]*?提取码：([^<\s]+)[\s\S]*?</p>"#,
        r#"(?i)<p\s+class=["']pwd-text["'][^>]*>[\s\S]*?提取码:([^<\s]+)[\s\S]*?</p>"#,
        r"提取码：([^<\s]+)(?:<|$)",
        r"提取码:([^<\s]+)(?:<|$)",
        r"密码：([^<\s]+)(?:<|$)",
        r"密码:([^<\s]+)(?:<|$)",
        r"(?i)code：([^<\s]+)(?:<|$)",
        r"(?i)code:([^<\s]+)(?:<|$)",
    ], "EXTRACT_CODE_PATTERNS");

    /// Markers of a code slot that is present but deliberately left empty.
    pub static ref EMPTY_CODE_MARKERS: Vec<Regex> = compile_all(&[
        r#"(?i)<p\s+class=["']pwd-text["'][^>]*>[\s\S]*?提取码：[\s\S]*?</p>"#,
        r#"(?i)<p\s+class=["']pwd-text["'][^>]*>[\s\S]*?提取码:[\s\S]*?</p>"#,
        r"提取码：\s*(?:<|$)",
        r"提取码:\s*(?:<|$)",
    ], "EMPTY_CODE_MARKERS");

    pub static ref TITLE_BRACKETS: Regex = Regex::new(
        r"[《》「」『』]"
    ).expect("TITLE_BRACKETS regex is valid");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_pattern_lists_compile() {
        assert_eq!(RELAXED_BLOCKS.len(), 3);
        assert_eq!(GENERIC_ELEMENTS.len(), 4);
        assert!(!TITLE_PATTERNS.is_empty());
        assert!(!EXTRACT_CODE_PATTERNS.is_empty());
        assert!(!EMPTY_CODE_MARKERS.is_empty());
    }

    #[test]
    fn test_book_signals() {
        assert!(BOOK_SIGNALS.is_match("<h3>《活着》</h3>"));
        assert!(BOOK_SIGNALS.is_match("<a href=\"https://book.douban.com/subject/1/\">"));
        assert!(!BOOK_SIGNALS.is_match("<p>hello world</p>"));
    }

    #[test]
    fn test_strict_block_captures_inner_markup() {
        let html = "<li>\n<div class=\"info\"><a></a><div class=\"info-card\"><p>x</p>\n</div>\n</div>\n</li>";
        let captures = STRICT_BLOCK.captures(html).unwrap();
        assert!(captures[1].contains("<p>x</p>"));
    }
}
