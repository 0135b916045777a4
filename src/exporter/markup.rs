// file: src/exporter/markup.rs
// description: renders the record list back into catalog page markup
// reference: internal rendering rules

use crate::models::{Book, BookField, FileStructure};

/// Markup for one record, matching the exact forms the parser tries first.
pub fn render_book(book: &Book) -> String {
    let title = book.normalized_field(BookField::Title);
    let author = book.normalized_field(BookField::Author);
    let external_url = book.normalized_field(BookField::ExternalUrl);
    let cover = book.normalized_field(BookField::Cover);
    let description = book.normalized_field(BookField::Description);
    let publish_date = book.normalized_field(BookField::PublishDate);
    let download_link = book.normalized_field(BookField::DownloadLink);
    let extract_code = book.normalized_field(BookField::ExtractCode);

    format!(
        r#"            <!-- 书籍{title} -->
            <li>
                <div class="info">
                    <a href="{external_url}" target="_blank" rel="noopener noreferrer" class="book-container">
                        <div class="book" title="{title}">
                            <img src="{cover}" alt="{title}">
                        </div>
                    </a>
                    <div class="info-card">
                        <div class="hidden-content">
                            <p class="text">{description}</p>
                        </div>
                        <h3>《{title}》</h3>
                        <p>作者：{author}</p>
                        <p>出版时间：{publish_date}</p>
                        <p>
                            <a href="{download_link}" target="_blank" rel="noopener noreferrer">📥 下载</a>
                        </p>
                        <p class="pwd-text">
                            提取码：{extract_code}
                        </p>
                    </div>
                </div>
            </li>"#
    )
}

/// Full page: `header`, newline, blocks joined by newlines, newline, `footer`.
///
/// The separating newlines sit inside the container, so a later parse hands
/// back exactly the structure passed in here.
pub fn render_catalog(books: &[Book], structure: Option<&FileStructure>) -> String {
    let default_structure;
    let structure = match structure {
        Some(structure) => structure,
        None => {
            default_structure = FileStructure::default();
            &default_structure
        }
    };

    let blocks: Vec<String> = books.iter().map(render_book).collect();
    format!(
        "{}\n{}\n{}",
        structure.header,
        blocks.join("\n"),
        structure.footer
    )
}
