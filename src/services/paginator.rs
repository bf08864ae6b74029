//! 课程内容分页
//! 将整段讲稿切分为有限长度的阅读页，优先在段落或句子边界处断开

use crate::models::Page;
use regex::RegexBuilder;

/// 默认每页字符数
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// 默认起始标记，出现时丢弃其前的全部内容
pub const DEFAULT_START_MARKER: &str =
    "Alternative Learning System K to 12 Basic Education Curriculum (ALS K to 12 BEC)";

/// 分页器
#[derive(Debug, Clone)]
pub struct ContentPaginator {
    page_size: usize,
    start_marker: Option<String>,
}

impl ContentPaginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            start_marker: Some(DEFAULT_START_MARKER.to_string()),
        }
    }

    /// 替换起始标记；`None` 表示始终使用全文
    pub fn with_start_marker(mut self, marker: Option<String>) -> Self {
        self.start_marker = marker.filter(|m| !m.is_empty());
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn paginate(&self, full_text: &str) -> Vec<Page> {
        let relevant = self.relevant_content(full_text);
        let size = self.page_size;
        let min_offset = size * 7 / 10;

        let mut pages = Vec::new();
        let mut cursor = 0;

        while cursor < relevant.len() {
            let end = advance_chars(relevant, cursor, size);

            let mut break_point = end;
            if end < relevant.len() {
                let min_break = advance_chars(relevant, cursor, min_offset);
                let last_newline = last_index_of(relevant, "\n", end);
                let last_period = last_index_of(relevant, ". ", end);

                if let Some(pos) = last_newline.filter(|&p| p > min_break) {
                    break_point = pos + 1;
                } else if let Some(pos) = last_period.filter(|&p| p > min_break) {
                    break_point = pos + 2;
                }
            }

            let content = relevant[cursor..break_point].trim();
            if !content.is_empty() {
                pages.push(Page {
                    page_number: pages.len() as u32 + 1,
                    content: content.to_string(),
                });
            }

            cursor = break_point;
        }

        if pages.is_empty() {
            pages.push(Page {
                page_number: 1,
                content: full_text.to_string(),
            });
        }

        log::debug!(
            "paginated {} chars into {} page(s) of up to {} chars",
            relevant.chars().count(),
            pages.len(),
            size
        );
        pages
    }

    fn relevant_content<'a>(&self, full_text: &'a str) -> &'a str {
        let Some(marker) = &self.start_marker else {
            return full_text;
        };

        let pattern = RegexBuilder::new(&regex::escape(marker))
            .case_insensitive(true)
            .build();

        match pattern {
            Ok(re) => match re.find(full_text) {
                Some(m) => &full_text[m.start()..],
                None => full_text,
            },
            Err(e) => {
                log::warn!("invalid start marker {:?}: {}", marker, e);
                full_text
            }
        }
    }
}

impl Default for ContentPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// 使用默认起始标记分页
pub fn paginate(full_text: &str, page_size: usize) -> Vec<Page> {
    ContentPaginator::new(page_size).paginate(full_text)
}

/// 从 `start` 起前进 `count` 个字符后的字节偏移，不超过文本末尾
fn advance_chars(text: &str, start: usize, count: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(count)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}

/// 最后一个起始位置不大于 `from` 的匹配（needle 为 ASCII）
fn last_index_of(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let mut cut = (from + needle.len()).min(haystack.len());
    while !haystack.is_char_boundary(cut) {
        cut -= 1;
    }
    haystack[..cut].rfind(needle)
}
