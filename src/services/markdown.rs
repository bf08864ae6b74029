//! Markdown 讲稿转纯文本
//! 使用 pulldown-cmark 的 Pull 模式遍历事件，块级元素结束处输出换行，便于分页器按段落断开

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

pub fn to_plain_text(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut output = String::with_capacity(content.len());
    for event in Parser::new_ext(content, options) {
        match event {
            Event::Text(text) | Event::Code(text) => output.push_str(&text),
            Event::SoftBreak => output.push(' '),
            Event::HardBreak => output.push('\n'),
            Event::Start(Tag::Item) => output.push_str("- "),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::BlockQuote)
            | Event::End(TagEnd::TableRow)
            | Event::End(TagEnd::TableHead) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            Event::End(TagEnd::TableCell) => output.push(' '),
            Event::Rule => output.push('\n'),
            _ => {}
        }
    }

    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let md = "# Module 1\n\nReading is a *core* skill.\nIt takes **practice**.\n\n## Lesson";
        assert_eq!(
            to_plain_text(md),
            "Module 1\nReading is a core skill. It takes practice.\nLesson"
        );
    }

    #[test]
    fn test_lists_and_code() {
        let md = "- first item\n- second `code`\n";
        assert_eq!(to_plain_text(md), "- first item\n- second code");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(to_plain_text("just words"), "just words");
        assert_eq!(to_plain_text(""), "");
    }
}
