//! Plain-text ingestion: chapter splitting and novel loading
//!
//! Recognizes the usual Chinese chapter headings (第N章 / 第一章 / 第N回 /
//! 第N节, arabic or Chinese numerals). Text before the first heading
//! becomes a prologue chapter; a text with no headings at all becomes a
//! single chapter.

use crate::error::AnalysisError;
use crate::model::{Chapter, Novel};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static CHAPTER_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*第\s*([0-9０-９一二三四五六七八九十百千万零〇两]+)\s*[章回节卷]\s*(.*)$")
        .expect("chapter heading pattern")
});

/// Split raw novel text into chapters on heading lines.
pub fn split_chapters(text: &str) -> Result<Vec<Chapter>, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::InvalidInput("empty novel text".into()));
    }

    struct Draft {
        title: String,
        body: String,
    }
    let mut drafts: Vec<Draft> = Vec::new();
    let mut prologue = String::new();

    for line in text.lines() {
        if let Some(captures) = CHAPTER_HEADING.captures(line) {
            let title = captures
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| line.trim().to_string());
            drafts.push(Draft {
                title,
                body: String::new(),
            });
        } else if let Some(current) = drafts.last_mut() {
            current.body.push_str(line);
            current.body.push('\n');
        } else {
            prologue.push_str(line);
            prologue.push('\n');
        }
    }

    let mut chapters = Vec::new();
    if drafts.is_empty() {
        // No headings: the whole text is one chapter.
        chapters.push(Chapter::new(1, "全文", text.trim()));
        return Ok(chapters);
    }
    if !prologue.trim().is_empty() {
        chapters.push(Chapter::new(0, "序", prologue.trim()));
    }
    for draft in drafts {
        let index = chapters.len() + 1;
        chapters.push(Chapter::new(index, draft.title, draft.body.trim()));
    }
    // Re-index so the prologue (if any) is chapter 1 and indices stay
    // contiguous.
    for (i, chapter) in chapters.iter_mut().enumerate() {
        chapter.index = i + 1;
    }
    Ok(chapters)
}

/// Load a UTF-8 novel file and split it into a [`Novel`].
pub fn read_novel(
    path: impl AsRef<Path>,
    id: impl Into<String>,
    title: impl Into<String>,
) -> Result<Novel, AnalysisError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        AnalysisError::InvalidInput(format!("unreadable novel file {}: {e}", path.display()))
    })?;
    let chapters = split_chapters(&text)?;
    Ok(Novel::new(id, title, chapters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_arabic_and_chinese_numerals() {
        let chapters = split_chapters(
            "第1章 入山\n林远入山。\n第二章 拜师\n林远拜沈天为师。\n第3回 下山\n林远下山。",
        )
        .unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].title, "入山");
        assert_eq!(chapters[1].title, "拜师");
        assert!(chapters[1].text.contains("拜沈天为师"));
        assert_eq!(
            chapters.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn text_before_first_heading_is_prologue() {
        let chapters = split_chapters("楔子文字。\n第一章 开端\n正文。").unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "序");
        assert_eq!(chapters[0].index, 1);
        assert_eq!(chapters[1].index, 2);
    }

    #[test]
    fn headingless_text_is_single_chapter() {
        let chapters = split_chapters("只有一段文字。没有任何章节。").unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].index, 1);
    }

    #[test]
    fn empty_text_is_invalid() {
        assert!(matches!(
            split_chapters("  \n"),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn untitled_heading_keeps_heading_line() {
        let chapters = split_chapters("第一章\n正文。").unwrap();
        assert_eq!(chapters[0].title, "第一章");
    }
}
