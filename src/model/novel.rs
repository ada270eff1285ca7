//! Novel and chapter input types

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// A chapter of the input novel.
///
/// `index` is 1-based and contiguous across the novel; it is the unit of
/// locality for all per-chapter scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub index: usize,
    pub title: String,
    pub text: String,
}

impl Chapter {
    pub fn new(index: usize, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            text: text.into(),
        }
    }
}

/// The input root: an ordered sequence of chapters.
///
/// Created by the ingester; read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Novel {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<Chapter>,
}

impl Novel {
    pub fn new(id: impl Into<String>, title: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            chapters,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Validate the input contract: non-empty text, 1-based contiguous
    /// chapter indices.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.chapters.is_empty() {
            return Err(AnalysisError::InvalidInput("novel has no chapters".into()));
        }
        if self.chapters.iter().all(|c| c.text.trim().is_empty()) {
            return Err(AnalysisError::InvalidInput(
                "every chapter is empty".into(),
            ));
        }
        for (i, chapter) in self.chapters.iter().enumerate() {
            if chapter.index != i + 1 {
                return Err(AnalysisError::InvalidInput(format!(
                    "chapter indices must be 1-based and contiguous; found {} at position {}",
                    chapter.index,
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// Total character count across all chapters (CJK text has no word
    /// boundaries, so "words" in statistics means non-whitespace chars).
    pub fn word_count(&self) -> usize {
        self.chapters
            .iter()
            .map(|c| c.text.chars().filter(|ch| !ch.is_whitespace()).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_contiguous_chapters() {
        let novel = Novel::new(
            "n1",
            "测试",
            vec![
                Chapter::new(1, "一", "林远走入山门。"),
                Chapter::new(2, "二", "他遇见了师父。"),
            ],
        );
        assert!(novel.validate().is_ok());
    }

    #[test]
    fn validate_rejects_gap_in_indices() {
        let novel = Novel::new(
            "n1",
            "测试",
            vec![
                Chapter::new(1, "一", "文"),
                Chapter::new(3, "三", "文"),
            ],
        );
        assert!(matches!(
            novel.validate(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_novel() {
        let novel = Novel::new("n1", "空", vec![]);
        assert!(novel.validate().is_err());

        let blank = Novel::new("n2", "空白", vec![Chapter::new(1, "一", "  \n")]);
        assert!(blank.validate().is_err());
    }
}
