//! Chinese text processing primitives
//!
//! Sentence segmentation, dictionary/heuristic word segmentation with
//! part-of-speech tags, tolerant dialogue extraction, and sentence
//! windowing. All operations are pure — the processor holds only the
//! read-only lexicons plus an optional per-analysis name dictionary, and
//! no state survives between calls.

use crate::error::AnalysisError;
use crate::lexicon::Lexicons;
use std::collections::HashSet;

/// Part-of-speech classes the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pos {
    /// Surname-led 2–3 character token, or a known character name
    PersonName,
    /// Suffix-matched place name
    PlaceName,
    /// Event-lexicon verb
    Verb,
    /// Stop word
    Stop,
    /// Punctuation
    Punct,
    /// Anything else
    Word,
}

/// A segmented token with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub pos: Pos,
}

/// A quoted utterance with its leading narration (used for speaker
/// attribution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueSpan {
    /// Narration immediately before the opening quote, same line
    pub lead: String,
    /// The quoted text, quotes stripped
    pub text: String,
}

/// Sentence terminators for segmentation.
const TERMINATORS: [char; 5] = ['。', '！', '？', '!', '?'];

/// Characters that end a person-name run (particles, common predicates,
/// punctuation handled separately).
const NAME_BREAKS: &str = "的了在是有和就不都也很到说要去会着看走来回入出跟向被把对与及曾已又再便即乃忽突然却正欲将道见遇战斗杀救定逃归拜同大小高低笑哭喊叫问答望吃喝闻听抬点摇挥拔持执提举冲奔站坐卧行伤亡死生怔愣呆住停留飞落起退进攻守败胜离别返抵达临受重学绝悟突破称封晋贬流";

/// Motion characters that must not begin a place name ("入山" is an act,
/// not a location).
const PLACE_BREAKS: &str = "入出进回去来从向往至过到赴登抵返";

/// Quote pairs recognized by the dialogue extractor.
const QUOTE_PAIRS: [(char, char); 4] = [('“', '”'), ('「', '」'), ('‘', '’'), ('"', '"')];

/// Pure text-processing helpers over the injected lexicons.
pub struct TextProcessor<'a> {
    lexicons: &'a Lexicons,
    /// Known character names, added once entity extraction has run
    names: HashSet<String>,
}

impl<'a> TextProcessor<'a> {
    pub fn new(lexicons: &'a Lexicons) -> Self {
        Self {
            lexicons,
            names: HashSet::new(),
        }
    }

    /// Add known character names so later passes segment them verbatim.
    pub fn with_names<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.names.extend(names);
        self
    }

    /// Split text into sentences on 。！？!? and newlines.
    ///
    /// Fails with `InvalidInput` on empty or whitespace-only text.
    pub fn sentences(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("empty text".into()));
        }
        let mut out = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            if TERMINATORS.contains(&ch) {
                current.push(ch);
                push_sentence(&mut out, &mut current);
            } else if ch == '\n' {
                push_sentence(&mut out, &mut current);
            } else {
                current.push(ch);
            }
        }
        push_sentence(&mut out, &mut current);
        Ok(out)
    }

    /// Segment one sentence into tagged tokens.
    ///
    /// Matching order per position: known names, place-suffix windows,
    /// surname-led name runs, multi-character lexicon entries, single
    /// character fallback.
    pub fn segment(&self, sentence: &str) -> Vec<Token> {
        let chars: Vec<char> = sentence.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch.is_whitespace() {
                i += 1;
                continue;
            }
            if !is_han(ch) {
                tokens.push(Token {
                    text: ch.to_string(),
                    pos: Pos::Punct,
                });
                i += 1;
                continue;
            }
            if let Some(len) = self.match_known_name(&chars, i) {
                tokens.push(token_at(&chars, i, len, Pos::PersonName));
                i += len;
                continue;
            }
            if let Some(len) = self.match_place(&chars, i) {
                tokens.push(token_at(&chars, i, len, Pos::PlaceName));
                i += len;
                continue;
            }
            if let Some(len) = self.match_surname_run(&chars, i) {
                tokens.push(token_at(&chars, i, len, Pos::PersonName));
                i += len;
                continue;
            }
            if let Some((len, pos)) = self.match_lexicon(&chars, i) {
                tokens.push(token_at(&chars, i, len, pos));
                i += len;
                continue;
            }
            let pos = if self.lexicons.stop_words.contains(&ch.to_string()) {
                Pos::Stop
            } else {
                Pos::Word
            };
            tokens.push(Token {
                text: ch.to_string(),
                pos,
            });
            i += 1;
        }
        tokens
    }

    /// Drop stop words and punctuation from a token stream.
    pub fn filter_stop_words(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|t| t.pos != Pos::Stop && t.pos != Pos::Punct)
            .collect()
    }

    /// Extract quoted utterances with tolerant matching.
    ///
    /// An opening quote with no matching close swallows the rest of its
    /// line; straight double quotes alternate open/close. Nested foreign
    /// quote kinds inside an utterance are kept verbatim.
    pub fn dialogues(&self, text: &str) -> Vec<DialogueSpan> {
        let mut spans = Vec::new();
        for line in text.lines() {
            let chars: Vec<char> = line.chars().collect();
            let mut lead_start = 0;
            let mut i = 0;
            while i < chars.len() {
                let ch = chars[i];
                if let Some(close) = opening_quote(ch) {
                    let lead: String = chars[lead_start..i].iter().collect();
                    let mut j = i + 1;
                    while j < chars.len() && chars[j] != close {
                        j += 1;
                    }
                    let quoted: String = chars[i + 1..j.min(chars.len())].iter().collect();
                    if !quoted.trim().is_empty() {
                        spans.push(DialogueSpan {
                            lead: lead.trim().to_string(),
                            text: quoted.trim().to_string(),
                        });
                    }
                    i = if j < chars.len() { j + 1 } else { j };
                    lead_start = i;
                } else {
                    i += 1;
                }
            }
        }
        spans
    }

    /// Sliding windows of `n` consecutive sentences, stride 1.
    ///
    /// A text with fewer than `n` sentences yields one window with all of
    /// them.
    pub fn windows<'s>(&self, sentences: &'s [String], n: usize) -> Vec<&'s [String]> {
        let n = n.max(1);
        if sentences.is_empty() {
            return Vec::new();
        }
        if sentences.len() <= n {
            return vec![sentences];
        }
        sentences.windows(n).collect()
    }

    fn match_known_name(&self, chars: &[char], i: usize) -> Option<usize> {
        // Longest known name first, capped at 6 chars
        for len in (2..=6.min(chars.len() - i)).rev() {
            let candidate: String = chars[i..i + len].iter().collect();
            if self.names.contains(&candidate) {
                return Some(len);
            }
        }
        None
    }

    fn match_place(&self, chars: &[char], i: usize) -> Option<usize> {
        for len in (2..=4.min(chars.len() - i)).rev() {
            let window = &chars[i..i + len];
            if !window.iter().all(|&c| is_han(c)) {
                continue;
            }
            let last = window[len - 1].to_string();
            if self.lexicons.place_suffixes.contains_key(&last)
                && !PLACE_BREAKS.contains(window[0])
                && !self
                    .lexicons
                    .stop_words
                    .contains(&window[0].to_string())
            {
                return Some(len);
            }
        }
        None
    }

    fn match_surname_run(&self, chars: &[char], i: usize) -> Option<usize> {
        let surname_len = self.surname_at(chars, i)?;
        let mut len = surname_len;
        while len < surname_len + 2 && i + len < chars.len() {
            let next = chars[i + len];
            if !is_han(next) || NAME_BREAKS.contains(next) {
                break;
            }
            if self.lexicons.stop_words.contains(&next.to_string()) {
                break;
            }
            len += 1;
        }
        // A bare surname is not a name; require at least one given-name char
        if len > surname_len {
            Some(len)
        } else {
            None
        }
    }

    fn surname_at(&self, chars: &[char], i: usize) -> Option<usize> {
        if i + 1 < chars.len() {
            let two: String = chars[i..i + 2].iter().collect();
            if self.lexicons.surnames.contains(&two) {
                return Some(2);
            }
        }
        let one = chars[i].to_string();
        if self.lexicons.surnames.contains(&one) {
            Some(1)
        } else {
            None
        }
    }

    fn match_lexicon(&self, chars: &[char], i: usize) -> Option<(usize, Pos)> {
        for len in (2..=4.min(chars.len() - i)).rev() {
            let candidate: String = chars[i..i + len].iter().collect();
            if self.lexicons.stop_words.contains(&candidate) {
                return Some((len, Pos::Stop));
            }
            if self
                .lexicons
                .event_verbs
                .iter()
                .any(|v| v.verb == candidate)
            {
                return Some((len, Pos::Verb));
            }
        }
        let one = chars[i].to_string();
        if self.lexicons.event_verbs.iter().any(|v| v.verb == one) {
            return Some((1, Pos::Verb));
        }
        None
    }
}

fn push_sentence(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

fn token_at(chars: &[char], i: usize, len: usize, pos: Pos) -> Token {
    Token {
        text: chars[i..i + len].iter().collect(),
        pos,
    }
}

fn is_han(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

fn opening_quote(ch: char) -> Option<char> {
    QUOTE_PAIRS
        .iter()
        .find(|(open, _)| *open == ch)
        .map(|(_, close)| *close)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(lex: &Lexicons) -> TextProcessor<'_> {
        TextProcessor::new(lex)
    }

    #[test]
    fn sentences_split_on_terminators_and_newlines() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let sents = tp
            .sentences("林远入山。苏青大喜！\n赵虎逃走？")
            .unwrap();
        assert_eq!(sents.len(), 3);
        assert_eq!(sents[0], "林远入山。");
    }

    #[test]
    fn empty_text_is_invalid() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        assert!(matches!(
            tp.sentences("   \n "),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn segment_finds_surname_led_names() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let tokens = tp.segment("林远走入青云山。");
        let names: Vec<_> = tokens
            .iter()
            .filter(|t| t.pos == Pos::PersonName)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(names, vec!["林远"]);
        let places: Vec<_> = tokens
            .iter()
            .filter(|t| t.pos == Pos::PlaceName)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(places, vec!["青云山"]);
    }

    #[test]
    fn segment_prefers_known_names() {
        let lex = Lexicons::builtin();
        let tp = TextProcessor::new(&lex).with_names(["林远山".to_string()]);
        let tokens = tp.segment("林远山笑了。");
        assert!(tokens
            .iter()
            .any(|t| t.text == "林远山" && t.pos == Pos::PersonName));
    }

    #[test]
    fn segment_tags_two_char_surnames() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let tokens = tp.segment("欧阳锋到了。");
        assert!(tokens
            .iter()
            .any(|t| t.text == "欧阳锋" && t.pos == Pos::PersonName));
    }

    #[test]
    fn dialogue_extraction_matches_pairs() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let spans = tp.dialogues("林远道：“父亲，我回来了。”苏青说：「好。」");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "父亲，我回来了。");
        assert!(spans[0].lead.contains("林远"));
    }

    #[test]
    fn dialogue_tolerates_unbalanced_quote() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let spans = tp.dialogues("林远道：“这句话没有结束");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "这句话没有结束");
    }

    #[test]
    fn windows_stride_one() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let sents: Vec<String> = (0..5).map(|i| format!("句{i}。")).collect();
        let windows = tp.windows(&sents, 3);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].len(), 3);

        let short = tp.windows(&sents[..2], 3);
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].len(), 2);
    }

    #[test]
    fn stop_word_filtering() {
        let lex = Lexicons::builtin();
        let tp = processor(&lex);
        let tokens = tp.segment("林远的剑。");
        let filtered = tp.filter_stop_words(tokens);
        assert!(filtered.iter().all(|t| t.text != "的" && t.text != "。"));
    }
}
