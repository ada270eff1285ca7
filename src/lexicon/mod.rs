//! Lexical resources for Chinese narrative analysis
//!
//! Everything lexicon-shaped lives in one injected [`Lexicons`] value:
//! stop words, surnames, place suffixes, relation patterns, dialogue
//! address terms, event verbs, cue phrases, sentiment and emotion
//! vocabularies, state-change deltas, and time-marker patterns. Stages
//! receive it explicitly — there is no ambient global — so tests can
//! inject fixtures. The embedded defaults cover classical and modern
//! narrative prose; [`Lexicons::from_dir`] overlays user-supplied files.

use crate::error::AnalysisError;
use crate::model::{EmotionCategory, EventKind, LocationKind, RelationKind, StateAxis};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A relation-indicative surface pattern.
///
/// Matched against whitespace-stripped sentences as
/// `<A><infix><B><suffix>`; when `directed` is true the relation points
/// A → B.
#[derive(Debug, Clone)]
pub struct RelationPattern {
    pub infix: String,
    /// Required text after the second name; empty for infix-only patterns
    pub suffix: String,
    pub kind: RelationKind,
    pub weight: f64,
    pub directed: bool,
}

/// A kinship or honorific address term with the relation it implies from
/// speaker to addressee.
#[derive(Debug, Clone)]
pub struct AddressTerm {
    pub term: String,
    pub kind: RelationKind,
}

/// An event-indicative verb with its classification and class weight.
#[derive(Debug, Clone)]
pub struct EventVerb {
    pub verb: String,
    pub kind: EventKind,
    pub weight: f64,
}

/// A keyword that moves one state axis by a signed delta.
#[derive(Debug, Clone)]
pub struct StateKeyword {
    pub keyword: String,
    pub axis: StateAxis,
    pub delta: f64,
}

static ABSOLUTE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[某〇零一二三四五六七八九十百千0-9]+年|[正一二三四五六七八九十腊0-9]+月(初[一二三四五六七八九十])?").expect("absolute time pattern")
});

static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9一二两三四五六七八九十百数几]+)(日|天|月|年|个时辰)(后|之后|前|之前)|次日|次年|翌日|当晚|当夜|片刻后|多年以后").expect("relative time pattern")
});

/// Read-only lexical resources, initialized once per process or injected
/// per test.
#[derive(Debug, Clone)]
pub struct Lexicons {
    pub stop_words: HashSet<String>,
    /// Single- and double-character family names used by the person-name tagger
    pub surnames: HashSet<String>,
    /// Place-name suffix → location kind
    pub place_suffixes: HashMap<String, LocationKind>,
    pub relation_patterns: Vec<RelationPattern>,
    /// Appositive connectors that merge aliases ("X，也就是Y")
    pub appositive_markers: Vec<String>,
    pub address_terms: Vec<AddressTerm>,
    pub event_verbs: Vec<EventVerb>,
    pub turning_cues: Vec<String>,
    pub consequence_cues: Vec<String>,
    pub positive_words: HashSet<String>,
    pub negative_words: HashSet<String>,
    /// Emotion keyword → six-way category
    pub emotion_words: HashMap<String, EmotionCategory>,
    pub state_keywords: Vec<StateKeyword>,
}

impl Lexicons {
    /// The embedded default lexicons.
    pub fn builtin() -> Self {
        Self {
            stop_words: set(&[
                "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "上",
                "也", "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "这",
                "那", "他", "她", "它", "们", "与", "及", "而", "之", "于", "其", "但", "被",
            ]),
            surnames: set(&[
                "赵", "钱", "孙", "李", "周", "吴", "郑", "王", "冯", "陈", "蒋", "沈", "韩",
                "杨", "朱", "秦", "许", "何", "吕", "张", "孔", "曹", "严", "华", "金", "魏",
                "陶", "姜", "谢", "邹", "柏", "窦", "苏", "潘", "葛", "范", "彭", "鲁", "韦",
                "马", "方", "俞", "任", "袁", "柳", "史", "唐", "薛", "雷", "贺", "汤", "罗",
                "林", "叶", "白", "萧", "顾", "孟", "黄", "刘", "徐", "高", "郭", "梁", "宋",
                "程", "洪", "江", "童", "颜", "郁", "段", "聂", "燕", "温", "庄", "晏", "柴",
                "慕容", "欧阳", "司马", "上官", "诸葛", "东方", "独孤", "南宫", "西门", "公孙",
            ]),
            place_suffixes: place_suffix_map(),
            relation_patterns: vec![
                pattern("的父亲是", "", RelationKind::Kin, 3.0, true),
                pattern("的母亲是", "", RelationKind::Kin, 3.0, true),
                pattern("的儿子是", "", RelationKind::Kin, 3.0, true),
                pattern("的女儿是", "", RelationKind::Kin, 3.0, true),
                pattern("的兄长是", "", RelationKind::Kin, 3.0, true),
                pattern("的哥哥是", "", RelationKind::Kin, 3.0, true),
                pattern("的妹妹是", "", RelationKind::Kin, 3.0, true),
                pattern("与", "是兄弟", RelationKind::Kin, 3.0, false),
                pattern("的妻子是", "", RelationKind::Lover, 3.0, true),
                pattern("的丈夫是", "", RelationKind::Lover, 3.0, true),
                pattern("与", "成亲", RelationKind::Lover, 3.0, false),
                pattern("拜", "为师", RelationKind::MasterDisciple, 3.0, true),
                pattern("的师父是", "", RelationKind::MasterDisciple, 3.0, true),
                pattern("的徒弟是", "", RelationKind::MasterDisciple, 3.0, true),
                pattern("与", "是朋友", RelationKind::Friend, 3.0, false),
                pattern("和", "是朋友", RelationKind::Friend, 3.0, false),
                pattern("的朋友是", "", RelationKind::Friend, 3.0, true),
                pattern("的对头是", "", RelationKind::Enemy, 3.0, true),
                pattern("的仇人是", "", RelationKind::Enemy, 3.0, true),
                pattern("与", "为敌", RelationKind::Enemy, 3.0, false),
                pattern("与", "是同僚", RelationKind::Colleague, 2.5, false),
                pattern("的师兄是", "", RelationKind::Colleague, 2.5, true),
            ],
            appositive_markers: vec![
                "也就是".into(),
                "即".into(),
                "原名".into(),
                "又名".into(),
                "人称".into(),
                "外号".into(),
            ],
            address_terms: vec![
                address("父亲", RelationKind::Kin),
                address("爹", RelationKind::Kin),
                address("母亲", RelationKind::Kin),
                address("娘", RelationKind::Kin),
                address("哥哥", RelationKind::Kin),
                address("姐姐", RelationKind::Kin),
                address("师父", RelationKind::MasterDisciple),
                address("师傅", RelationKind::MasterDisciple),
                address("师尊", RelationKind::MasterDisciple),
                address("夫君", RelationKind::Lover),
                address("娘子", RelationKind::Lover),
                address("相公", RelationKind::Lover),
                address("贤弟", RelationKind::Friend),
                address("兄台", RelationKind::Friend),
                address("大人", RelationKind::Colleague),
            ],
            event_verbs: vec![
                verb("相见", EventKind::Meeting, 0.5),
                verb("见", EventKind::Meeting, 0.4),
                verb("遇", EventKind::Meeting, 0.5),
                verb("拜访", EventKind::Meeting, 0.5),
                verb("大战", EventKind::Conflict, 0.9),
                verb("战", EventKind::Conflict, 0.8),
                verb("斗", EventKind::Conflict, 0.8),
                verb("杀", EventKind::Conflict, 0.9),
                verb("袭", EventKind::Conflict, 0.7),
                verb("救", EventKind::Cooperation, 0.7),
                verb("助", EventKind::Cooperation, 0.6),
                verb("联手", EventKind::Cooperation, 0.7),
                verb("结盟", EventKind::Cooperation, 0.7),
                verb("定", EventKind::Cooperation, 0.5),
                verb("成亲", EventKind::Cooperation, 0.8),
                verb("拜师", EventKind::Cooperation, 0.7),
                verb("逃", EventKind::Parting, 0.6),
                verb("离开", EventKind::Parting, 0.5),
                verb("别", EventKind::Parting, 0.4),
                verb("归", EventKind::Parting, 0.4),
                verb("受伤", EventKind::Other, 0.5),
                verb("中毒", EventKind::Other, 0.5),
                verb("发现", EventKind::Discovery, 0.6),
                verb("得知", EventKind::Discovery, 0.5),
                verb("找到", EventKind::Discovery, 0.5),
            ],
            turning_cues: vec![
                "突然".into(),
                "忽然".into(),
                "自此".into(),
                "从此".into(),
                "此时".into(),
                "不料".into(),
                "谁知".into(),
            ],
            consequence_cues: vec![
                "于是".into(),
                "因此".into(),
                "导致".into(),
                "结果".into(),
                "从而".into(),
            ],
            positive_words: set(&[
                "开心", "高兴", "欢喜", "喜悦", "大喜", "笑", "欣慰", "美好", "痊愈", "康复",
                "胜", "成功", "平安", "团聚", "满意", "安心", "欢声", "幸福", "喜讯",
            ]),
            negative_words: set(&[
                "伤心", "悲", "痛", "怒", "哭", "死", "败", "受伤", "重伤", "惨", "绝望",
                "恐惧", "害怕", "失望", "愤怒", "病", "中毒", "灾", "祸", "血", "泪",
            ]),
            emotion_words: emotion_map(),
            state_keywords: vec![
                state("受伤", StateAxis::Health, -0.2),
                state("重伤", StateAxis::Health, -0.35),
                state("中毒", StateAxis::Health, -0.25),
                state("病", StateAxis::Health, -0.15),
                state("痊愈", StateAxis::Health, 0.2),
                state("康复", StateAxis::Health, 0.2),
                state("疗伤", StateAxis::Health, 0.1),
                state("开心", StateAxis::Mood, 0.15),
                state("大喜", StateAxis::Mood, 0.2),
                state("欣慰", StateAxis::Mood, 0.1),
                state("伤心", StateAxis::Mood, -0.15),
                state("大怒", StateAxis::Mood, -0.1),
                state("绝望", StateAxis::Mood, -0.3),
                state("突破", StateAxis::Ability, 0.25),
                state("修为大进", StateAxis::Ability, 0.2),
                state("学会", StateAxis::Ability, 0.1),
                state("悟", StateAxis::Ability, 0.1),
                state("走火入魔", StateAxis::Ability, -0.25),
                state("武功尽废", StateAxis::Ability, -0.4),
                state("称帝", StateAxis::SocialStanding, 0.4),
                state("封", StateAxis::SocialStanding, 0.2),
                state("晋升", StateAxis::SocialStanding, 0.15),
                state("名动", StateAxis::SocialStanding, 0.15),
                state("贬", StateAxis::SocialStanding, -0.2),
                state("流放", StateAxis::SocialStanding, -0.25),
            ],
        }
    }

    /// Overlay user-supplied lexicon files on the builtin defaults.
    ///
    /// Recognized files (one entry per line, `#` comments): `stopwords.txt`,
    /// `positive.txt`, `negative.txt`, `surnames.txt`. The directory itself
    /// must exist; individual files are optional.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AnalysisError::LexiconMissing(format!(
                "lexicon directory not found: {}",
                dir.display()
            )));
        }
        let mut lex = Self::builtin();
        if let Some(words) = read_word_file(dir, "stopwords.txt")? {
            lex.stop_words.extend(words);
        }
        if let Some(words) = read_word_file(dir, "positive.txt")? {
            lex.positive_words.extend(words);
        }
        if let Some(words) = read_word_file(dir, "negative.txt")? {
            lex.negative_words.extend(words);
        }
        if let Some(words) = read_word_file(dir, "surnames.txt")? {
            lex.surnames.extend(words);
        }
        Ok(lex)
    }

    /// Sentence-level sentiment in [-1, 1]: lexicon hit balance.
    pub fn sentiment_of(&self, sentence: &str) -> f64 {
        let pos = self
            .positive_words
            .iter()
            .filter(|w| sentence.contains(w.as_str()))
            .count() as f64;
        let neg = self
            .negative_words
            .iter()
            .filter(|w| sentence.contains(w.as_str()))
            .count() as f64;
        if pos + neg == 0.0 {
            0.0
        } else {
            ((pos - neg) / (pos + neg)).clamp(-1.0, 1.0)
        }
    }

    /// Six-way emotion hit counts for a sentence, indexed per
    /// [`crate::model::EMOTION_CATEGORIES`].
    pub fn emotion_hits(&self, sentence: &str) -> [f64; 6] {
        let mut hits = [0.0; 6];
        for (word, category) in &self.emotion_words {
            if sentence.contains(word.as_str()) {
                hits[category.index()] += 1.0;
            }
        }
        hits
    }

    /// Location kind from the trailing suffix character(s), if known.
    pub fn classify_place(&self, name: &str) -> Option<LocationKind> {
        let chars: Vec<char> = name.chars().collect();
        if chars.is_empty() {
            return None;
        }
        let last: String = chars[chars.len() - 1..].iter().collect();
        self.place_suffixes.get(&last).copied()
    }

    /// Extract the first time marker in a sentence, if any.
    ///
    /// Relative markers win over absolute ones when both occur, since a
    /// relative phrase usually restates the narrative clock.
    pub fn time_marker_of(&self, sentence: &str) -> Option<crate::model::TimeMarker> {
        if let Some(m) = RELATIVE_TIME.find(sentence) {
            return Some(crate::model::TimeMarker::Relative(m.as_str().to_string()));
        }
        ABSOLUTE_TIME
            .find(sentence)
            .map(|m| crate::model::TimeMarker::Absolute(m.as_str().to_string()))
    }
}

fn set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn pattern(
    infix: &str,
    suffix: &str,
    kind: RelationKind,
    weight: f64,
    directed: bool,
) -> RelationPattern {
    RelationPattern {
        infix: infix.to_string(),
        suffix: suffix.to_string(),
        kind,
        weight,
        directed,
    }
}

fn address(term: &str, kind: RelationKind) -> AddressTerm {
    AddressTerm {
        term: term.to_string(),
        kind,
    }
}

fn verb(v: &str, kind: EventKind, weight: f64) -> EventVerb {
    EventVerb {
        verb: v.to_string(),
        kind,
        weight,
    }
}

fn state(keyword: &str, axis: StateAxis, delta: f64) -> StateKeyword {
    StateKeyword {
        keyword: keyword.to_string(),
        axis,
        delta,
    }
}

fn place_suffix_map() -> HashMap<String, LocationKind> {
    let mut map = HashMap::new();
    for s in ["省", "州", "郡", "域", "界", "国"] {
        map.insert(s.to_string(), LocationKind::Region);
    }
    for s in ["市", "城", "县", "镇", "村", "庄", "街", "巷"] {
        map.insert(s.to_string(), LocationKind::City);
    }
    for s in ["山", "峰", "岭", "崖", "谷", "洞"] {
        map.insert(s.to_string(), LocationKind::Mountain);
    }
    for s in ["府", "宫", "殿", "寺", "楼", "阁", "院", "塔", "桥", "门", "关"] {
        map.insert(s.to_string(), LocationKind::Building);
    }
    for s in ["房", "厅", "堂", "室", "斋"] {
        map.insert(s.to_string(), LocationKind::Room);
    }
    map
}

fn emotion_map() -> HashMap<String, EmotionCategory> {
    let mut map = HashMap::new();
    for w in ["喜", "乐", "笑", "开心", "高兴", "欢", "悦"] {
        map.insert(w.to_string(), EmotionCategory::Joy);
    }
    for w in ["悲", "哀", "哭", "伤心", "泪", "愁"] {
        map.insert(w.to_string(), EmotionCategory::Sadness);
    }
    for w in ["怒", "愤", "恼", "恨"] {
        map.insert(w.to_string(), EmotionCategory::Anger);
    }
    for w in ["惧", "怕", "恐", "慌"] {
        map.insert(w.to_string(), EmotionCategory::Fear);
    }
    for w in ["惊", "讶", "愕", "意外"] {
        map.insert(w.to_string(), EmotionCategory::Surprise);
    }
    for w in ["厌", "恶", "嫌", "鄙"] {
        map.insert(w.to_string(), EmotionCategory::Disgust);
    }
    map
}

fn read_word_file(dir: &Path, name: &str) -> Result<Option<Vec<String>>, AnalysisError> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| {
        AnalysisError::LexiconMissing(format!("unreadable lexicon {}: {e}", path.display()))
    })?;
    Ok(Some(
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_core_vocabularies() {
        let lex = Lexicons::builtin();
        assert!(lex.stop_words.contains("的"));
        assert!(lex.surnames.contains("林"));
        assert!(lex.surnames.contains("欧阳"));
        assert!(!lex.event_verbs.is_empty());
        assert!(!lex.state_keywords.is_empty());
    }

    #[test]
    fn sentiment_balances_hits() {
        let lex = Lexicons::builtin();
        assert!(lex.sentiment_of("众人大喜，欢声笑语。") > 0.0);
        assert!(lex.sentiment_of("他受伤落败，伤心欲绝。") < 0.0);
        assert_eq!(lex.sentiment_of("他走在路上。"), 0.0);
    }

    #[test]
    fn classify_place_by_suffix() {
        let lex = Lexicons::builtin();
        assert_eq!(lex.classify_place("青云山"), Some(LocationKind::Mountain));
        assert_eq!(lex.classify_place("临安城"), Some(LocationKind::City));
        assert_eq!(lex.classify_place("藏经阁"), Some(LocationKind::Building));
        assert_eq!(lex.classify_place("张三"), None);
    }

    #[test]
    fn time_markers_extracted() {
        let lex = Lexicons::builtin();
        assert!(matches!(
            lex.time_marker_of("三日后，他再度启程。"),
            Some(crate::model::TimeMarker::Relative(_))
        ));
        assert!(matches!(
            lex.time_marker_of("三月初三，庙会大开。"),
            Some(crate::model::TimeMarker::Absolute(_))
        ));
        assert!(lex.time_marker_of("他抬头看天。").is_none());
    }

    #[test]
    fn from_dir_missing_directory_fails() {
        let err = Lexicons::from_dir("/nonexistent/lexicons").unwrap_err();
        assert!(matches!(err, AnalysisError::LexiconMissing(_)));
    }

    #[test]
    fn from_dir_overlays_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("stopwords.txt"), "froob\n# comment\n").unwrap();
        let lex = Lexicons::from_dir(dir.path()).unwrap();
        assert!(lex.stop_words.contains("froob"));
        assert!(lex.stop_words.contains("的"));
    }
}
