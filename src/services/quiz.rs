//! 自动出题
//! 从页面内容中抽取句子、挖空关键词，生成四选一选择题

use crate::models::QuizQuestion;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::{NoExpand, RegexBuilder};

/// 一次测验的默认题量
pub const DEFAULT_QUESTION_COUNT: usize = 5;

/// 挖空占位符
pub const BLANK: &str = "_____";

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];
const MIN_SENTENCE_CHARS: usize = 20;
const MAX_SENTENCE_CHARS: usize = 200;
const CANDIDATE_WINDOW: usize = 5;
const MIN_KEYWORD_CHARS: usize = 5;
const MIN_DISTRACTOR_CHARS: usize = 3;
const DISTRACTOR_COUNT: usize = 3;

/// 干扰项不足时按顺序补充
pub const FILLER_WORDS: [&str; 6] = [
    "information",
    "development",
    "understanding",
    "knowledge",
    "learning",
    "education",
];

/// 无法出题时的固定题目
pub fn fallback_question() -> QuizQuestion {
    QuizQuestion {
        question: "What is the main topic discussed in this section?".to_string(),
        options: vec![
            "Alternative Learning System".to_string(),
            "Traditional Education".to_string(),
            "Online Gaming".to_string(),
            "Sports Training".to_string(),
        ],
        correct_answer: 0,
    }
}

/// 出题器
#[derive(Debug, Clone)]
pub struct QuizSynthesizer {
    question_count: usize,
}

impl QuizSynthesizer {
    pub fn new(question_count: usize) -> Self {
        Self { question_count }
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn generate<C, R>(&self, pages: &[C], rng: &mut R) -> Vec<QuizQuestion>
    where
        C: AsRef<str>,
        R: Rng + ?Sized,
    {
        generate_set(pages, self.question_count, rng)
    }
}

impl Default for QuizSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTION_COUNT)
    }
}

/// 根据一段内容生成一道题
pub fn generate_one<R: Rng + ?Sized>(content: &str, rng: &mut R) -> QuizQuestion {
    let sentences: Vec<&str> = content
        .split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| {
            let len = s.chars().count();
            len > MIN_SENTENCE_CHARS && len < MAX_SENTENCE_CHARS
        })
        .collect();

    if sentences.is_empty() {
        log::debug!("no usable sentence, using fallback question");
        return fallback_question();
    }

    // 偏向前面的内容
    let window = sentences.len().min(CANDIDATE_WINDOW);
    let sentence = sentences[rng.random_range(0..window)];

    let words: Vec<&str> = sentence
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_CHARS)
        .collect();

    let keyable: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| !strip_non_alpha(w).is_empty())
        .map(|(i, _)| i)
        .collect();

    if keyable.is_empty() {
        log::debug!("no key word in {:?}, using fallback question", sentence);
        return fallback_question();
    }

    let key_index = keyable[rng.random_range(0..keyable.len())];
    let answer = strip_non_alpha(words[key_index]);

    let question = format!(
        "According to the text, complete the following: \"{}\"",
        blank_out(sentence, &answer)
    );

    let candidates: Vec<String> = words
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_index)
        .map(|(_, w)| strip_non_alpha(w))
        .filter(|w| w.len() > MIN_DISTRACTOR_CHARS)
        .collect();

    let mut options = Vec::with_capacity(DISTRACTOR_COUNT + 1);
    options.push(answer.clone());
    options.extend(pick_distractors(&answer, &candidates));
    options.shuffle(rng);

    let correct_answer = options.iter().position(|o| *o == answer).unwrap_or(0);

    QuizQuestion {
        question,
        options,
        correct_answer,
    }
}

/// 从多页内容生成固定数量的题目
///
/// 先按页序每页尝试一次，不足时随机抽页补齐，最后整体打乱。
/// 允许出现重复题目。
pub fn generate_set<C, R>(pages: &[C], target_count: usize, rng: &mut R) -> Vec<QuizQuestion>
where
    C: AsRef<str>,
    R: Rng + ?Sized,
{
    if pages.is_empty() || target_count == 0 {
        return Vec::new();
    }

    let mut questions: Vec<QuizQuestion> = pages
        .iter()
        .take(target_count)
        .map(|page| generate_one(page.as_ref(), &mut *rng))
        .collect();

    while questions.len() < target_count {
        let page = &pages[rng.random_range(0..pages.len())];
        questions.push(generate_one(page.as_ref(), rng));
    }

    questions.shuffle(rng);
    questions.truncate(target_count);

    log::debug!(
        "generated {} question(s) from {} page(s)",
        questions.len(),
        pages.len()
    );
    questions
}

fn strip_non_alpha(word: &str) -> String {
    word.chars().filter(char::is_ascii_alphabetic).collect()
}

/// 将句中第一个整词匹配（忽略大小写）替换为占位符
fn blank_out(sentence: &str, term: &str) -> String {
    let pattern = format!(r"\b{}\b", regex::escape(term));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace(sentence, NoExpand(BLANK)).into_owned(),
        Err(e) => {
            log::warn!("cannot blank {:?}: {}", term, e);
            sentence.to_string()
        }
    }
}

fn pick_distractors(answer: &str, candidates: &[String]) -> Vec<String> {
    fn taken(answer: &str, picked: &[String], word: &str) -> bool {
        word.eq_ignore_ascii_case(answer) || picked.iter().any(|p| p.eq_ignore_ascii_case(word))
    }

    let mut picked: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);

    for word in candidates {
        if picked.len() >= DISTRACTOR_COUNT {
            break;
        }
        if !taken(answer, &picked, word) {
            picked.push(word.clone());
        }
    }

    for filler in FILLER_WORDS {
        if picked.len() >= DISTRACTOR_COUNT {
            break;
        }
        if !taken(answer, &picked, filler) {
            picked.push(filler.to_string());
        }
    }

    picked
}
