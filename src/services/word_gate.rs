//! 字数门槛 - 业务能力层
//!
//! 统计单词数并应用最少/最多字数策略：
//! 少于下限直接判 0 分，超过上限在词边界处截断

use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word regex is valid"));

/// 截断后的文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedText {
    /// 送入评估的文本
    pub text: String,
    /// 截断后的单词数
    pub word_count: usize,
    /// 原始单词数
    pub original_word_count: usize,
    /// 截断提示（未截断时为 None）
    pub notice: Option<String>,
}

/// 字数策略的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPolicyOutcome {
    /// 字数不足，0 分，不调用模型
    TooShort { word_count: usize, min_words: usize },
    Accepted(GatedText),
}

/// 统计单词数（Unicode 字母数字串）
pub fn count_words(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// 应用字数策略
///
/// # 参数
/// - `text`: 学生提交的原文
/// - `min_words`: 最少单词数
/// - `max_words`: 最多单词数
///
/// # 返回
/// 字数不足时返回 `TooShort`；否则返回（可能已截断的）文本
pub fn apply_word_policy(text: &str, min_words: usize, max_words: usize) -> WordPolicyOutcome {
    let word_count = count_words(text);

    if word_count < min_words {
        return WordPolicyOutcome::TooShort {
            word_count,
            min_words,
        };
    }

    if word_count <= max_words {
        return WordPolicyOutcome::Accepted(GatedText {
            text: text.to_string(),
            word_count,
            original_word_count: word_count,
            notice: None,
        });
    }

    let truncated = truncate_to_words(text, max_words);
    WordPolicyOutcome::Accepted(GatedText {
        word_count: count_words(&truncated),
        text: truncated,
        original_word_count: word_count,
        notice: Some(truncation_notice(max_words, word_count)),
    })
}

/// 保留前 `max_words` 个单词，保持原有的空白与标点
fn truncate_to_words(text: &str, max_words: usize) -> String {
    if max_words == 0 {
        return String::new();
    }
    match WORD_RE.find_iter(text).nth(max_words - 1) {
        Some(last) => text[..last.end()].to_string(),
        None => WORD_RE
            .find_iter(text)
            .take(max_words)
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// 字数不足时返回给用户的说明
pub fn rejection_message(word_count: usize, min_words: usize) -> String {
    format!(
        "Количество слов в тексте ({}) меньше минимального требуемого ({}).\n\n\
         В соответствии с критериями оценивания за такую работу выставляется 0 баллов.",
        word_count, min_words
    )
}

fn truncation_notice(max_words: usize, original: usize) -> String {
    format!(
        "⚠️ Ваш текст был обрезан до {} слов для проверки (исходное количество слов: {}).\n\n",
        max_words, original
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_count_words_unicode() {
        assert_eq!(count_words("Hello, world! Привет мир."), 4);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words("don't"), 2);
    }

    #[test]
    fn test_below_minimum_is_rejected() {
        let outcome = apply_word_policy(&words(50), 90, 154);
        assert_eq!(
            outcome,
            WordPolicyOutcome::TooShort {
                word_count: 50,
                min_words: 90
            }
        );

        let msg = rejection_message(50, 90);
        assert!(msg.contains("(50)"));
        assert!(msg.contains("(90)"));
        assert!(msg.contains("0 баллов"));
    }

    #[test]
    fn test_within_limits_is_unchanged() {
        let text = words(100);
        match apply_word_policy(&text, 90, 154) {
            WordPolicyOutcome::Accepted(gated) => {
                assert_eq!(gated.text, text);
                assert_eq!(gated.word_count, 100);
                assert!(gated.notice.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_truncation_keeps_exact_word_count() {
        let text = format!("{}.\n\nTail, part: {}", words(150), words(50));
        match apply_word_policy(&text, 90, 154) {
            WordPolicyOutcome::Accepted(gated) => {
                assert_eq!(gated.word_count, 154);
                assert_eq!(count_words(&gated.text), 154);
                assert_eq!(gated.original_word_count, 202);
                assert!(text.starts_with(&gated.text));
                let notice = gated.notice.unwrap();
                assert!(notice.contains("154"));
                assert!(notice.contains("202"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_truncation_preserves_punctuation_up_to_last_word() {
        let text = "One, two; three! four five";
        assert_eq!(truncate_to_words(text, 3), "One, two; three");
        assert_eq!(truncate_to_words(text, 0), "");
    }
}
