//! 任务描述解析
//!
//! 从 37 / 38 题的任务描述中提取后端记录所需的元数据。
//! 解析失败时对应字段留空，不会报错。

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{EmailTaskInfo, SurveyTaskInfo};

static SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Subject:\s*([^\n]+)").expect("subject regex is valid"));
static EMAIL_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Subject:[^\n]*\n\n(.*?)\n\nWrite an email").expect("email regex is valid")
});
static EMAIL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Subject:[^\n]*\n(.*?)\nWrite an email").expect("email regex is valid")
});
static QUESTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ask\s+3\s+questions\s+about\s+([^\n.!?]*)").expect("questions regex is valid")
});
static OPINION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Comment on the survey data and give your opinion on\s+([^\n.]+)")
        .expect("opinion regex is valid")
});
static PROBLEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)outline a problem that can arise with\s+([^\n.]+)")
        .expect("problem regex is valid")
});

/// 解析 37 题描述：主题、来信正文、提问主题
pub fn parse_email_task(description: &str) -> EmailTaskInfo {
    let capture = |re: &Regex| {
        re.captures(description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };

    EmailTaskInfo {
        subject: capture(&SUBJECT_RE).unwrap_or_default(),
        email: capture(&EMAIL_BLOCK_RE)
            .or_else(|| capture(&EMAIL_LINE_RE))
            .unwrap_or_default(),
        questions_theme: capture(&QUESTIONS_RE).unwrap_or_default(),
    }
}

/// 解析 38 题描述：观点主题、问题主题
pub fn parse_survey_task(description: &str) -> SurveyTaskInfo {
    let capture = |re: &Regex| {
        re.captures(description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };

    let problem = capture(&PROBLEM_RE)
        .map(|p| match p.split_once(" and ") {
            Some((head, _)) => head.trim().to_string(),
            None => p,
        })
        .unwrap_or_default();

    SurveyTaskInfo {
        opinion: capture(&OPINION_RE).unwrap_or_default(),
        problem,
    }
}
