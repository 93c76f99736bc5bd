//! 分数提取 - 业务能力层
//!
//! 从模型的自由文本中提取单条标准的分数。
//! 两阶段：先在结论段落中匹配，再对全文按顺序匹配。
//! 永不失败，匹配不到时返回默认分。

use tracing::{debug, warn};

use crate::models::rubric::{Criterion, Rubric};

/// 结论段落少于该字符数时，向后多取一个段落
const SHORT_VERDICT_CHARS: usize = 50;

impl Rubric {
    /// 提取第 `index` 条标准的分数
    ///
    /// 下标越界时返回默认分
    pub fn extract_score(&self, response: &str, index: usize) -> u32 {
        match self.criteria.get(index) {
            Some(criterion) => extract_score(response, criterion, &self.verdict_marker),
            None => {
                warn!("评分标准下标越界: {} (共 {} 条)", index, self.criteria.len());
                crate::models::rubric::DEFAULT_SCORE
            }
        }
    }
}

/// 提取分数并裁剪到 `[0, max_score]`
pub fn extract_score(response: &str, criterion: &Criterion, verdict_marker: &str) -> u32 {
    if let Some(section) = verdict_section(response, verdict_marker) {
        if let Some(score) = first_match(&criterion.verdict_rules, &section) {
            debug!("标准 {} 在结论段落中找到分数: {}", criterion.key, score);
            return score.min(criterion.max_score);
        }
    }

    if let Some(score) = first_match(&criterion.rules, response) {
        debug!("标准 {} 在全文中找到分数: {}", criterion.key, score);
        return score.min(criterion.max_score);
    }

    warn!(
        "⚠️ 未能提取标准 {} 的分数，使用默认值 {}",
        criterion.key, criterion.default_score
    );
    criterion.default_score
}

/// 截取结论标记之后的段落
fn verdict_section(response: &str, marker: &str) -> Option<String> {
    if marker.is_empty() {
        return None;
    }
    let (_, after) = response.split_once(marker)?;
    let after = after.trim_start();

    let mut parts = after.split("\n\n");
    let first = parts.next().unwrap_or_default();
    let mut section = first.to_string();
    if first.chars().count() < SHORT_VERDICT_CHARS {
        if let Some(next) = parts.next() {
            section.push_str("\n\n");
            section.push_str(next);
        }
    }
    Some(section)
}

/// 按顺序应用规则，返回第一个能解析出整数的捕获组
fn first_match(rules: &[regex::Regex], text: &str) -> Option<u32> {
    rules.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    })
}
