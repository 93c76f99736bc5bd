//! 评分细则模型
//!
//! 细则由 `rubrics.toml` 描述：每个任务一组有序的评分标准，
//! 每条标准绑定一个提示词模板和一组按优先级排列的提分正则。

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::RubricError;
use crate::models::task::TaskType;

/// 通用细则的键
pub const GENERIC_RUBRIC_KEY: &str = "generic";

/// 未匹配到分数时的默认分
pub const DEFAULT_SCORE: u32 = 1;

// ========== TOML 原始结构 ==========

#[derive(Debug, Clone, Deserialize)]
pub struct RubricFile {
    /// 模型输出中"最终结论"段落的标题
    pub verdict_marker: String,
    #[serde(rename = "rubric")]
    pub rubrics: Vec<RubricDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RubricDef {
    pub task: String,
    pub title: String,
    pub min_words: Option<usize>,
    pub max_words: Option<usize>,
    #[serde(default)]
    pub requires_image: bool,
    /// 是否输出逐项分数表
    #[serde(default = "default_true")]
    pub breakdown: bool,
    pub criteria: Vec<CriterionDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriterionDef {
    /// 后端使用的标准键（k1、k2…）
    pub key: String,
    pub label: String,
    pub heading: String,
    pub template: String,
    pub max_score: u32,
    #[serde(default = "default_score")]
    pub default_score: u32,
    #[serde(default)]
    pub verdict_patterns: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_score() -> u32 {
    DEFAULT_SCORE
}

// ========== 编译后的细则 ==========

/// 字数限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLimits {
    pub min_words: usize,
    pub max_words: usize,
}

/// 单条评分标准
#[derive(Debug, Clone)]
pub struct Criterion {
    /// 在细则中的位置（从 0 开始）
    pub index: usize,
    pub key: String,
    pub label: String,
    pub heading: String,
    /// 模板文件名
    pub template: String,
    pub max_score: u32,
    pub default_score: u32,
    /// 第一阶段：在结论段落内搜索
    pub verdict_rules: Vec<Regex>,
    /// 第二阶段：全文搜索，按顺序优先
    pub rules: Vec<Regex>,
    /// 所有标准权重都为 1
    pub weight: u32,
}

/// 某一任务的完整细则
#[derive(Debug, Clone)]
pub struct Rubric {
    pub task: String,
    pub title: String,
    pub word_limits: Option<WordLimits>,
    pub requires_image: bool,
    pub breakdown: bool,
    pub verdict_marker: String,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn is_generic(&self) -> bool {
        self.task == GENERIC_RUBRIC_KEY
    }

    fn compile(def: RubricDef, verdict_marker: &str) -> Result<Self, RubricError> {
        if def.criteria.is_empty() {
            return Err(RubricError::EmptyRubric { task: def.task });
        }

        let word_limits = match (def.min_words, def.max_words) {
            (None, None) => None,
            (min, max) => Some(WordLimits {
                min_words: min.unwrap_or(0),
                max_words: max.unwrap_or(usize::MAX),
            }),
        };

        let criteria = def
            .criteria
            .into_iter()
            .enumerate()
            .map(|(index, c)| {
                let verdict_rules = compile_patterns(&c.key, &c.verdict_patterns)?;
                let rules = compile_patterns(&c.key, &c.patterns)?;
                Ok::<_, RubricError>(Criterion {
                    index,
                    default_score: c.default_score.min(c.max_score),
                    key: c.key,
                    label: c.label,
                    heading: c.heading,
                    template: c.template,
                    max_score: c.max_score,
                    verdict_rules,
                    rules,
                    weight: 1,
                })
            })
            .collect::<Result<Vec<_>, RubricError>>()?;

        Ok(Self {
            task: def.task,
            title: def.title,
            word_limits,
            requires_image: def.requires_image,
            breakdown: def.breakdown,
            verdict_marker: verdict_marker.to_string(),
            criteria,
        })
    }
}

fn compile_patterns(criterion: &str, patterns: &[String]) -> Result<Vec<Regex>, RubricError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| RubricError::InvalidPattern {
                criterion: criterion.to_string(),
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// 全部细则
#[derive(Debug, Clone)]
pub struct RubricSet {
    rubrics: HashMap<String, Rubric>,
    generic: Rubric,
}

impl RubricSet {
    /// 内置细则（与仓库根目录的 rubrics.toml 相同）
    pub fn builtin() -> Result<Self, RubricError> {
        Self::from_toml_str(include_str!("../../rubrics.toml"), "rubrics.toml")
    }

    /// 从 TOML 文本构建
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, RubricError> {
        let file: RubricFile =
            toml::from_str(content).map_err(|source| RubricError::TomlParseFailed {
                path: origin.to_string(),
                source,
            })?;
        Self::from_file(file)
    }

    pub fn from_file(file: RubricFile) -> Result<Self, RubricError> {
        let mut rubrics = HashMap::new();
        let mut generic = None;

        for def in file.rubrics {
            let rubric = Rubric::compile(def, &file.verdict_marker)?;
            if rubric.is_generic() {
                generic = Some(rubric);
            } else {
                rubrics.insert(rubric.task.clone(), rubric);
            }
        }

        let generic = generic.ok_or(RubricError::MissingGeneric)?;
        Ok(Self { rubrics, generic })
    }

    /// 查找任务的细则；未知任务使用通用细则
    pub fn rubric_for(&self, task: &TaskType) -> &Rubric {
        self.rubrics.get(task.code()).unwrap_or(&self.generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rubrics_shape() {
        let set = RubricSet::builtin().unwrap();

        let r37 = set.rubric_for(&TaskType::Email);
        assert_eq!(r37.len(), 3);
        assert_eq!(
            r37.word_limits,
            Some(WordLimits {
                min_words: 90,
                max_words: 154
            })
        );
        assert!(!r37.requires_image);

        let r38 = set.rubric_for(&TaskType::TableEssay);
        assert_eq!(r38.len(), 5);
        assert!(r38.requires_image);
        assert_eq!(r38.criteria.iter().map(|c| c.max_score).sum::<u32>(), 14);

        let generic = set.rubric_for(&TaskType::Other("39".to_string()));
        assert!(generic.is_generic());
        assert_eq!(generic.len(), 1);
        assert_eq!(generic.criteria[0].max_score, 10);
        assert!(generic.word_limits.is_none());
    }

    #[test]
    fn test_criteria_indices_are_ordered() {
        let set = RubricSet::builtin().unwrap();
        let r38 = set.rubric_for(&TaskType::TableEssay);
        for (i, c) in r38.criteria.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.key, format!("k{}", i + 1));
            assert_eq!(c.weight, 1);
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let toml = r#"
verdict_marker = "ИТОГОВАЯ ОЦЕНКА"

[[rubric]]
task = "generic"
title = "g"

[[rubric.criteria]]
key = "score"
label = "l"
heading = "h"
template = "generic.txt"
max_score = 10
patterns = ['(\d+']
"#;
        let err = RubricSet::from_toml_str(toml, "inline").unwrap_err();
        assert!(matches!(err, RubricError::InvalidPattern { .. }));
    }

    #[test]
    fn test_missing_generic_is_rejected() {
        let toml = r#"
verdict_marker = "ИТОГОВАЯ ОЦЕНКА"

[[rubric]]
task = "37"
title = "t"

[[rubric.criteria]]
key = "k1"
label = "l"
heading = "h"
template = "p.txt"
max_score = 2
"#;
        let err = RubricSet::from_toml_str(toml, "inline").unwrap_err();
        assert!(matches!(err, RubricError::MissingGeneric));
    }
}
