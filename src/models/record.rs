//! 后端评分记录模型
//!
//! 字段名与后端 `/essays`、`/tabletasks` 接口保持一致

use serde::{Deserialize, Serialize};

/// 单条评分标准的评语
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionComment {
    /// 标准键（k1、k2…）
    pub criterion: String,
    pub start_pos: u32,
    pub end_pos: u32,
    pub text: String,
}

impl CriterionComment {
    pub fn new(criterion: impl Into<String>, text: &str) -> Self {
        Self {
            criterion: criterion.into(),
            start_pos: 0,
            end_pos: 0,
            text: text.trim().to_string(),
        }
    }
}

/// 37 题描述中提取的元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailTaskInfo {
    pub email: String,
    pub subject: String,
    pub questions_theme: String,
}

/// 38 题描述中提取的元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyTaskInfo {
    pub opinion: String,
    pub problem: String,
}

/// 37 题评分记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayRecord {
    pub comments: Vec<CriterionComment>,
    pub email: String,
    /// 学生提交的完整原文（未截断）
    pub essay: String,
    pub k1: u32,
    pub k2: u32,
    pub k3: u32,
    pub questions_theme: String,
    pub subject: String,
}

/// 38 题评分记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTaskRecord {
    pub comments: Vec<CriterionComment>,
    pub essay: String,
    pub k1: u32,
    pub k2: u32,
    pub k3: u32,
    pub k4: u32,
    pub k5: u32,
    pub opinion: String,
    pub problem: String,
    /// data URL 形式的图表图片
    pub table_image: String,
}

/// 发送给后端的评分记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Essay(EssayRecord),
    TableTask(TableTaskRecord),
}

impl ResultRecord {
    /// 记录对应的后端路径
    pub fn endpoint(&self) -> &'static str {
        match self {
            ResultRecord::Essay(_) => "/essays",
            ResultRecord::TableTask(_) => "/tabletasks",
        }
    }

    pub fn essay(&self) -> &str {
        match self {
            ResultRecord::Essay(r) => &r.essay,
            ResultRecord::TableTask(r) => &r.essay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_essay_record_serializes_flat() {
        let record = ResultRecord::Essay(EssayRecord {
            comments: vec![CriterionComment::new("k1", "  ok \n")],
            email: "e".to_string(),
            essay: "text".to_string(),
            k1: 2,
            k2: 1,
            k3: 0,
            questions_theme: "q".to_string(),
            subject: "s".to_string(),
        });

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["k1"], 2);
        assert_eq!(value["comments"][0]["criterion"], "k1");
        assert_eq!(value["comments"][0]["text"], "ok");
        assert_eq!(value["comments"][0]["start_pos"], 0);
        assert_eq!(record.endpoint(), "/essays");
    }
}
