//! 评分结果模型

/// 一次细则评分的结果
///
/// `scores`、`responses` 与细则中的评分标准一一对应
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    pub scores: Vec<u32>,
    pub responses: Vec<String>,
}

impl EvaluationResult {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            scores: Vec::with_capacity(n),
            responses: Vec::with_capacity(n),
        }
    }

    /// 追加一条标准的评分结果
    pub fn push(&mut self, score: u32, response: String) {
        self.scores.push(score);
        self.responses.push(response);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
