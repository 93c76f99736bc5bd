//! 分数汇总 - 业务能力层

/// 汇总各标准分数
///
/// 第一条标准（交际任务）为 0 时整份作业记 0 分，否则求和
pub fn aggregate(scores: &[u32]) -> u32 {
    match scores.first() {
        None | Some(0) => 0,
        Some(_) => scores.iter().sum(),
    }
}

/// 是否触发第一条标准的一票否决
pub fn is_vetoed(scores: &[u32]) -> bool {
    scores.first() == Some(&0)
}
