//! 后端评分记录组装

use crate::models::{
    CriterionComment, EssayRecord, ResultRecord, Rubric, TableTaskRecord, TaskType,
};
use crate::services::feedback::GradeReport;
use crate::services::task_parser::{parse_email_task, parse_survey_task};

/// 为 37 / 38 题组装后端记录；其他任务返回 None
///
/// # 参数
/// - `task`: 任务类型
/// - `rubric`: 使用的细则（提供标准键）
/// - `description`: 任务描述
/// - `essay`: 学生提交的完整原文（未截断）
/// - `report`: 评分报告
/// - `table_image`: 38 题的图表 data URL
pub fn build_result_record(
    task: &TaskType,
    rubric: &Rubric,
    description: &str,
    essay: &str,
    report: &GradeReport,
    table_image: Option<&str>,
) -> Option<ResultRecord> {
    let comments: Vec<CriterionComment> = rubric
        .criteria
        .iter()
        .zip(&report.responses)
        .map(|(c, text)| CriterionComment::new(c.key.clone(), text))
        .collect();
    let score = |i: usize| report.scores.get(i).copied().unwrap_or_default();

    match task {
        TaskType::Email => {
            let info = parse_email_task(description);
            Some(ResultRecord::Essay(EssayRecord {
                comments,
                email: info.email,
                essay: essay.to_string(),
                k1: score(0),
                k2: score(1),
                k3: score(2),
                questions_theme: info.questions_theme,
                subject: info.subject,
            }))
        }
        TaskType::TableEssay => {
            let info = parse_survey_task(description);
            Some(ResultRecord::TableTask(TableTaskRecord {
                comments,
                essay: essay.to_string(),
                k1: score(0),
                k2: score(1),
                k3: score(2),
                k4: score(3),
                k5: score(4),
                opinion: info.opinion,
                problem: info.problem,
                table_image: table_image.unwrap_or_default().to_string(),
            }))
        }
        TaskType::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvaluationResult, RubricSet};

    fn report(scores: &[u32], rubric: &Rubric) -> GradeReport {
        let mut result = EvaluationResult::default();
        for s in scores {
            result.push(*s, format!(" comment {} ", s));
        }
        GradeReport::compose(rubric, result, None)
    }

    #[test]
    fn test_email_record() {
        let set = RubricSet::builtin().unwrap();
        let rubric = set.rubric_for(&TaskType::Email);
        let report = report(&[2, 1, 0], rubric);

        let record = build_result_record(
            &TaskType::Email,
            rubric,
            "Subject: Pets\n\nDo you have a pet?\n\nWrite an email to Tom.\nask 3 questions about his dog.",
            "FULL ESSAY",
            &report,
            None,
        )
        .unwrap();

        match &record {
            ResultRecord::Essay(r) => {
                assert_eq!((r.k1, r.k2, r.k3), (2, 1, 0));
                assert_eq!(r.subject, "Pets");
                assert_eq!(r.email, "Do you have a pet?");
                assert_eq!(r.questions_theme, "his dog");
                assert_eq!(r.comments[1].criterion, "k2");
                assert_eq!(r.comments[1].text, "comment 1");
            }
            other => panic!("unexpected record: {:?}", other),
        }
        assert_eq!(record.essay(), "FULL ESSAY");
    }

    #[test]
    fn test_table_record_and_generic() {
        let set = RubricSet::builtin().unwrap();
        let rubric = set.rubric_for(&TaskType::TableEssay);
        let table_report = report(&[3, 3, 2, 2, 1], rubric);

        let record = build_result_record(
            &TaskType::TableEssay,
            rubric,
            "",
            "E",
            &table_report,
            Some("data:image/jpeg;base64,AA=="),
        )
        .unwrap();
        assert_eq!(record.endpoint(), "/tabletasks");
        match record {
            ResultRecord::TableTask(r) => {
                assert_eq!(r.k5, 1);
                assert_eq!(r.comments.len(), 5);
                assert_eq!(r.table_image, "data:image/jpeg;base64,AA==");
            }
            other => panic!("unexpected record: {:?}", other),
        }

        let other = TaskType::Other("5".to_string());
        let generic = set.rubric_for(&other);
        let generic_report = report(&[7], generic);
        assert!(build_result_record(&other, generic, "", "E", &generic_report, None).is_none());
    }
}
