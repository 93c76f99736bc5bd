pub mod evaluation;
pub mod loaders;
pub mod quota;
pub mod record;
pub mod rubric;
pub mod task;

pub use evaluation::EvaluationResult;
pub use loaders::{load_rubric_file, load_rubrics};
pub use quota::{QuotaDecision, UserRef};
pub use record::{
    CriterionComment, EmailTaskInfo, EssayRecord, ResultRecord, SurveyTaskInfo, TableTaskRecord,
};
pub use rubric::{Criterion, Rubric, RubricSet, WordLimits};
pub use task::TaskType;
