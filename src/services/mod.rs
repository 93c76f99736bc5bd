//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，只处理单份作答，不关心对话流程

pub mod aggregation;
pub mod evaluator;
pub mod feedback;
pub mod image_encoding;
pub mod pagination;
pub mod prompt_sequencer;
pub mod result_record;
pub mod score_extractor;
pub mod status;
pub mod task_parser;
pub mod templates;
pub mod word_gate;

pub use aggregation::aggregate;
pub use evaluator::{Evaluator, RetryPolicy, RetryingEvaluator};
pub use feedback::GradeReport;
pub use pagination::paginate;
pub use prompt_sequencer::PromptSequencer;
pub use status::{notify, NoopStatus, StatusSink};
pub use templates::{InMemoryTemplates, PromptDirectory, TemplateSource};
pub use word_gate::{apply_word_policy, WordPolicyOutcome};
