use async_trait::async_trait;
use checkmate_bot::clients::{DisabledOcr, InMemoryQuota, LlmClient, ResultSink};
use checkmate_bot::config::Config;
use checkmate_bot::models::{ResultRecord, RubricSet, TaskType, UserRef};
use checkmate_bot::services::evaluator::{Evaluator, RetryPolicy, RetryingEvaluator};
use checkmate_bot::services::status::{NoopStatus, StatusSink};
use checkmate_bot::services::templates::{PromptDirectory, TemplateSource};
use checkmate_bot::services::PromptSequencer;
use checkmate_bot::workflow::{
    CheckCtx, Command, ConversationEngine, EngineSettings, GradingFlow, GradingOutcome,
    InMemorySessionStore, Submission,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const THREE_CRITERIA: &str = r#"
verdict_marker = "ИТОГОВАЯ ОЦЕНКА"

[[rubric]]
task = "37"
title = "Письмо"
min_words = 90
max_words = 154

[[rubric.criteria]]
key = "k1"
label = "Содержание"
heading = "КРИТЕРИЙ 1"
template = "c1.txt"
max_score = 5
verdict_patterns = ['Балл:?\s*(\d+)']

[[rubric.criteria]]
key = "k2"
label = "Организация"
heading = "КРИТЕРИЙ 2"
template = "c2.txt"
max_score = 5
verdict_patterns = ['Балл:?\s*(\d+)']

[[rubric.criteria]]
key = "k3"
label = "Язык"
heading = "КРИТЕРИЙ 3"
template = "c3.txt"
max_score = 5
verdict_patterns = ['Балл:?\s*(\d+)']

[[rubric]]
task = "generic"
title = "Общий"
breakdown = false

[[rubric.criteria]]
key = "score"
label = "Оценка"
heading = "РЕЗУЛЬТАТ"
template = "generic.txt"
max_score = 10
patterns = ['(?i)score:?\s*(\d+)']
"#;

/// 按顺序返回预设回答
struct ScriptedEvaluator {
    replies: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEvaluator {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies
            .lock()
            .await
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

struct RecordingSink(Mutex<Vec<ResultRecord>>);

#[async_trait]
impl ResultSink for RecordingSink {
    async fn deliver(&self, record: &ResultRecord) -> anyhow::Result<()> {
        self.0.lock().await.push(record.clone());
        Ok(())
    }
}

struct RecordingStatus(Mutex<Vec<String>>);

#[async_trait]
impl StatusSink for RecordingStatus {
    async fn update(&self, text: &str) -> anyhow::Result<()> {
        self.0.lock().await.push(text.to_string());
        Ok(())
    }
}

fn prompt_dir() -> Arc<PromptDirectory> {
    Arc::new(PromptDirectory::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/prompts"
    )))
}

fn three_criteria_templates() -> Arc<checkmate_bot::services::InMemoryTemplates> {
    Arc::new(
        checkmate_bot::services::InMemoryTemplates::new()
            .with("c1.txt", "C1 {{task_description}} :: {{solution}}")
            .with("c2.txt", "C2 {{task_description}} :: {{solution}}")
            .with("c3.txt", "C3 {{task_description}} :: {{solution}}")
            .with("generic.txt", "G {{task_number}} {{solution}}"),
    )
}

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

#[tokio::test]
async fn test_three_criteria_end_to_end() {
    let rubrics = Arc::new(RubricSet::from_toml_str(THREE_CRITERIA, "inline").unwrap());
    let evaluator = ScriptedEvaluator::new(&[
        "Разбор 1\n\nИТОГОВАЯ ОЦЕНКА\nБалл: 5",
        "Разбор 2\n\nИТОГОВАЯ ОЦЕНКА\nБалл: 3",
        "Разбор 3\n\nИТОГОВАЯ ОЦЕНКА\nБалл: 4",
    ]);
    let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator.clone(), three_criteria_templates(), rubrics),
        sink.clone(),
    );
    let status = RecordingStatus(Mutex::new(Vec::new()));
    let solution = words(100);
    let ctx = CheckCtx::new(1, TaskType::Email);

    let outcome = flow
        .run(
            &ctx,
            Submission {
                task: &TaskType::Email,
                description: "Write an email to your friend",
                solution: &solution,
                graph: None,
            },
            &status,
        )
        .await
        .unwrap();

    let (report, record) = match outcome {
        GradingOutcome::Graded { report, record } => (report, record),
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(report.scores, vec![5, 3, 4]);
    assert_eq!(report.final_score, 12);
    assert!(!report.vetoed);

    let first = report.feedback.find("КРИТЕРИЙ 1").unwrap();
    let second = report.feedback.find("КРИТЕРИЙ 2").unwrap();
    let third = report.feedback.find("КРИТЕРИЙ 3").unwrap();
    assert!(first < second && second < third);

    let prompts = evaluator.prompts.lock().await;
    assert!(prompts[0].starts_with("C1 Write an email"));
    assert!(prompts[2].starts_with("C3 "));

    let updates = status.0.lock().await;
    assert_eq!(updates.first().map(String::as_str), Some("📊 Подсчёт количества слов..."));
    assert!(updates.iter().any(|u| u.contains("Шаг 3/3")));

    // 评分流程本身不上报，由调用方确认后再上报
    assert!(sink.0.lock().await.is_empty());
    flow.deliver(&ctx, record.unwrap()).await.unwrap();

    let records = sink.0.lock().await;
    match records.as_slice() {
        [ResultRecord::Essay(record)] => {
            assert_eq!((record.k1, record.k2, record.k3), (5, 3, 4));
            assert_eq!(record.essay, solution);
            assert_eq!(record.comments.len(), 3);
        }
        other => panic!("unexpected records: {:?}", other),
    }
}

#[tokio::test]
async fn test_shipped_email_rubric_clamps_to_two() {
    // 内置 37 题细则每项最高 2 分
    let rubrics = Arc::new(RubricSet::builtin().unwrap());
    let evaluator = ScriptedEvaluator::new(&[
        "ИТОГОВАЯ ОЦЕНКА\nБалл: 5",
        "ИТОГОВАЯ ОЦЕНКА\nБалл: 3",
        "ИТОГОВАЯ ОЦЕНКА\nБалл: 4",
    ]);
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator, prompt_dir(), rubrics),
        Arc::new(RecordingSink(Mutex::new(Vec::new()))),
    );
    let solution = words(100);

    let outcome = flow
        .run(
            &CheckCtx::new(6, TaskType::Email),
            Submission {
                task: &TaskType::Email,
                description: "Write an email to Ben",
                solution: &solution,
                graph: None,
            },
            &NoopStatus,
        )
        .await
        .unwrap();

    match outcome {
        GradingOutcome::Graded { report, .. } => {
            assert_eq!(report.scores, vec![2, 2, 2]);
            assert_eq!(report.final_score, 6);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_first_criterion_zero_vetoes_total() {
    let rubrics = Arc::new(RubricSet::from_toml_str(THREE_CRITERIA, "inline").unwrap());
    let evaluator = ScriptedEvaluator::new(&[
        "ИТОГОВАЯ ОЦЕНКА\nБалл: 0",
        "ИТОГОВАЯ ОЦЕНКА\nБалл: 5",
        "ИТОГОВАЯ ОЦЕНКА\nБалл: 5",
    ]);
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator, three_criteria_templates(), rubrics),
        Arc::new(RecordingSink(Mutex::new(Vec::new()))),
    );
    let solution = words(120);

    let outcome = flow
        .run(
            &CheckCtx::new(2, TaskType::Email),
            Submission {
                task: &TaskType::Email,
                description: "Write an email",
                solution: &solution,
                graph: None,
            },
            &NoopStatus,
        )
        .await
        .unwrap();

    match outcome {
        GradingOutcome::Graded { report, .. } => {
            assert_eq!(report.scores, vec![0, 5, 5]);
            assert_eq!(report.final_score, 0);
            assert!(report.vetoed);
            assert!(report.feedback.contains("равна 0"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_long_solution_is_truncated_before_grading() {
    let rubrics = Arc::new(RubricSet::from_toml_str(THREE_CRITERIA, "inline").unwrap());
    let evaluator = ScriptedEvaluator::new(&["Балл: 2", "Балл: 2", "Балл: 2"]);
    let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator.clone(), three_criteria_templates(), rubrics),
        sink.clone(),
    );
    let solution = words(200);

    let outcome = flow
        .run(
            &CheckCtx::new(3, TaskType::Email),
            Submission {
                task: &TaskType::Email,
                description: "Write an email",
                solution: &solution,
                graph: None,
            },
            &NoopStatus,
        )
        .await
        .unwrap();

    let (report, record) = match outcome {
        GradingOutcome::Graded { report, record } => (report, record),
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert!(report.feedback.starts_with("⚠️"));

    let prompts = evaluator.prompts.lock().await;
    let graded = prompts[0].split(" :: ").nth(1).unwrap();
    assert_eq!(graded.split_whitespace().count(), 154);

    // 记录保留完整原文
    assert_eq!(record.map(|r| r.essay().to_string()), Some(solution));
    assert!(sink.0.lock().await.is_empty());
}

#[tokio::test]
async fn test_short_solution_is_rejected_without_model_call() {
    let rubrics = Arc::new(RubricSet::from_toml_str(THREE_CRITERIA, "inline").unwrap());
    let evaluator = ScriptedEvaluator::new(&[]);
    let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator.clone(), three_criteria_templates(), rubrics),
        sink.clone(),
    );

    let outcome = flow
        .run(
            &CheckCtx::new(4, TaskType::Email),
            Submission {
                task: &TaskType::Email,
                description: "Write an email",
                solution: "Dear Ben, thanks.",
                graph: None,
            },
            &NoopStatus,
        )
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        GradingOutcome::Rejected {
            word_count: 3,
            min_words: 90,
            ..
        }
    ));
    assert!(evaluator.prompts.lock().await.is_empty());
    assert!(sink.0.lock().await.is_empty());
}

#[tokio::test]
async fn test_unknown_task_uses_generic_rubric() {
    let rubrics = Arc::new(RubricSet::from_toml_str(THREE_CRITERIA, "inline").unwrap());
    let evaluator = ScriptedEvaluator::new(&["Score: 8"]);
    let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator.clone(), three_criteria_templates(), rubrics),
        sink.clone(),
    );
    let task = TaskType::from_code("39");

    let outcome = flow
        .run(
            &CheckCtx::new(5, task.clone()),
            Submission {
                task: &task,
                description: "Describe a photo",
                solution: "short answer",
                graph: None,
            },
            &NoopStatus,
        )
        .await
        .unwrap();

    match outcome {
        GradingOutcome::Graded { report, record } => {
            assert_eq!(report.final_score, 8);
            assert_eq!(report.feedback, "Score: 8");
            assert!(record.is_none());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        evaluator.prompts.lock().await.as_slice(),
        ["G 39 short answer".to_string()]
    );
    assert!(sink.0.lock().await.is_empty());
}

#[tokio::test]
async fn test_builtin_rubrics_match_shipped_prompts() {
    let rubrics = RubricSet::builtin().unwrap();
    let templates = prompt_dir();
    for task in [
        TaskType::Email,
        TaskType::TableEssay,
        TaskType::Other("39".to_string()),
    ] {
        for criterion in &rubrics.rubric_for(&task).criteria {
            let body = templates.load(&criterion.template).await.unwrap();
            assert!(body.contains("{{solution}}"), "{}", criterion.template);
            assert!(body.contains("ИТОГОВАЯ ОЦЕНКА"), "{}", criterion.template);
        }
    }
}

#[tokio::test]
async fn test_dialogue_with_shipped_prompts() {
    let rubrics = Arc::new(RubricSet::builtin().unwrap());
    let scripted = ScriptedEvaluator::new(&[
        "ИТОГОВАЯ ОЦЕНКА\n\nИтоговый балл: 2",
        "ИТОГОВАЯ ОЦЕНКА\n\nБалл: 1",
        "ИТОГОВАЯ ОЦЕНКА\n\nОбщий балл: 2",
    ]);
    let evaluator = Arc::new(RetryingEvaluator::new(
        scripted.clone(),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        },
    ));
    let flow = GradingFlow::new(
        PromptSequencer::new(evaluator, prompt_dir(), rubrics),
        Arc::new(RecordingSink(Mutex::new(Vec::new()))),
    );
    let quota = Arc::new(InMemoryQuota::new(1));
    let engine = ConversationEngine::new(
        Arc::new(InMemorySessionStore::new()),
        quota.clone(),
        Arc::new(DisabledOcr),
        flow,
        EngineSettings::default(),
    );
    let user = UserRef::new(77, None);

    engine.handle(&user, Command::Start, &NoopStatus).await;
    engine
        .handle(&user, Command::SelectTask("37".to_string()), &NoopStatus)
        .await;
    engine
        .handle(
            &user,
            Command::SubmitText("You have received an email from Ben".to_string()),
            &NoopStatus,
        )
        .await;
    let replies = engine
        .handle(&user, Command::SubmitText(words(100)), &NoopStatus)
        .await;

    assert!(replies[0].text.contains("Твоя оценка: 5 баллов"));
    let prompts = scripted.prompts.lock().await;
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("You have received an email from Ben"));
    assert!(!prompts[0].contains("{{"));
    assert_eq!(quota.free_checks_left(77).await, Some(0));

    // 额度用完后再检查会被拒绝
    engine.handle(&user, Command::NewTask, &NoopStatus).await;
    engine
        .handle(&user, Command::SelectTask("37".to_string()), &NoopStatus)
        .await;
    engine
        .handle(&user, Command::SubmitText("Email task".to_string()), &NoopStatus)
        .await;
    let replies = engine
        .handle(&user, Command::SubmitText(words(100)), &NoopStatus)
        .await;
    assert!(replies[0].text.contains("Бесплатных проверок осталось: 0"));
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_llm_grades_email() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let evaluator = Arc::new(RetryingEvaluator::new(
        LlmClient::new(&config),
        RetryPolicy::from_config(&config),
    ));
    let flow = GradingFlow::new(
        PromptSequencer::new(
            evaluator,
            prompt_dir(),
            Arc::new(RubricSet::builtin().unwrap()),
        ),
        Arc::new(RecordingSink(Mutex::new(Vec::new()))),
    );
    let solution = "Dear Ben, thanks for your email. ".repeat(20);

    let outcome = flow
        .run(
            &CheckCtx::new(0, TaskType::Email),
            Submission {
                task: &TaskType::Email,
                description: "Write an email to Ben. Answer his questions and ask 3 questions about his trip.",
                solution: &solution,
                graph: None,
            },
            &NoopStatus,
        )
        .await
        .expect("评分失败");

    match outcome {
        GradingOutcome::Graded { report, .. } => assert!(report.final_score <= 6),
        other => panic!("unexpected outcome: {:?}", other),
    }
}
