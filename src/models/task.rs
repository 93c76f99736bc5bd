use phf::phf_map;

/// 考试任务类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// 37 题：电子邮件
    Email,
    /// 38 题：图表/调查数据短文
    TableEssay,
    /// 其他任务，使用通用细则
    Other(String),
}

/// 用户输入 / 按钮回调 → 规范任务编号
static TASK_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "37" => "37",
    "task_37" => "37",
    "задание 37" => "37",
    "38" => "38",
    "task_38" => "38",
    "задание 38" => "38",
};

impl TaskType {
    /// 获取任务编号（同时也是细则的键）
    pub fn code(&self) -> &str {
        match self {
            TaskType::Email => "37",
            TaskType::TableEssay => "38",
            TaskType::Other(code) => code,
        }
    }

    /// 菜单中展示的名称
    pub fn name(&self) -> String {
        format!("Задание {}", self.code())
    }

    /// 解析任务编号；未知编号归入 `Other`
    pub fn from_code(s: &str) -> Self {
        let key = s.trim().to_lowercase();
        match TASK_ALIASES.get(key.as_str()).copied() {
            Some("37") => TaskType::Email,
            Some("38") => TaskType::TableEssay,
            _ => TaskType::Other(s.trim().to_string()),
        }
    }

    /// 菜单中可选的任务
    pub fn menu() -> [TaskType; 2] {
        [TaskType::Email, TaskType::TableEssay]
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
