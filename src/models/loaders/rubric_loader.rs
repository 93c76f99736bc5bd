use crate::error::RubricError;
use crate::models::rubric::RubricSet;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载评分细则
pub async fn load_rubric_file(path: &Path) -> Result<RubricSet, RubricError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| RubricError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    let set = RubricSet::from_toml_str(&content, &path.display().to_string())?;
    tracing::info!("✓ 已加载评分细则: {}", path.display());
    Ok(set)
}

/// 按配置加载评分细则：路径为空时使用内置细则
pub async fn load_rubrics(rubric_file: &str) -> Result<RubricSet, RubricError> {
    if rubric_file.trim().is_empty() {
        tracing::debug!("使用内置评分细则");
        return RubricSet::builtin();
    }
    load_rubric_file(Path::new(rubric_file)).await
}
