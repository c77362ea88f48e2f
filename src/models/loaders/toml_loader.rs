use crate::error::{AppError, AppResult, FileError};
use crate::models::question::{BatchRequest, BatchResponse};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载批量问答请求
pub async fn load_batch_request(toml_file_path: &Path) -> AppResult<BatchRequest> {
    let path_str = toml_file_path.display().to_string();

    if !toml_file_path.exists() {
        return Err(AppError::File(FileError::NotFound { path: path_str }));
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let request: BatchRequest =
        toml::from_str(&content).map_err(|e| AppError::toml_parse_failed(&path_str, e))?;

    tracing::info!(
        "成功加载 {} 个问题 (文档: {})",
        request.questions.len(),
        request.documents
    );

    Ok(request)
}

/// 将答案写入 JSON 文件
pub async fn write_batch_response(path: &Path, response: &BatchResponse) -> AppResult<()> {
    let json = serde_json::to_string_pretty(response)?;
    fs::write(path, json)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    Ok(())
}
