use archdim_core::document::DocumentError;
use archdim_engine::errors::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("构建标注几何失败: {0}")]
    Build(#[from] BuildError),
    #[error("文档数据无效: {0}")]
    Document(#[from] DocumentError),
    #[error("文字 `{text}` 栅格化失败")]
    Rasterize { text: String },
}
