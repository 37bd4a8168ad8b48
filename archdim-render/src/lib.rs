pub mod backend;
pub mod cli;
pub mod demo;
pub mod errors;
pub mod renderer;
pub mod text;

use archdim_config::AppConfig;
use errors::RenderError;
use renderer::FrameStats;
use tracing::info;

/// 启动 CLI 演示或返回错误。
pub fn run_cli_demo(config: &AppConfig) -> Result<FrameStats, RenderError> {
    info!(view = %config.display.view, "启动 CLI 演示");
    cli::run_demo(config)
}
