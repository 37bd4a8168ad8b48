use std::path::PathBuf;

use archdim_config::{AppConfig, ConfigError, VIEW_NAMES};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 命令行参数：`[--config <path>] [--view top|front|right|iso]`。
#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    view: Option<String>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| "`--config` 需要提供配置文件路径".to_string())?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--view" => {
                    let view = args.next().filter(|view| VIEW_NAMES.contains(&view.as_str()));
                    let Some(view) = view else {
                        return Err(format!("`--view` 需要以下视角之一：{}", VIEW_NAMES.join("|")));
                    };
                    parsed.view = Some(view);
                }
                other => return Err(format!("未知参数：{other}")),
            }
        }
        Ok(parsed)
    }
}

fn main() {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    };

    let mut config = load_configuration(args.config);
    if let Some(view) = args.view {
        config.display.view = view;
    }
    init_logging(&config);
    info!(view = %config.display.view, "启动建筑标注演示");

    match archdim_render::run_cli_demo(&config) {
        Ok(stats) if stats.skipped() > 0 => {
            warn!(skipped = stats.skipped(), "部分标注条目被跳过");
        }
        Ok(_) => {}
        Err(err) => {
            error!(error = %err, "执行 CLI 演示失败");
            std::process::exit(1);
        }
    }
}

/// 显式路径优先；加载失败时退回内建默认值，保证演示总能运行。
fn load_configuration(explicit: Option<PathBuf>) -> AppConfig {
    let result = match &explicit {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    result.unwrap_or_else(|err| {
        match &err {
            ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
            }
            ConfigError::Context { .. } | ConfigError::Invalid { .. } => {
                warn!(error = %err, "配置不可用，使用内建默认值");
            }
        }
        AppConfig::default()
    })
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    if fmt().with_env_filter(filter).try_init().is_err() {
        // 已初始化，忽略
    }
}
