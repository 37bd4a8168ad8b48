use archdim_config::AppConfig;
use archdim_core::document::Document;
use archdim_core::style::StyleRegistry;
use archdim_engine::frame::{FrameContext, Projection, ViewPreset};
use tracing::{info, warn};

use crate::backend::{DepthMode, RecordedBatch, RecordingBackend};
use crate::demo::populate_demo;
use crate::errors::RenderError;
use crate::renderer::{FrameStats, Renderer};
use crate::text::FixedAdvanceRasterizer;

/// 由应用配置生成帧上下文，未知视角回退到俯视。
pub fn frame_from_config(config: &AppConfig) -> FrameContext {
    let preset = ViewPreset::parse(&config.display.view).unwrap_or_else(|| {
        warn!(view = %config.display.view, "未知视角，使用俯视");
        ViewPreset::Top
    });
    let mut frame = FrameContext::from_preset(preset).with_units(config.units.clone());
    frame.viewport = config.display.viewport;
    frame.show_dimension_text = config.display.show_dimension_text;
    if config.display.orthographic {
        frame.projection = Projection::Orthographic;
    }
    frame
}

/// 简易 CLI 演示：构建示例场景，用记录后端绘制一帧并打印批次概览。
pub fn run_demo(config: &AppConfig) -> Result<FrameStats, RenderError> {
    let mut document = Document::new();
    let mut styles = StyleRegistry::new();
    let items = populate_demo(&mut document, &mut styles)?;
    let frame = frame_from_config(config);

    let mut renderer = Renderer::new(RecordingBackend::new(), FixedAdvanceRasterizer::default());
    let stats = renderer.draw_document(&mut document, &styles, &frame);
    info!(
        drawn = stats.dimensions_drawn + stats.annotations_drawn + stats.line_groups_drawn,
        skipped = stats.skipped(),
        batches = stats.batches,
        "CLI 演示帧统计"
    );

    println!("Rust 版建筑标注 CLI 演示");
    println!(
        "视角={}, 投影={}, 视口={}×{}",
        config.display.view,
        if frame.is_orthographic() { "正交" } else { "透视" },
        frame.viewport[0],
        frame.viewport[1]
    );

    println!("标注文字：");
    for (id, dimension) in document.dimensions() {
        println!(
            "  - {} #{}: {}",
            dimension.kind.describe(),
            id.get(),
            dimension.label.text()
        );
    }
    for (id, annotation) in document.annotations() {
        println!("  - 注释 #{}: {}", id.get(), annotation.label.text());
    }
    if let Some(dimension) = document.dimension(items.aligned) {
        if let Some((width, height)) = dimension.label.extent() {
            println!("对齐标注文字纹理：{width}×{height} 像素");
        }
    }

    println!("绘制批次：");
    for (index, batch) in renderer.backend().batches().iter().enumerate() {
        println!("  {:>2}. {}", index + 1, describe_batch(batch));
    }
    println!(
        "共绘制 {} 个标注、{} 个注释、{} 个线组，跳过 {} 个条目",
        stats.dimensions_drawn,
        stats.annotations_drawn,
        stats.line_groups_drawn,
        stats.skipped()
    );
    Ok(stats)
}

fn describe_batch(batch: &RecordedBatch) -> String {
    let depth = match batch.depth {
        DepthMode::LessEqual => "≤",
        DepthMode::Greater => ">",
    };
    let mut line = format!(
        "{}，顶点={}，颜色=({:.2}, {:.2}, {:.2}, {:.2})，线宽={:.1}，深度测试={}，深度偏移={:.5}",
        batch.primitive.describe(),
        batch.positions.len(),
        batch.color[0],
        batch.color[1],
        batch.color[2],
        batch.color[3],
        batch.thickness,
        depth,
        batch.depth_offset
    );
    if let Some((width, height)) = batch.texture_size {
        line.push_str(&format!("，纹理={width}×{height}"));
    }
    if !batch.arc_lengths.is_empty() {
        let total = batch.arc_lengths.iter().copied().fold(0.0_f32, f32::max);
        line.push_str(&format!("，虚线最长弧长={total:.2}"));
    }
    line
}
