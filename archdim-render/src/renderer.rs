use archdim_core::document::{Annotation, Dimension, Document, LineGroup, ObjectTable, TextLabel};
use archdim_core::style::{
    DimensionStyle, LineStyle, StyleProvider, StyleRef, StyleSource, display_color, resolve_style,
};
use archdim_engine::annotation::{self, build_annotation};
use archdim_engine::billboard::orient_card_uvs;
use archdim_engine::dimension::{self, BuildInput, DrawPacket, build_dimension, measurement_label};
use archdim_engine::errors::BuildError;
use archdim_engine::frame::FrameContext;
use glam::DVec3;
use tracing::{debug, trace, warn};

use crate::backend::{DepthMode, DrawBackend, DrawBatch, Primitive};
use crate::errors::RenderError;
use crate::text::{TextRasterizer, refresh_label};

/// 编辑模式下线组的透明度。
pub const EDIT_MODE_ALPHA: f32 = 0.3;

/// 相邻线段首尾距离小于该值时视为相连，虚线弧长继续累计。
const CONNECT_EPSILON: f64 = 1e-9;

/// 单帧绘制统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub dimensions_drawn: usize,
    pub dimensions_skipped: usize,
    pub annotations_drawn: usize,
    pub annotations_skipped: usize,
    pub line_groups_drawn: usize,
    pub line_groups_skipped: usize,
    pub labels_rasterized: usize,
    pub batches: usize,
}

impl FrameStats {
    pub fn skipped(&self) -> usize {
        self.dimensions_skipped + self.annotations_skipped + self.line_groups_skipped
    }
}

/// 线组深度偏移：(线宽 / 2.5 + 用户偏移)，正交视图再除以 15，轮廓线取 −10 − 偏移，最后缩小 1000 倍并取反。
pub fn line_depth_bias(style: &LineStyle, orthographic: bool) -> f32 {
    let mut bias = style.line_weight / 2.5 + style.depth_offset;
    if orthographic {
        bias /= 15.0;
    }
    if style.is_outline {
        bias = -10.0 - bias;
    }
    -(bias / 1000.0)
}

/// 每个顶点的累计弧长；线段首尾相连时延续上一段的长度，否则从零开始。
pub fn dash_arc_lengths(segments: &[[DVec3; 2]]) -> Vec<f32> {
    let mut lengths = Vec::with_capacity(segments.len() * 2);
    let mut total = 0.0_f64;
    let mut previous_end: Option<DVec3> = None;
    for [start, end] in segments {
        let connected = previous_end.is_some_and(|last| last.distance(*start) < CONNECT_EPSILON);
        if !connected {
            total = 0.0;
        }
        lengths.push(total as f32);
        total += start.distance(*end);
        lengths.push(total as f32);
        previous_end = Some(*end);
    }
    lengths
}

fn resolve_with_log<'a, T>(
    kind: &'static str,
    item: u64,
    inline: &'a T,
    binding: &StyleRef,
    lookup: impl FnOnce(&str) -> Option<&'a T>,
) -> &'a T {
    let resolved = resolve_style(inline, binding, lookup);
    if resolved.source == StyleSource::Dangling {
        warn!(kind, item, style = ?binding.name(), "样式引用不存在，回退到内联样式");
    }
    resolved.style
}

/// 标注渲染器：遍历文档中的可见条目，构建几何后按图元类型提交给后端。
pub struct Renderer<B, R> {
    backend: B,
    rasterizer: R,
}

impl<B, R> Renderer<B, R>
where
    B: DrawBackend,
    R: TextRasterizer,
{
    pub fn new(backend: B, rasterizer: R) -> Self {
        Self {
            backend,
            rasterizer,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// 绘制一帧。单个条目的错误只导致该条目被跳过。
    pub fn draw_document<S>(
        &mut self,
        document: &mut Document,
        styles: &S,
        frame: &FrameContext,
    ) -> FrameStats
    where
        S: StyleProvider + ?Sized,
    {
        let mut stats = FrameStats::default();
        let (objects, items) = document.split_mut();

        for (id, group) in items.line_groups.iter_mut() {
            let style = resolve_with_log(
                "line_group",
                id.get(),
                &group.style,
                &group.style_ref,
                |name| styles.line_style(name),
            )
            .clone();
            if !(group.visible && style.visible) {
                continue;
            }
            match self.draw_line_group(objects, group, &style, frame, &mut stats) {
                Ok(()) => stats.line_groups_drawn += 1,
                Err(err) => {
                    debug!(item = id.get(), error = %err, "跳过线组");
                    stats.line_groups_skipped += 1;
                }
            }
        }

        for (id, dimension) in items.dimensions.iter_mut() {
            let style = resolve_with_log(
                "dimension",
                id.get(),
                &dimension.style,
                &dimension.style_ref,
                |name| styles.dimension_style(name),
            )
            .clone();
            if !dimension::is_visible(dimension, &style, frame) {
                continue;
            }
            match self.draw_dimension(objects, dimension, &style, frame, &mut stats) {
                Ok(()) => stats.dimensions_drawn += 1,
                Err(err) => {
                    debug!(
                        item = id.get(),
                        kind = dimension.kind.describe(),
                        error = %err,
                        "跳过标注"
                    );
                    stats.dimensions_skipped += 1;
                }
            }
        }

        for (id, annotation) in items.annotations.iter_mut() {
            let style = resolve_with_log(
                "annotation",
                id.get(),
                &annotation.style,
                &annotation.style_ref,
                |name| styles.annotation_style(name),
            )
            .clone();
            if !annotation::is_visible(annotation, &style) {
                continue;
            }
            match self.draw_annotation(objects, annotation, &style, frame, &mut stats) {
                Ok(()) => stats.annotations_drawn += 1,
                Err(err) => {
                    debug!(item = id.get(), error = %err, "跳过注释");
                    stats.annotations_skipped += 1;
                }
            }
        }

        debug!(
            dimensions = stats.dimensions_drawn,
            annotations = stats.annotations_drawn,
            line_groups = stats.line_groups_drawn,
            skipped = stats.skipped(),
            batches = stats.batches,
            "帧绘制完成"
        );
        stats
    }

    fn draw_dimension(
        &mut self,
        objects: &ObjectTable,
        dimension: &mut Dimension,
        style: &DimensionStyle,
        frame: &FrameContext,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        // 先更新文字缓存，几何布局需要当前帧的纹理尺寸
        let text = measurement_label(dimension, objects, frame)?;
        dimension.label.set_text(text);
        self.refresh(&mut dimension.label, style, stats);

        let input = BuildInput {
            objects,
            style,
            frame,
            extent: dimension.label.extent(),
        };
        let packet = build_dimension(dimension, &input)?;
        self.submit_packet(&packet, style, frame, &dimension.label, stats);
        Ok(())
    }

    fn draw_annotation(
        &mut self,
        objects: &ObjectTable,
        annotation: &mut Annotation,
        style: &DimensionStyle,
        frame: &FrameContext,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        self.refresh(&mut annotation.label, style, stats);
        let packet = build_annotation(annotation, objects, style, annotation.label.extent())?;
        self.submit_packet(&packet, style, frame, &annotation.label, stats);
        Ok(())
    }

    fn refresh(&mut self, label: &mut TextLabel, style: &DimensionStyle, stats: &mut FrameStats) {
        match refresh_label(label, &mut self.rasterizer, style.text_resolution) {
            Ok(true) => stats.labels_rasterized += 1,
            Ok(false) => {}
            // 没有纹理时仍绘制线条
            Err(err) => debug!(error = %err, "标注文字不可用"),
        }
    }

    fn emit(&mut self, batch: &DrawBatch<'_>, stats: &mut FrameStats) {
        if batch.is_empty() {
            return;
        }
        trace!(
            primitive = batch.primitive.describe(),
            vertices = batch.vertex_count(),
            "提交绘制批次"
        );
        self.backend.draw(batch);
        stats.batches += 1;
    }

    fn submit_packet(
        &mut self,
        packet: &DrawPacket,
        style: &DimensionStyle,
        frame: &FrameContext,
        label: &TextLabel,
        stats: &mut FrameStats,
    ) {
        let color = display_color(style.color);
        let weight = style.line_weight;
        let viewport = frame.viewport;
        let depth_offset = packet.depth_offset;

        let points = DrawBatch::new(Primitive::Points, color, weight, viewport)
            .with_positions(packet.points.iter().copied())
            .with_depth(DepthMode::LessEqual, depth_offset);
        self.emit(&points, stats);

        let lines = DrawBatch::new(Primitive::Lines, color, weight, viewport)
            .with_positions(packet.lines.iter().flatten().copied())
            .with_depth(DepthMode::LessEqual, depth_offset);
        self.emit(&lines, stats);

        let triangles = DrawBatch::new(Primitive::Triangles, color, weight, viewport)
            .with_positions(packet.triangles.iter().flatten().copied())
            .with_depth(DepthMode::LessEqual, depth_offset);
        self.emit(&triangles, stats);

        for dot in &packet.dots {
            let batch = DrawBatch::new(Primitive::Points, color, dot.size as f32, viewport)
                .with_positions([dot.position])
                .with_depth(DepthMode::LessEqual, dot.depth_offset);
            self.emit(&batch, stats);
        }

        if frame.show_dimension_text {
            if let (Some(card), Some(texture)) = (packet.text_card.as_ref(), label.texture()) {
                let uvs = orient_card_uvs(card, frame.billboard_rotation(), label.flip_x, label.flip_y);
                let mut batch = DrawBatch::new(Primitive::TriangleFan, color, 1.0, viewport)
                    .with_positions(card.iter().copied())
                    .with_depth(DepthMode::LessEqual, depth_offset);
                batch.uvs = uvs.iter().map(|uv| uv.as_vec2().to_array()).collect();
                batch.texture = Some(texture);
                self.emit(&batch, stats);
            }
        }
    }

    fn draw_line_group(
        &mut self,
        objects: &ObjectTable,
        group: &LineGroup,
        style: &LineStyle,
        frame: &FrameContext,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        let object = objects
            .get(group.object)
            .ok_or(BuildError::MissingObject(group.object.get()))?;

        let mut segments = Vec::with_capacity(group.segments.len());
        for segment in &group.segments {
            match (object.world_vertex(segment.a), object.world_vertex(segment.b)) {
                (Some(a), Some(b)) => segments.push([a, b]),
                _ => trace!(a = segment.a, b = segment.b, "线段索引无效，跳过"),
            }
        }
        if segments.is_empty() {
            return Ok(());
        }

        let mut color = display_color(style.color);
        let mut hidden_color = display_color(style.hidden_color);
        if frame.edit_mode {
            color[3] = EDIT_MODE_ALPHA;
            hidden_color[3] = EDIT_MODE_ALPHA;
        }
        let bias = line_depth_bias(style, frame.is_orthographic());
        let viewport = frame.viewport;
        let positions = || segments.iter().flatten().copied();

        let primitive = if style.draw_dashed {
            Primitive::DashedLines
        } else {
            Primitive::Lines
        };
        let mut lines = DrawBatch::new(primitive, color, style.line_weight, viewport)
            .with_positions(positions())
            .with_depth(DepthMode::LessEqual, bias);
        if style.draw_dashed {
            lines.arc_lengths = dash_arc_lengths(&segments);
            lines.dash_scale = style.dash_scale;
            lines.screen_space_dashes = style.screen_space_dashes;
        }
        self.emit(&lines, stats);

        // 端点补点，粗线拐角不留缺口
        let corners = DrawBatch::new(Primitive::Points, color, style.line_weight, viewport)
            .with_positions(positions())
            .with_depth(DepthMode::LessEqual, bias);
        self.emit(&corners, stats);

        if style.draw_hidden {
            let mut hidden =
                DrawBatch::new(Primitive::DashedLines, hidden_color, style.hidden_weight, viewport)
                    .with_positions(positions())
                    .with_depth(DepthMode::Greater, bias);
            hidden.arc_lengths = dash_arc_lengths(&segments);
            hidden.dash_scale = style.dash_scale;
            hidden.screen_space_dashes = style.screen_space_dashes;
            self.emit(&hidden, stats);
        }
        Ok(())
    }
}
