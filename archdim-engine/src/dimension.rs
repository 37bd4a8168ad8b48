use archdim_core::document::{Dimension, DimensionKind, ObjectTable};
use archdim_core::geometry::{
    Axis, dominant_axis, interpolate3d, mask_to_axis, rotate_about_axis, sort_points,
};
use archdim_core::style::{DimensionStyle, ViewPlane};
use archdim_core::units::{format_angle, format_distance};
use glam::DVec3;
use tracing::trace;

use crate::billboard::{TextCard, card_from_axes, card_scale};
use crate::endcap::{CapPlacement, generate_endcap};
use crate::errors::BuildError;
use crate::frame::FrameContext;
use crate::normal::{MeshEdge, resolve_view_axis, select_normal, view_direction, view_sector};

/// 角度标注相对其他几何的深度偏移。
pub const ANGULAR_DEPTH_OFFSET: f32 = -0.001;

/// 按大小绘制的点（注释的圆点端点）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotMark {
    pub position: DVec3,
    pub size: f64,
    pub depth_offset: f32,
}

/// 单个标注条目的绘制数据，交给渲染器按图元类型分批提交。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawPacket {
    pub lines: Vec<[DVec3; 2]>,
    pub triangles: Vec<[DVec3; 3]>,
    /// 拐角补点，使粗线连接处不出现缺口。
    pub points: Vec<DVec3>,
    pub dots: Vec<DotMark>,
    pub text_card: Option<TextCard>,
    pub label: String,
    pub anchor: DVec3,
    pub offset_direction: DVec3,
    pub depth_offset: f32,
    pub flip_caps: bool,
}

/// 构建输入：物体表、生效样式、帧上下文，以及当前文字纹理尺寸。
#[derive(Debug, Clone, Copy)]
pub struct BuildInput<'a> {
    pub objects: &'a ObjectTable,
    pub style: &'a DimensionStyle,
    pub frame: &'a FrameContext,
    pub extent: Option<(u32, u32)>,
}

/// 条目可见、样式可见，且未限定相机或限定的相机正是当前相机。
pub fn is_visible(dimension: &Dimension, style: &DimensionStyle, frame: &FrameContext) -> bool {
    let in_view = match dimension.visible_in_view.as_deref() {
        None => true,
        Some(name) => frame.active_camera_name() == Some(name),
    };
    dimension.visible && style.visible && in_view
}

/// 标注文字，不依赖文字纹理，可在构建几何之前先行更新缓存。
pub fn measurement_label(
    dimension: &Dimension,
    objects: &ObjectTable,
    frame: &FrameContext,
) -> Result<String, BuildError> {
    let a = objects.world_point(dimension.a)?;
    let b = objects.world_point(dimension.b)?;
    match dimension.kind {
        DimensionKind::Aligned => Ok(format_distance(a.distance(b), &frame.units)),
        DimensionKind::AxisConstrained(axis) => {
            let span = (axis.component(a) - axis.component(b)).abs();
            Ok(format_distance(span, &frame.units))
        }
        DimensionKind::Angular => {
            let c_ref = dimension.c.ok_or(BuildError::MissingThirdPoint)?;
            let c = objects.world_point(c_ref)?;
            let (vec_a, vec_c) = angular_arms(a, b, c)?;
            Ok(format_angle(vec_a.angle_between(vec_c), &frame.units))
        }
    }
}

/// 按标注类型分派到对应的构建函数。
pub fn build_dimension(dimension: &Dimension, input: &BuildInput<'_>) -> Result<DrawPacket, BuildError> {
    match dimension.kind {
        DimensionKind::Aligned => build_aligned(dimension, input),
        DimensionKind::AxisConstrained(axis) => build_axis(dimension, axis, input),
        DimensionKind::Angular => build_angular(dimension, input),
    }
}

/// 偏移向量与引线间隙；偏移短于间隙时以间隙代替。
fn offset_vectors(u: DVec3, offset: f64, leader_gap: f64) -> (DVec3, DVec3) {
    let mut offset_vector = u * offset;
    let gap_vector = offset_vector.normalize_or_zero() * leader_gap;
    if offset_vector.length() < gap_vector.length() {
        offset_vector = gap_vector;
    }
    (offset_vector, gap_vector)
}

struct CardLayout {
    card: Option<TextCard>,
    flip_caps: bool,
}

/// 放置文字卡片；卡片加端点比跨距还宽时移到标注线终点之外，并翻转端点。
fn layout_card(
    text_location: DVec3,
    dim_line_end: DVec3,
    card_x_dir: DVec3,
    card_y_dir: DVec3,
    distance: f64,
    input: &BuildInput<'_>,
) -> CardLayout {
    let (sx, sy) = input
        .extent
        .map(|extent| card_scale(extent, input.style))
        .unwrap_or((0.0, 0.0));
    let card_x = card_x_dir * sx;
    let card_y = card_y_dir * sy;
    let cap = input.style.endcap_size / 100.0;

    let mut origin = text_location;
    let flip_caps = card_x.length() + cap > distance;
    if flip_caps {
        origin = dim_line_end - (card_x / 2.0 + card_x.normalize_or_zero() * cap) - card_y / 2.0;
    }

    CardLayout {
        card: input
            .extent
            .map(|_| card_from_axes(origin, card_x, card_y)),
        flip_caps,
    }
}

fn push_caps(
    packet: &mut DrawPacket,
    style: &DimensionStyle,
    ends: [DVec3; 2],
    u: DVec3,
    midpoint: DVec3,
) {
    for (index, (kind, position)) in [style.endcap_a, style.endcap_b]
        .into_iter()
        .zip(ends)
        .enumerate()
    {
        let placement = CapPlacement {
            position,
            offset_direction: u,
            midpoint,
            index,
            flipped: packet.flip_caps,
        };
        let geometry = generate_endcap(kind, style, &placement);
        packet.lines.extend(geometry.lines);
        packet.triangles.extend(geometry.triangles);
    }
}

fn build_aligned(dimension: &Dimension, input: &BuildInput<'_>) -> Result<DrawPacket, BuildError> {
    let objects = input.objects;
    let a = objects.world_point(dimension.a)?;
    let b = objects.world_point(dimension.b)?;
    let (p1, p2) = sort_points(a, b);

    let span = p1 - p2;
    let distance = span.length();
    let direction = span.try_normalize().ok_or(BuildError::DegenerateSpan)?;

    let view_axis = resolve_view_axis(dimension.effective_view_plane(input.style), input.frame);
    let resolved = select_normal(
        MeshEdge::from_refs(objects, dimension.a, dimension.b),
        direction,
        view_axis,
    );
    trace!(source = ?resolved.source, "已解析对齐标注法向");

    let u = rotate_about_axis(resolved.direction, direction, dimension.rotation);
    let (offset_vector, gap_vector) = offset_vectors(u, dimension.offset, dimension.leader_gap);
    let overshoot = offset_vector.normalize_or_zero() * 0.005 * input.style.endcap_size;

    let dim_line_start = p1 + offset_vector;
    let dim_line_end = p2 + offset_vector;
    let text_location = interpolate3d(dim_line_start, dim_line_end, distance / 2.0);

    let layout = layout_card(
        text_location,
        dim_line_end,
        direction,
        u.normalize_or_zero(),
        distance,
        input,
    );

    let mut packet = DrawPacket {
        lines: vec![
            [p1 + gap_vector, p1 + offset_vector + overshoot],
            [p2 + gap_vector, p2 + offset_vector + overshoot],
            [dim_line_start, dim_line_end],
        ],
        text_card: layout.card,
        label: format_distance(distance, &input.frame.units),
        anchor: interpolate3d(p1, p2, distance / 2.0),
        offset_direction: u,
        flip_caps: layout.flip_caps,
        ..DrawPacket::default()
    };
    push_caps(
        &mut packet,
        input.style,
        [dim_line_start, dim_line_end],
        u,
        text_location,
    );
    Ok(packet)
}

fn build_axis(
    dimension: &Dimension,
    axis: Axis,
    input: &BuildInput<'_>,
) -> Result<DrawPacket, BuildError> {
    let objects = input.objects;
    let a = objects.world_point(dimension.a)?;
    let b = objects.world_point(dimension.b)?;
    if a == b {
        return Err(BuildError::DegenerateSpan);
    }
    let (p1, p2) = sort_points(a, b);

    let plane = dimension.effective_view_plane(input.style);
    let raw_view = view_direction(plane, input.frame);
    let sector = view_sector(raw_view, axis);

    let p1_axis = mask_to_axis(p1, axis);
    let p2_axis = mask_to_axis(p2, axis);
    let span = p1_axis - p2_axis;
    let distance = span.length();
    let direction = span.normalize_or_zero();

    let resolved = select_normal(
        MeshEdge::from_refs(objects, dimension.a, dimension.b),
        direction,
        resolve_view_axis(plane, input.frame),
    );

    // 标注线方向垂直于视图扇区与测量轴；二者平行时保留解析出的法向
    let mut dir_vector = sector.cross(axis.unit());
    if dir_vector.dot(resolved.direction) < 0.0 {
        dir_vector = -dir_vector;
    }
    let normal = dir_vector.try_normalize().unwrap_or(resolved.direction);
    trace!(axis = axis.name(), sector = ?sector, "已解析轴向标注方向");

    let u = rotate_about_axis(normal, direction, dimension.rotation);
    let (offset_vector, gap_vector) = offset_vectors(u, dimension.offset, dimension.leader_gap);

    let p1_dir = p1 * dir_vector;
    let p2_dir = p2 * dir_vector;
    let dominant = dominant_axis(p1_dir);
    let (base, second, second_axis, aligned) =
        if dominant.component(p1_dir) >= dominant.component(p2_dir) {
            (p1, p2, p1_axis - p2_axis, p2 - p1)
        } else {
            (p2, p1, p2_axis - p1_axis, p1 - p2)
        };

    let view_diff_axis = if plane == ViewPlane::Auto {
        sector.abs()
    } else {
        raw_view
    };
    let view_diff = aligned * view_diff_axis;

    let lead_start_a = base + gap_vector;
    let lead_end_a = base + offset_vector;
    let lead_end_b = lead_end_a - second_axis;
    let lead_start_b = second - view_diff + gap_vector;
    let jog_end = lead_start_b + view_diff;

    let pull_back = offset_vector.normalize_or_zero() * 0.05;
    let dim_line_start = lead_end_a - pull_back;
    let dim_line_end = lead_end_b - pull_back;
    let text_location = interpolate3d(dim_line_start, dim_line_end, distance / 2.0);

    let card_x_dir = DVec3::new(direction.x.abs(), -direction.y.abs(), -direction.z.abs());
    let layout = layout_card(text_location, dim_line_end, card_x_dir, u, distance, input);

    let mut packet = DrawPacket {
        lines: vec![
            [lead_start_a, lead_end_a],
            [lead_start_b, lead_end_b],
            [dim_line_start, dim_line_end],
            [lead_start_b, jog_end],
        ],
        text_card: layout.card,
        label: format_distance(distance, &input.frame.units),
        anchor: interpolate3d(p1, p2, distance / 2.0),
        offset_direction: u,
        flip_caps: layout.flip_caps,
        ..DrawPacket::default()
    };
    push_caps(
        &mut packet,
        input.style,
        [dim_line_start, dim_line_end],
        u,
        text_location,
    );
    Ok(packet)
}

/// 角顶点指向两端点的单位向量；任一端点与顶点重合时视为退化。
fn angular_arms(a: DVec3, vertex: DVec3, c: DVec3) -> Result<(DVec3, DVec3), BuildError> {
    let vec_a = (a - vertex).try_normalize().ok_or(BuildError::DegenerateSpan)?;
    let vec_c = (c - vertex).try_normalize().ok_or(BuildError::DegenerateSpan)?;
    Ok((vec_a, vec_c))
}

/// 圆弧分段数上限。
pub const MAX_ARC_SEGMENTS: usize = 360;

/// 圆弧分段数，限制在 1 到 `MAX_ARC_SEGMENTS` 之间。
pub fn arc_segments(radius: f64, angle: f64) -> usize {
    let count = (radius / 0.4).ceil() + (angle.to_degrees() / 10.0).floor();
    if count.is_nan() {
        return 1;
    }
    count.clamp(1.0, MAX_ARC_SEGMENTS as f64) as usize
}

fn build_angular(dimension: &Dimension, input: &BuildInput<'_>) -> Result<DrawPacket, BuildError> {
    let objects = input.objects;
    let c_ref = dimension.c.ok_or(BuildError::MissingThirdPoint)?;
    let a = objects.world_point(dimension.a)?;
    let vertex = objects.world_point(dimension.b)?;
    let c = objects.world_point(c_ref)?;
    let (vec_a, vec_c) = angular_arms(a, vertex, c)?;

    // 共线时圆弧落在包含视图轴的平面内：法线取视图轴去掉 B→A 分量后的方向
    let normal = vec_a.cross(vec_c).try_normalize().unwrap_or_else(|| {
        let view_axis = resolve_view_axis(
            dimension.effective_view_plane(input.style),
            input.frame,
        );
        vec_a
            .cross(view_axis.cross(vec_a))
            .try_normalize()
            .unwrap_or_else(|| vec_a.any_orthonormal_vector())
    });

    let radius = dimension.radius;
    let angle = vec_a.angle_between(vec_c);
    let endpoint_a = vec_a * radius + vertex;
    let endpoint_c = vec_c * radius + vertex;

    let segments = arc_segments(radius, angle);
    let step = angle / (segments + 1) as f64;
    let arc: Vec<DVec3> = (0..=segments)
        .map(|index| rotate_about_axis(vec_a, normal, step * index as f64) * radius + vertex)
        .collect();

    let mut points = Vec::with_capacity(arc.len() + 2);
    points.push(endpoint_a);
    points.extend(arc.iter().copied());
    points.push(endpoint_c);
    let lines = points.windows(2).map(|pair| [pair[0], pair[1]]).collect();

    let mid_vector = rotate_about_axis(vec_a, normal, angle / 2.0);
    let mid_point = mid_vector * radius + vertex;

    let text_card = input.extent.map(|extent| {
        let (sx, sy) = card_scale(extent, input.style);
        card_from_axes(mid_point, (vec_c - vec_a) * sx, mid_vector * sy)
    });

    Ok(DrawPacket {
        lines,
        points,
        text_card,
        label: format_angle(angle, &input.frame.units),
        anchor: mid_point,
        offset_direction: mid_vector,
        depth_offset: ANGULAR_DEPTH_OFFSET,
        ..DrawPacket::default()
    })
}
