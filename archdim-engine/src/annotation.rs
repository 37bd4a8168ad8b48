use archdim_core::document::{Annotation, ObjectTable};
use archdim_core::geometry::rotate_about_axis;
use archdim_core::style::{DimensionStyle, EndcapKind, TextPosition};
use glam::{DMat4, DVec3};

use crate::billboard::build_text_card;
use crate::dimension::{DotMark, DrawPacket};
use crate::endcap::{CapPlacement, generate_endcap};
use crate::errors::BuildError;

/// 圆点端点相对引线的深度偏移。
pub const DOT_DEPTH_OFFSET: f32 = -0.01;

const CONE_WEDGES: usize = 12;

pub fn is_visible(annotation: &Annotation, style: &DimensionStyle) -> bool {
    annotation.visible && style.visible
}

/// 构建引线注释：锚点 → 折点 → 文字卡片角点，外加锚点处的端点符号。
pub fn build_annotation(
    annotation: &Annotation,
    objects: &ObjectTable,
    style: &DimensionStyle,
    extent: Option<(u32, u32)>,
) -> Result<DrawPacket, BuildError> {
    let object = objects
        .get(annotation.anchor.object)
        .ok_or(BuildError::MissingObject(annotation.anchor.object.get()))?;
    let anchor = objects.world_point(annotation.anchor)?;

    // 只取物体的旋转与平移，缩放不作用于文字
    let (_, rotation, translation) = object.transform.to_scale_rotation_translation();
    let rot_loc = DMat4::from_rotation_translation(rotation, translation);
    let diff = anchor - object.location();

    let elbow = rot_loc.transform_point3(annotation.offset) + diff;
    let card = build_text_card(
        extent.unwrap_or((0, 0)),
        style,
        annotation.rotation,
        DVec3::ZERO,
    )
    .map(|corner| rot_loc.transform_point3(corner + annotation.offset) + diff);

    let line_end = if style.endcap_a == EndcapKind::Triangle {
        anchor - (anchor - elbow) * 0.02 * f64::from(style.line_weight)
    } else {
        anchor
    };

    let mut packet = DrawPacket {
        lines: vec![[line_end, elbow]],
        text_card: extent.map(|_| card),
        label: annotation.label.text().to_string(),
        anchor: elbow,
        offset_direction: (elbow - anchor).normalize_or_zero(),
        ..DrawPacket::default()
    };

    let corner = match style.text_position {
        TextPosition::Top => Some(card[3]),
        TextPosition::Bottom => Some(card[2]),
        TextPosition::Middle => None,
    };
    if let Some(corner) = corner {
        if corner != elbow {
            packet.lines.push([elbow, corner]);
        }
        packet.points.push(elbow);
    }

    match style.endcap_a {
        EndcapKind::Dot => packet.dots.push(DotMark {
            position: anchor,
            size: style.endcap_size,
            depth_offset: DOT_DEPTH_OFFSET,
        }),
        EndcapKind::Triangle => {
            packet.triangles.extend(arrow_cone(anchor, elbow, style));
        }
        EndcapKind::Line | EndcapKind::Tee => {
            let up = (card[1] - card[0])
                .try_normalize()
                .unwrap_or_else(|| (elbow - anchor).any_orthogonal_vector());
            let placement = CapPlacement {
                position: anchor,
                offset_direction: up,
                midpoint: elbow,
                index: 0,
                flipped: false,
            };
            let geometry = generate_endcap(style.endcap_a, style, &placement);
            packet.lines.extend(geometry.lines);
            packet.triangles.extend(geometry.triangles);
        }
        EndcapKind::None => {}
    }

    Ok(packet)
}

/// 箭头锥体：沿引线方向的 12 片三角形扇面，顶点在锚点。
fn arrow_cone(anchor: DVec3, elbow: DVec3, style: &DimensionStyle) -> Vec<[DVec3; 3]> {
    let axis = anchor - elbow;
    let mut line = axis.normalize_or_zero() * -0.1 * style.endcap_size / 10.0;
    let perp = line.any_orthogonal_vector();
    line = rotate_about_axis(line, perp, style.endcap_arrow_angle - 5_f64.to_radians());

    let step = (360.0 / CONE_WEDGES as f64).to_radians();
    let mut wedges = Vec::with_capacity(CONE_WEDGES);
    for _ in 0..CONE_WEDGES {
        let start = line + anchor;
        line = rotate_about_axis(line, axis, step);
        wedges.push([start, anchor, line + anchor]);
    }
    wedges
}
