//! 文字卡片的朝向处理。
//!
//! 卡片顶点位置保持不变，只通过镜像 UV 让文字从任何视角都保持正向可读。

use archdim_core::style::{DimensionStyle, TextAlignment, TextPosition};
use glam::{DQuat, DVec2, DVec3};

/// 卡片角点顺序：左下、左上、右上、右下。
pub type TextCard = [DVec3; 4];

const NDC_CORNERS: [DVec2; 4] = [
    DVec2::new(-1.0, -1.0),
    DVec2::new(-1.0, 1.0),
    DVec2::new(1.0, 1.0),
    DVec2::new(1.0, -1.0),
];

/// 视图轴绕视线的微小偏转，避免与卡片轴严格正交时点积为零。
const VIEW_SKEW_DEGREES: f64 = 0.5;

/// 文字卡片尺寸：(宽, 高) = (像素 / 分辨率) × 0.1 × 字号 / 6。
pub fn card_scale(extent: (u32, u32), style: &DimensionStyle) -> (f64, f64) {
    if style.text_resolution <= 0.0 {
        return (0.0, 0.0);
    }
    let size = style.font_size / 6.0;
    let (width, height) = extent;
    (
        f64::from(width) / style.text_resolution * 0.1 * size,
        f64::from(height) / style.text_resolution * 0.1 * size,
    )
}

/// 以底边中点 `origin` 构造卡片。
pub fn card_from_axes(origin: DVec3, card_x: DVec3, card_y: DVec3) -> TextCard {
    let half = card_x / 2.0;
    [origin - half, origin - half + card_y, origin + half + card_y, origin + half]
}

/// 计算卡片四个角点的 UV。
pub fn orient_card_uvs(
    card: &TextCard,
    view_rotation: DQuat,
    flip_x: bool,
    flip_y: bool,
) -> [DVec2; 4] {
    let mut ndc = NDC_CORNERS;

    let card_x = (card[3] - card[0]).normalize_or_zero();
    let card_y = (card[1] - card[0]).normalize_or_zero();
    let card_z = card_x.cross(card_y);

    if let Some(card_z) = card_z.try_normalize() {
        let mut view_x = view_rotation * DVec3::X;
        let mut view_y = view_rotation * DVec3::Y;
        let mut view_z = view_rotation * DVec3::Z;

        let skew = DQuat::from_axis_angle(view_z, VIEW_SKEW_DEGREES.to_radians());
        view_x = skew * view_x;
        view_y = skew * view_y;

        if card_z.dot(view_z) <= 0.0 {
            view_z = -view_z;
        }
        let difference = DQuat::from_rotation_arc(view_z, card_z);
        view_x = difference * view_x;
        view_y = difference * view_y;

        if card_x.dot(view_x) < 0.0 {
            ndc = ndc.map(|uv| DVec2::new(-uv.x, uv.y));
        }
        if card_y.dot(view_y) < 0.0 {
            ndc = ndc.map(|uv| DVec2::new(uv.x, -uv.y));
        }
    }

    if flip_x {
        ndc = ndc.map(|uv| DVec2::new(-uv.x, uv.y));
    }
    if flip_y {
        ndc = ndc.map(|uv| DVec2::new(uv.x, -uv.y));
    }

    ndc.map(|uv| (uv + DVec2::ONE) * 0.5)
}

/// 注释文字卡片：单位方块按对齐与位置偏移，缩放后依次绕 X、Y、Z 旋转，再平移到 `base`。
pub fn build_text_card(
    extent: (u32, u32),
    style: &DimensionStyle,
    rotation: DVec3,
    base: DVec3,
) -> TextCard {
    let (sx, sy) = card_scale(extent, style);

    let alignment = match style.text_alignment {
        TextAlignment::Right => 0.5,
        TextAlignment::Left => -0.5,
        TextAlignment::Center => 0.0,
    };
    let position = match style.text_position {
        TextPosition::Middle => 0.5,
        TextPosition::Bottom => 1.0,
        TextPosition::Top => 0.0,
    };

    let unit = [
        DVec3::new(-0.5, 0.0, 0.0),
        DVec3::new(-0.5, 1.0, 0.0),
        DVec3::new(0.5, 1.0, 0.0),
        DVec3::new(0.5, 0.0, 0.0),
    ];
    unit.map(|corner| {
        let shifted = corner - DVec3::new(alignment, position, 0.0);
        let scaled = DVec3::new(shifted.x * sx, shifted.y * sy, shifted.z);
        let rotated = legacy_rotate_x(scaled, rotation.x);
        let rotated = legacy_rotate_y(rotated, rotation.y);
        legacy_rotate_z(rotated, rotation.z) + base
    })
}

// 以下三个旋转沿用旧数据的转置矩阵约定，保证已有注释的朝向不变。

fn legacy_rotate_x(v: DVec3, angle: f64) -> DVec3 {
    let (s, c) = angle.sin_cos();
    DVec3::new(v.x, c * v.y + s * v.z, -s * v.y + c * v.z)
}

fn legacy_rotate_y(v: DVec3, angle: f64) -> DVec3 {
    let (s, c) = angle.sin_cos();
    DVec3::new(c * v.x - s * v.z, v.y, s * v.x + c * v.z)
}

fn legacy_rotate_z(v: DVec3, angle: f64) -> DVec3 {
    let (s, c) = angle.sin_cos();
    DVec3::new(c * v.x + s * v.y, -s * v.x + c * v.y, v.z)
}
