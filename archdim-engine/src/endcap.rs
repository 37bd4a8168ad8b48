use archdim_core::geometry::rotate_about_axis;
use archdim_core::style::{DimensionStyle, EndcapKind};
use glam::DVec3;

/// 端点符号几何：描边线段与填充三角形。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndcapGeometry {
    pub lines: Vec<[DVec3; 2]>,
    pub triangles: Vec<[DVec3; 3]>,
}

impl EndcapGeometry {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.triangles.is_empty()
    }
}

/// 端点符号的放置参数。
#[derive(Debug, Clone, Copy)]
pub struct CapPlacement {
    pub position: DVec3,
    /// 偏移方向 u（标注线的法向）。
    pub offset_direction: DVec3,
    /// 文字中点，端点方向由它指向 `position`。
    pub midpoint: DVec3,
    /// 0 为起点，1 为终点。
    pub index: usize,
    pub flipped: bool,
}

pub fn generate_endcap(
    kind: EndcapKind,
    style: &DimensionStyle,
    placement: &CapPlacement,
) -> EndcapGeometry {
    let mut geometry = EndcapGeometry::default();
    let cap_size = style.endcap_size;
    let pos = placement.position;
    let u = placement.offset_direction;
    let direction = (pos - placement.midpoint).normalize_or_zero();
    let norm = direction.cross(u);

    let mut arrow_angle = style.endcap_arrow_angle;
    if placement.flipped {
        arrow_angle += std::f64::consts::PI;
    }

    match kind {
        EndcapKind::None => {}
        EndcapKind::Line | EndcapKind::Triangle | EndcapKind::Tee => {
            let line = direction * (cap_size / 100.0);
            let first = rotate_about_axis(line, norm, arrow_angle);
            let second = rotate_about_axis(first, norm, -2.0 * arrow_angle);
            let wing_a = pos - first;
            let wing_b = pos - second;
            match kind {
                EndcapKind::Line => {
                    geometry.lines.push([wing_a, pos]);
                    geometry.lines.push([wing_b, pos]);
                }
                EndcapKind::Triangle => geometry.triangles.push([wing_a, pos, wing_b]),
                _ => geometry.lines.push([wing_a, wing_b]),
            }
        }
        EndcapKind::Dot => {
            let rotation = (-90.0_f64).to_radians();
            let overextension = rotate_about_axis(u / 20.0, norm, rotation);
            geometry.lines.push([pos, pos + overextension]);

            let x = direction * cap_size / 20.0;
            let y = u.normalize_or_zero() * cap_size / 20.0;
            let (a, b) = (0.055, 0.085);
            let corners = [a * x + b * y, b * x + a * y, -a * x - b * y, -b * x - a * y];
            // 只有起点端的方块预先旋转
            let square = corners.map(|corner| {
                let corner = if placement.index < 1 {
                    rotate_about_axis(corner, norm, rotation)
                } else {
                    corner
                };
                corner + pos
            });
            geometry.triangles.push([square[0], square[1], square[2]]);
            geometry.triangles.push([square[0], square[2], square[3]]);
        }
    }

    geometry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(index: usize, flipped: bool) -> CapPlacement {
        CapPlacement {
            position: DVec3::new(1.0, 0.5, 0.0),
            offset_direction: DVec3::Y,
            midpoint: DVec3::new(0.0, 0.5, 0.0),
            index,
            flipped,
        }
    }

    #[test]
    fn none_produces_nothing() {
        let geometry = generate_endcap(EndcapKind::None, &DimensionStyle::default(), &placement(0, false));
        assert!(geometry.is_empty());
    }

    #[test]
    fn line_arrow_wings_point_back_towards_midpoint() {
        let style = DimensionStyle::default();
        let geometry = generate_endcap(EndcapKind::Line, &style, &placement(1, false));
        assert_eq!(geometry.lines.len(), 2);
        assert!(geometry.triangles.is_empty());

        let tip = DVec3::new(1.0, 0.5, 0.0);
        for [wing, end] in &geometry.lines {
            assert_eq!(*end, tip);
            assert!(wing.x < tip.x);
            assert!(((*wing - tip).length() - 0.04).abs() < 1e-12);
        }
        // 两翼关于标注线对称
        let spread = geometry.lines[0][0].y - 0.5;
        assert!((spread + (geometry.lines[1][0].y - 0.5)).abs() < 1e-12);
        assert!((spread.abs() - 0.04 * style.endcap_arrow_angle.sin()).abs() < 1e-12);
    }

    #[test]
    fn flipped_caps_point_outwards() {
        let style = DimensionStyle::default();
        let geometry = generate_endcap(EndcapKind::Triangle, &style, &placement(1, true));
        assert_eq!(geometry.triangles.len(), 1);
        let [wing_a, tip, wing_b] = geometry.triangles[0];
        assert!(wing_a.x > tip.x);
        assert!(wing_b.x > tip.x);
    }

    #[test]
    fn tee_joins_wing_tips() {
        let style = DimensionStyle::default();
        let geometry = generate_endcap(EndcapKind::Tee, &style, &placement(0, false));
        assert_eq!(geometry.lines.len(), 1);
        let [a, b] = geometry.lines[0];
        assert!((a.x - b.x).abs() < 1e-12);
    }

    #[test]
    fn dot_square_is_prerotated_only_for_first_cap() {
        let style = DimensionStyle::default();
        let first = generate_endcap(EndcapKind::Dot, &style, &placement(0, false));
        let second = generate_endcap(EndcapKind::Dot, &style, &placement(1, false));
        assert_eq!(first.lines.len(), 1);
        assert_eq!(first.triangles.len(), 2);
        assert_eq!(first.lines, second.lines);
        assert_ne!(first.triangles, second.triangles);

        // 终点端的方块未旋转：s1 = a·x + b·y
        let pos = DVec3::new(1.0, 0.5, 0.0);
        let scale = style.endcap_size / 20.0;
        let expected = pos + DVec3::new(0.055 * scale, 0.085 * scale, 0.0);
        assert!((second.triangles[0][0] - expected).length() < 1e-12);
    }
}
