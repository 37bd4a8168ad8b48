//! 标注偏移方向的解析。
//!
//! 优先使用测量边两侧相邻面的法向量；拿不到恰好两个面时退化为视图轴与测量方向的叉积，
//! 两者都为零时使用固定的中心射线。结果总是单位向量。

use archdim_core::document::{ObjectTable, PointRef, SceneObject, VertexRef};
use archdim_core::geometry::{Axis, dominant_axis};
use archdim_core::style::ViewPlane;
use glam::DVec3;

use crate::frame::FrameContext;

/// 自动视图轴的吸附阈值（约 1/√3）。
pub const VIEW_SNAP_THRESHOLD: f64 = 0.5773;

/// 所有退化路径最终使用的方向。
pub const CENTER_RAY: DVec3 = DVec3::new(-1.0, 1.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalSource {
    FaceNormals,
    ViewCross,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNormal {
    pub direction: DVec3,
    pub source: NormalSource,
}

/// 同一网格上的一条测量边（两个顶点索引）。
#[derive(Debug, Clone, Copy)]
pub struct MeshEdge<'a> {
    pub object: &'a SceneObject,
    pub a: usize,
    pub b: usize,
}

impl<'a> MeshEdge<'a> {
    /// 两个引用都指向同一网格物体的顶点时才构成网格边。
    pub fn from_refs(objects: &'a ObjectTable, a: PointRef, b: PointRef) -> Option<Self> {
        if a.object != b.object {
            return None;
        }
        let object = objects.get(a.object).filter(|object| object.is_mesh())?;
        match (a.vertex, b.vertex) {
            (VertexRef::Vertex(a), VertexRef::Vertex(b)) => Some(Self { object, a, b }),
            _ => None,
        }
    }
}

/// 未吸附的视图方向：显式平面取其法线轴，`Auto` 取帧的视线。
pub fn view_direction(plane: ViewPlane, frame: &FrameContext) -> DVec3 {
    match plane.normal_axis() {
        Some(axis) => axis.unit(),
        None => frame.look_vector(),
    }
}

/// 视图轴：`Auto` 时把视线吸附到最接近的坐标轴，后判定的分量优先。
pub fn resolve_view_axis(plane: ViewPlane, frame: &FrameContext) -> DVec3 {
    let direction = view_direction(plane, frame);
    if plane.normal_axis().is_some() {
        return direction;
    }
    snap_view_axis(direction)
}

pub fn snap_view_axis(direction: DVec3) -> DVec3 {
    let mut axis = direction;
    for candidate in Axis::ALL {
        if candidate.component(direction).abs() > VIEW_SNAP_THRESHOLD {
            axis = candidate.unit();
        }
    }
    axis
}

/// 选取偏移方向。`span` 为测量方向（通常已归一化）。
pub fn select_normal(edge: Option<MeshEdge<'_>>, span: DVec3, view_axis: DVec3) -> ResolvedNormal {
    if let Some(direction) = edge.and_then(|edge| face_normal_direction(edge, span, view_axis)) {
        return ResolvedNormal {
            direction,
            source: NormalSource::FaceNormals,
        };
    }

    let crossed = view_axis.cross(span);
    let (mut best, source) = if crossed.length() == 0.0 {
        (CENTER_RAY, NormalSource::Fallback)
    } else {
        (crossed, NormalSource::ViewCross)
    };
    if best.dot(CENTER_RAY) < 0.0 {
        best = -best;
    }
    ResolvedNormal {
        direction: best.normalize(),
        source,
    }
}

fn face_normal_direction(edge: MeshEdge<'_>, span: DVec3, view_axis: DVec3) -> Option<DVec3> {
    let normals: Vec<DVec3> = edge
        .object
        .faces_sharing(edge.a, edge.b)
        .map(|face| edge.object.world_normal(face.normal))
        .collect();
    if normals.len() != 2 {
        return None;
    }
    let sum = normals[0] + normals[1];

    let mut check = 0.0_f64;
    let mut plane_normal = DVec3::ZERO;
    for candidate in normals.iter().copied().chain(std::iter::once(view_axis)) {
        let value = view_axis.dot(candidate);
        if value.abs() > check.abs() {
            plane_normal = candidate;
            check = value;
        }
    }

    let mut best = plane_normal.cross(span);
    if best.length() == 0.0 {
        best = sum;
    }
    if best.dot(sum) < 0.0 {
        best = -best;
    }
    best.try_normalize()
}

/// 轴向标注的视图扇区：按轴专用阈值把视图方向吸附为 ±1 的单轴向量。
pub fn view_sector(view: DVec3, axis: Axis) -> DVec3 {
    let thresholds = match axis {
        Axis::X => [0.95796, 0.22146, 0.197568],
        Axis::Y => [0.22146, 0.95796, 0.197568],
        Axis::Z => [0.24681, 0.24681, 0.938],
    };

    let mut sector = None;
    for candidate in Axis::ALL {
        let value = candidate.component(view);
        let threshold = thresholds[candidate.index()];
        if value > threshold {
            sector = Some(candidate.unit());
        } else if value < -threshold {
            sector = Some(-candidate.unit());
        }
    }

    sector.unwrap_or_else(|| {
        let dominant = dominant_axis(view);
        if dominant.component(view) < 0.0 {
            -dominant.unit()
        } else {
            dominant.unit()
        }
    })
}
