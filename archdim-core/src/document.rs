use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, Axis};
use crate::style::{DimensionStyle, LineStyle, StyleRef, ViewPlane};

/// 顶点索引的保留值：表示使用物体原点而不是某个顶点。
pub const ORIGIN_INDEX: u32 = 9_999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 标注、注释、线组共用的条目 ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(u64);

impl ItemId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("object with id {0} not found")]
    ObjectNotFound(u64),
    #[error("vertex {index} out of range (object has {len} vertices)")]
    VertexOutOfRange { index: usize, len: usize },
    #[error("dimension endpoints must reference different points")]
    DegenerateDimension,
    #[error("angular dimension requires a third point")]
    MissingThirdPoint,
    #[error("face needs at least three distinct, non-colinear vertices")]
    DegenerateFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Mesh,
    Empty,
}

/// 网格面：顶点索引与局部坐标系下的法向量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub vertices: Vec<usize>,
    pub normal: DVec3,
}

impl Face {
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.vertices.contains(&index)
    }
}

/// 宿主场景中的一个物体：世界矩阵、顶点缓冲与可选的面拓扑。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: DMat4,
    vertices: Vec<DVec3>,
    faces: Vec<Face>,
}

impl SceneObject {
    pub fn empty(name: impl Into<String>, transform: DMat4) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Empty,
            transform,
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn mesh<I>(name: impl Into<String>, transform: DMat4, vertices: I) -> Self
    where
        I: IntoIterator<Item = DVec3>,
    {
        Self {
            name: name.into(),
            kind: ObjectKind::Mesh,
            transform,
            vertices: vertices.into_iter().collect(),
            faces: Vec::new(),
        }
    }

    /// 添加一个面，法向量按顶点环绕顺序计算。
    pub fn add_face<I>(&mut self, indices: I) -> Result<(), DocumentError>
    where
        I: IntoIterator<Item = usize>,
    {
        let vertices: Vec<usize> = indices.into_iter().collect();
        let mut points = Vec::with_capacity(vertices.len());
        for &index in &vertices {
            let point = self.vertex(index).ok_or(DocumentError::VertexOutOfRange {
                index,
                len: self.vertices.len(),
            })?;
            points.push(point);
        }
        let normal = geometry::polygon_normal(&points).ok_or(DocumentError::DegenerateFace)?;
        self.faces.push(Face { vertices, normal });
        Ok(())
    }

    #[inline]
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh)
    }

    #[inline]
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Option<DVec3> {
        self.vertices.get(index).copied()
    }

    /// 世界坐标系下的物体原点。
    #[inline]
    pub fn location(&self) -> DVec3 {
        self.transform.w_axis.truncate()
    }

    pub fn world_vertex(&self, index: usize) -> Option<DVec3> {
        self.vertex(index)
            .map(|local| geometry::transform_point(&self.transform, local))
    }

    /// 将局部法向量变换到世界坐标（忽略平移）并归一化。
    pub fn world_normal(&self, local: DVec3) -> DVec3 {
        self.transform.transform_vector3(local).normalize_or_zero()
    }

    /// 同时包含两个顶点的所有面。
    pub fn faces_sharing(&self, a: usize, b: usize) -> impl Iterator<Item = &Face> + '_ {
        self.faces
            .iter()
            .filter(move |face| face.contains(a) && face.contains(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexRef {
    Vertex(usize),
    Origin,
}

impl VertexRef {
    /// 从宿主的原始索引转换，`ORIGIN_INDEX` 映射为物体原点。
    pub fn from_raw(raw: u32) -> Self {
        if raw == ORIGIN_INDEX {
            VertexRef::Origin
        } else {
            VertexRef::Vertex(raw as usize)
        }
    }

    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            VertexRef::Vertex(index) => Some(index),
            VertexRef::Origin => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointRef {
    pub object: ObjectId,
    pub vertex: VertexRef,
}

impl PointRef {
    #[inline]
    pub fn vertex(object: ObjectId, index: usize) -> Self {
        Self {
            object,
            vertex: VertexRef::Vertex(index),
        }
    }

    #[inline]
    pub fn origin(object: ObjectId) -> Self {
        Self {
            object,
            vertex: VertexRef::Origin,
        }
    }
}

/// 文字纹理缓存：像素尺寸与 RGBA 数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextTexture {
    /// 尺寸为零或像素长度不匹配时返回 None。
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }
}

fn dirty_by_default() -> bool {
    true
}

/// 标注文字及其纹理缓存。不变量：纹理存在且有效，当且仅当 `dirty == false`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLabel {
    text: String,
    #[serde(skip, default = "dirty_by_default")]
    dirty: bool,
    #[serde(skip)]
    texture: Option<TextTexture>,
    /// 生成当前纹理时的分辨率（dpi）。
    #[serde(skip)]
    resolution: Option<f64>,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
}

impl Default for TextLabel {
    fn default() -> Self {
        Self::new("")
    }
}

impl TextLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dirty: true,
            texture: None,
            resolution: None,
            flip_x: false,
            flip_y: false,
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 更新文字，内容变化时标记为脏并丢弃纹理。返回是否发生变化。
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.text {
            return false;
        }
        self.text = text;
        self.mark_dirty();
        true
    }

    /// 样式变化等场景下显式失效缓存。
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.texture = None;
        self.resolution = None;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store_texture(&mut self, texture: TextTexture, resolution: f64) {
        self.texture = Some(texture);
        self.resolution = Some(resolution);
        self.dirty = false;
    }

    /// 缓存纹理的分辨率；标签为脏时为 None。
    #[inline]
    pub fn resolution(&self) -> Option<f64> {
        if self.dirty { None } else { self.resolution }
    }

    #[inline]
    pub fn texture(&self) -> Option<&TextTexture> {
        if self.dirty {
            None
        } else {
            self.texture.as_ref()
        }
    }

    /// 纹理像素尺寸（宽, 高）。
    pub fn extent(&self) -> Option<(u32, u32)> {
        self.texture()
            .map(|texture| (texture.width, texture.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionKind {
    Aligned,
    AxisConstrained(Axis),
    Angular,
}

impl DimensionKind {
    pub fn describe(&self) -> &'static str {
        match self {
            DimensionKind::Aligned => "aligned",
            DimensionKind::AxisConstrained(_) => "axis",
            DimensionKind::Angular => "angular",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub a: PointRef,
    pub b: PointRef,
    /// 角度标注的终点；此时 `b` 为角顶点。
    pub c: Option<PointRef>,
    pub offset: f64,
    pub leader_gap: f64,
    /// 绕测量方向的附加旋转（弧度）。
    pub rotation: f64,
    /// 角度标注圆弧半径。
    pub radius: f64,
    /// `Auto` 时使用样式中的视图平面。
    pub view_plane: ViewPlane,
    pub style: DimensionStyle,
    #[serde(default)]
    pub style_ref: StyleRef,
    pub visible: bool,
    /// 仅在指定相机下可见；None 表示所有视图可见。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_in_view: Option<String>,
    #[serde(default)]
    pub label: TextLabel,
}

impl Dimension {
    fn with_kind(kind: DimensionKind, a: PointRef, b: PointRef, c: Option<PointRef>) -> Self {
        Self {
            kind,
            a,
            b,
            c,
            offset: 0.5,
            leader_gap: 0.1,
            rotation: 0.0,
            radius: 1.0,
            view_plane: ViewPlane::Auto,
            style: DimensionStyle::default(),
            style_ref: StyleRef::Inline,
            visible: true,
            visible_in_view: None,
            label: TextLabel::default(),
        }
    }

    pub fn aligned(a: PointRef, b: PointRef) -> Self {
        Self::with_kind(DimensionKind::Aligned, a, b, None)
    }

    pub fn axis(axis: Axis, a: PointRef, b: PointRef) -> Self {
        Self::with_kind(DimensionKind::AxisConstrained(axis), a, b, None)
    }

    /// 角度标注：`vertex` 为角顶点。
    pub fn angular(a: PointRef, vertex: PointRef, c: PointRef, radius: f64) -> Self {
        let mut dimension = Self::with_kind(DimensionKind::Angular, a, vertex, Some(c));
        dimension.radius = radius;
        dimension
    }

    pub fn with_offset(mut self, offset: f64, leader_gap: f64) -> Self {
        self.offset = offset;
        self.leader_gap = leader_gap;
        self
    }

    pub fn with_style(mut self, style: DimensionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_style_ref(mut self, style_ref: StyleRef) -> Self {
        self.style_ref = style_ref;
        self
    }

    pub fn with_view_plane(mut self, view_plane: ViewPlane) -> Self {
        self.view_plane = view_plane;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// 条目自身的视图平面优先，`Auto` 时取样式中的设置。
    pub fn effective_view_plane(&self, style: &DimensionStyle) -> ViewPlane {
        if self.view_plane != ViewPlane::Auto {
            self.view_plane
        } else {
            style.view_plane
        }
    }
}

/// 引线注释：锚点、相对偏移、文字卡片旋转（XYZ 欧拉角）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub anchor: PointRef,
    pub offset: DVec3,
    pub rotation: DVec3,
    pub style: DimensionStyle,
    #[serde(default)]
    pub style_ref: StyleRef,
    pub visible: bool,
    pub label: TextLabel,
}

impl Annotation {
    pub fn new(anchor: PointRef, offset: DVec3, text: impl Into<String>) -> Self {
        Self {
            anchor,
            offset,
            rotation: DVec3::ZERO,
            style: DimensionStyle::default(),
            style_ref: StyleRef::Inline,
            visible: true,
            label: TextLabel::new(text),
        }
    }

    pub fn with_style(mut self, style: DimensionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_style_ref(mut self, style_ref: StyleRef) -> Self {
        self.style_ref = style_ref;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub a: usize,
    pub b: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineGroup {
    pub object: ObjectId,
    pub segments: Vec<Segment>,
    pub style: LineStyle,
    #[serde(default)]
    pub style_ref: StyleRef,
    pub visible: bool,
}

impl LineGroup {
    pub fn new<I>(object: ObjectId, segments: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        Self {
            object,
            segments: segments
                .into_iter()
                .map(|(a, b)| Segment { a, b })
                .collect(),
            style: LineStyle::default(),
            style_ref: StyleRef::Inline,
            visible: true,
        }
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_style_ref(mut self, style_ref: StyleRef) -> Self {
        self.style_ref = style_ref;
        self
    }
}

/// 物体表，负责将点引用解析为世界坐标。
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ObjectTable {
    entries: Vec<(ObjectId, SceneObject)>,
}

impl ObjectTable {
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.entries
            .iter()
            .find_map(|(entry_id, object)| (*entry_id == id).then_some(object))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.entries
            .iter_mut()
            .find_map(|(entry_id, object)| (*entry_id == id).then_some(object))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.entries.iter().map(|(id, object)| (*id, object))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, id: ObjectId, object: SceneObject) {
        self.entries.push((id, object));
    }

    /// 点引用的世界坐标：顶点经物体世界矩阵变换，原点引用取物体位置。
    pub fn world_point(&self, point: PointRef) -> Result<DVec3, DocumentError> {
        let object = self
            .get(point.object)
            .ok_or(DocumentError::ObjectNotFound(point.object.get()))?;
        match point.vertex {
            VertexRef::Origin => Ok(object.location()),
            VertexRef::Vertex(index) => {
                object
                    .world_vertex(index)
                    .ok_or(DocumentError::VertexOutOfRange {
                        index,
                        len: object.vertices().len(),
                    })
            }
        }
    }
}

/// 可变条目集合的借用视图，与只读物体表同时使用。
pub struct ItemsMut<'a> {
    pub dimensions: &'a mut [(ItemId, Dimension)],
    pub annotations: &'a mut [(ItemId, Annotation)],
    pub line_groups: &'a mut [(ItemId, LineGroup)],
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Document {
    objects: ObjectTable,
    dimensions: Vec<(ItemId, Dimension)>,
    annotations: Vec<(ItemId, Annotation)>,
    line_groups: Vec<(ItemId, LineGroup)>,
    next_object_id: u64,
    next_item_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId::new(self.next_object_id);
        self.next_object_id += 1;
        self.objects.push(id, object);
        id
    }

    #[inline]
    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    #[inline]
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    #[inline]
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    /// 添加尺寸标注。端点引用相同（或角度标注缺少第三点）时拒绝。
    pub fn add_dimension(&mut self, dimension: Dimension) -> Result<ItemId, DocumentError> {
        self.ensure_object(dimension.a.object)?;
        self.ensure_object(dimension.b.object)?;
        if dimension.a == dimension.b {
            return Err(DocumentError::DegenerateDimension);
        }
        if matches!(dimension.kind, DimensionKind::Angular) {
            let c = dimension.c.ok_or(DocumentError::MissingThirdPoint)?;
            self.ensure_object(c.object)?;
            if c == dimension.b {
                return Err(DocumentError::DegenerateDimension);
            }
        }
        let id = self.next_item();
        self.dimensions.push((id, dimension));
        Ok(id)
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<ItemId, DocumentError> {
        self.ensure_object(annotation.anchor.object)?;
        let id = self.next_item();
        self.annotations.push((id, annotation));
        Ok(id)
    }

    pub fn add_line_group(&mut self, group: LineGroup) -> Result<ItemId, DocumentError> {
        self.ensure_object(group.object)?;
        let id = self.next_item();
        self.line_groups.push((id, group));
        Ok(id)
    }

    pub fn remove_dimension(&mut self, id: ItemId) -> Option<Dimension> {
        let index = self.dimensions.iter().position(|(item, _)| *item == id)?;
        Some(self.dimensions.remove(index).1)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (ItemId, &Dimension)> {
        self.dimensions.iter().map(|(id, dimension)| (*id, dimension))
    }

    pub fn dimension(&self, id: ItemId) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find_map(|(item, dimension)| (*item == id).then_some(dimension))
    }

    pub fn dimension_mut(&mut self, id: ItemId) -> Option<&mut Dimension> {
        self.dimensions
            .iter_mut()
            .find_map(|(item, dimension)| (*item == id).then_some(dimension))
    }

    pub fn annotations(&self) -> impl Iterator<Item = (ItemId, &Annotation)> {
        self.annotations.iter().map(|(id, annotation)| (*id, annotation))
    }

    pub fn annotation_mut(&mut self, id: ItemId) -> Option<&mut Annotation> {
        self.annotations
            .iter_mut()
            .find_map(|(item, annotation)| (*item == id).then_some(annotation))
    }

    pub fn line_groups(&self) -> impl Iterator<Item = (ItemId, &LineGroup)> {
        self.line_groups.iter().map(|(id, group)| (*id, group))
    }

    pub fn line_group_mut(&mut self, id: ItemId) -> Option<&mut LineGroup> {
        self.line_groups
            .iter_mut()
            .find_map(|(item, group)| (*item == id).then_some(group))
    }

    /// 同时取得只读物体表与可变条目，供逐帧绘制更新文字缓存。
    pub fn split_mut(&mut self) -> (&ObjectTable, ItemsMut<'_>) {
        (
            &self.objects,
            ItemsMut {
                dimensions: &mut self.dimensions,
                annotations: &mut self.annotations,
                line_groups: &mut self.line_groups,
            },
        )
    }

    pub fn item_count(&self) -> usize {
        self.dimensions.len() + self.annotations.len() + self.line_groups.len()
    }

    fn ensure_object(&self, id: ObjectId) -> Result<(), DocumentError> {
        if self.objects.get(id).is_some() {
            Ok(())
        } else {
            Err(DocumentError::ObjectNotFound(id.get()))
        }
    }

    fn next_item(&mut self) -> ItemId {
        let id = ItemId::new(self.next_item_id);
        self.next_item_id += 1;
        id
    }
}
