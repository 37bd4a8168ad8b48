//! 绘制后端接口。
//!
//! 渲染器只产出按图元类型分组的批次，着色器编译与 GPU 提交由宿主实现。

use archdim_core::document::TextTexture;
use glam::DVec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Lines,
    Triangles,
    TriangleFan,
    /// 每个顶点附带累计弧长，供虚线着色。
    DashedLines,
}

impl Primitive {
    pub fn describe(self) -> &'static str {
        match self {
            Primitive::Points => "点",
            Primitive::Lines => "线段",
            Primitive::Triangles => "三角形",
            Primitive::TriangleFan => "文字卡片",
            Primitive::DashedLines => "虚线",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    LessEqual,
    /// 只绘制被遮挡的部分（隐藏线）。
    Greater,
}

/// 一次绘制调用的全部数据。
#[derive(Debug, Clone)]
pub struct DrawBatch<'a> {
    pub primitive: Primitive,
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub arc_lengths: Vec<f32>,
    pub color: [f32; 4],
    pub thickness: f32,
    pub viewport: [f32; 2],
    pub depth: DepthMode,
    pub depth_offset: f32,
    pub dash_scale: f32,
    pub screen_space_dashes: bool,
    pub texture: Option<&'a TextTexture>,
}

impl<'a> DrawBatch<'a> {
    pub fn new(primitive: Primitive, color: [f32; 4], thickness: f32, viewport: [f32; 2]) -> Self {
        Self {
            primitive,
            positions: Vec::new(),
            uvs: Vec::new(),
            arc_lengths: Vec::new(),
            color,
            thickness,
            viewport,
            depth: DepthMode::LessEqual,
            depth_offset: 0.0,
            dash_scale: 0.0,
            screen_space_dashes: false,
            texture: None,
        }
    }

    pub fn with_positions<I>(mut self, positions: I) -> Self
    where
        I: IntoIterator<Item = DVec3>,
    {
        self.positions = positions
            .into_iter()
            .map(|point| point.as_vec3().to_array())
            .collect();
        self
    }

    pub fn with_depth(mut self, depth: DepthMode, depth_offset: f32) -> Self {
        self.depth = depth;
        self.depth_offset = depth_offset;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub trait DrawBackend {
    fn draw(&mut self, batch: &DrawBatch<'_>);
}

/// 已提交批次的拥有型副本，纹理只保留尺寸。
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub primitive: Primitive,
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub arc_lengths: Vec<f32>,
    pub color: [f32; 4],
    pub thickness: f32,
    pub depth: DepthMode,
    pub depth_offset: f32,
    pub dash_scale: f32,
    pub screen_space_dashes: bool,
    pub texture_size: Option<(u32, u32)>,
}

impl RecordedBatch {
    /// 线段批次按顶点两两成对返回。
    pub fn segments(&self) -> impl Iterator<Item = ([f32; 3], [f32; 3])> + '_ {
        self.positions.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}

/// 记录所有批次的后端，用于 CLI 演示与测试。
#[derive(Debug, Default)]
pub struct RecordingBackend {
    batches: Vec<RecordedBatch>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[RecordedBatch] {
        &self.batches
    }

    pub fn of_kind(&self, primitive: Primitive) -> impl Iterator<Item = &RecordedBatch> {
        self.batches
            .iter()
            .filter(move |batch| batch.primitive == primitive)
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

impl DrawBackend for RecordingBackend {
    fn draw(&mut self, batch: &DrawBatch<'_>) {
        self.batches.push(RecordedBatch {
            primitive: batch.primitive,
            positions: batch.positions.clone(),
            uvs: batch.uvs.clone(),
            arc_lengths: batch.arc_lengths.clone(),
            color: batch.color,
            thickness: batch.thickness,
            depth: batch.depth,
            depth_offset: batch.depth_offset,
            dash_scale: batch.dash_scale,
            screen_space_dashes: batch.screen_space_dashes,
            texture_size: batch
                .texture
                .map(|texture| (texture.width, texture.height)),
        });
    }
}
