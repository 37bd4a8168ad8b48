use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Axis;

/// 宿主存储的是线性颜色，绘制前需要撤销显示伽马。
pub const DISPLAY_GAMMA: f32 = 2.2;

/// 对 RGB 分量做 `c^(1/2.2)`，alpha 保持不变。
pub fn display_color(linear: [f32; 4]) -> [f32; 4] {
    let inverse = 1.0 / DISPLAY_GAMMA;
    [
        linear[0].max(0.0).powf(inverse),
        linear[1].max(0.0).powf(inverse),
        linear[2].max(0.0).powf(inverse),
        linear[3],
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndcapKind {
    None,
    /// 开口箭头（两条折线）。
    Line,
    /// 实心三角箭头。
    Triangle,
    /// 连接两翼端点的短横。
    Tee,
    Dot,
}

impl Default for EndcapKind {
    fn default() -> Self {
        EndcapKind::None
    }
}

/// 视图平面。`Auto` 表示跟随当前视角自动判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewPlane {
    Auto,
    XY,
    XZ,
    YZ,
}

impl Default for ViewPlane {
    fn default() -> Self {
        ViewPlane::Auto
    }
}

impl ViewPlane {
    /// 平面法线所在轴：XY→Z，XZ→Y，YZ→X。
    pub fn normal_axis(self) -> Option<Axis> {
        match self {
            ViewPlane::Auto => None,
            ViewPlane::XY => Some(Axis::Z),
            ViewPlane::XZ => Some(Axis::Y),
            ViewPlane::YZ => Some(Axis::X),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

impl Default for TextAlignment {
    fn default() -> Self {
        TextAlignment::Center
    }
}

/// 文字相对引线端点的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    Middle,
    Bottom,
}

impl Default for TextPosition {
    fn default() -> Self {
        TextPosition::Top
    }
}

/// 尺寸标注与注释共用的样式记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionStyle {
    pub visible: bool,
    pub color: [f32; 4],
    pub line_weight: f32,
    pub endcap_a: EndcapKind,
    pub endcap_b: EndcapKind,
    pub endcap_size: f64,
    /// 箭头半角（弧度）。
    pub endcap_arrow_angle: f64,
    pub font_size: f64,
    pub text_resolution: f64,
    pub view_plane: ViewPlane,
    pub text_alignment: TextAlignment,
    pub text_position: TextPosition,
}

impl Default for DimensionStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color: [0.0, 0.0, 0.0, 1.0],
            line_weight: 1.0,
            endcap_a: EndcapKind::None,
            endcap_b: EndcapKind::None,
            endcap_size: 4.0,
            endcap_arrow_angle: 15_f64.to_radians(),
            font_size: 18.0,
            text_resolution: 72.0,
            view_plane: ViewPlane::Auto,
            text_alignment: TextAlignment::Center,
            text_position: TextPosition::Top,
        }
    }
}

impl DimensionStyle {
    pub fn with_endcaps(mut self, endcap_a: EndcapKind, endcap_b: EndcapKind) -> Self {
        self.endcap_a = endcap_a;
        self.endcap_b = endcap_b;
        self
    }

    pub fn with_view_plane(mut self, view_plane: ViewPlane) -> Self {
        self.view_plane = view_plane;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    pub visible: bool,
    pub color: [f32; 4],
    pub line_weight: f32,
    /// 用户额外的深度偏移，叠加在线宽推导的偏移之上。
    pub depth_offset: f32,
    pub is_outline: bool,
    pub draw_hidden: bool,
    pub hidden_color: [f32; 4],
    pub hidden_weight: f32,
    pub draw_dashed: bool,
    pub dash_scale: f32,
    pub screen_space_dashes: bool,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color: [0.0, 0.0, 0.0, 1.0],
            line_weight: 1.0,
            depth_offset: 0.0,
            is_outline: false,
            draw_hidden: false,
            hidden_color: [0.2, 0.2, 0.2, 1.0],
            hidden_weight: 1.0,
            draw_dashed: false,
            dash_scale: 10.0,
            screen_space_dashes: false,
        }
    }
}

/// 样式绑定：使用自身内联样式，或按名称引用注册表中的样式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum StyleRef {
    Inline,
    Named(String),
}

impl Default for StyleRef {
    fn default() -> Self {
        StyleRef::Inline
    }
}

impl StyleRef {
    pub fn named(name: impl Into<String>) -> Self {
        StyleRef::Named(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            StyleRef::Inline => None,
            StyleRef::Named(name) => Some(name),
        }
    }
}

/// 样式的实际来源，便于日志区分悬空引用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleSource {
    Inline,
    Named,
    /// 引用名称未找到，回退到内联样式。
    Dangling,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedStyle<'a, T> {
    pub style: &'a T,
    pub source: StyleSource,
}

/// 解析样式绑定：命中则使用注册表记录，否则回退到内联记录。
pub fn resolve_style<'a, T>(
    inline: &'a T,
    binding: &StyleRef,
    lookup: impl FnOnce(&str) -> Option<&'a T>,
) -> ResolvedStyle<'a, T> {
    match binding {
        StyleRef::Inline => ResolvedStyle {
            style: inline,
            source: StyleSource::Inline,
        },
        StyleRef::Named(name) => match lookup(name) {
            Some(style) => ResolvedStyle {
                style,
                source: StyleSource::Named,
            },
            None => ResolvedStyle {
                style: inline,
                source: StyleSource::Dangling,
            },
        },
    }
}

/// 外部样式注册表接口（按名称弱引用）。
pub trait StyleProvider {
    fn dimension_style(&self, name: &str) -> Option<&DimensionStyle>;
    fn annotation_style(&self, name: &str) -> Option<&DimensionStyle>;
    fn line_style(&self, name: &str) -> Option<&LineStyle>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StyleRegistry {
    #[serde(default)]
    dimensions: HashMap<String, DimensionStyle>,
    #[serde(default)]
    annotations: HashMap<String, DimensionStyle>,
    #[serde(default)]
    lines: HashMap<String, LineStyle>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dimension_style(&mut self, name: impl Into<String>, style: DimensionStyle) {
        self.dimensions.insert(name.into(), style);
    }

    pub fn insert_annotation_style(&mut self, name: impl Into<String>, style: DimensionStyle) {
        self.annotations.insert(name.into(), style);
    }

    pub fn insert_line_style(&mut self, name: impl Into<String>, style: LineStyle) {
        self.lines.insert(name.into(), style);
    }

    /// 删除样式后，引用它的条目自动回退到内联样式。
    pub fn remove_dimension_style(&mut self, name: &str) -> Option<DimensionStyle> {
        self.dimensions.remove(name)
    }

    pub fn remove_annotation_style(&mut self, name: &str) -> Option<DimensionStyle> {
        self.annotations.remove(name)
    }

    pub fn remove_line_style(&mut self, name: &str) -> Option<LineStyle> {
        self.lines.remove(name)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len() + self.annotations.len() + self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StyleProvider for StyleRegistry {
    fn dimension_style(&self, name: &str) -> Option<&DimensionStyle> {
        self.dimensions.get(name)
    }

    fn annotation_style(&self, name: &str) -> Option<&DimensionStyle> {
        self.annotations.get(name)
    }

    fn line_style(&self, name: &str) -> Option<&LineStyle> {
        self.lines.get(name)
    }
}
