use archdim_core::document::{
    Annotation, Dimension, Document, DocumentError, ItemId, LineGroup, ObjectId, PointRef,
    SceneObject,
};
use archdim_core::geometry::Axis;
use archdim_core::style::{DimensionStyle, EndcapKind, LineStyle, StyleRef, StyleRegistry};
use glam::{DMat4, DVec3};
use tracing::debug;

/// 演示场景中创建的条目 ID。
#[derive(Debug, Clone, Copy)]
pub struct DemoItems {
    pub cube: ObjectId,
    pub aligned: ItemId,
    pub height: ItemId,
    pub corner_angle: ItemId,
    pub note: ItemId,
    pub outline: ItemId,
}

/// 单位立方体：底面 0-3 逆时针，顶面 4-7。
pub fn unit_cube(name: &str, transform: DMat4) -> Result<SceneObject, DocumentError> {
    let mut cube = SceneObject::mesh(
        name,
        transform,
        [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(1.0, 1.0, 1.0),
            DVec3::new(0.0, 1.0, 1.0),
        ],
    );
    for face in [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ] {
        cube.add_face(face)?;
    }
    Ok(cube)
}

/// 构建内置示例：立方体上的对齐、轴向、角度标注，一条引线注释和顶面轮廓线组。
pub fn populate_demo(
    document: &mut Document,
    styles: &mut StyleRegistry,
) -> Result<DemoItems, DocumentError> {
    styles.insert_dimension_style(
        "architectural",
        DimensionStyle::default().with_endcaps(EndcapKind::Tee, EndcapKind::Tee),
    );
    styles.insert_line_style(
        "outline",
        LineStyle {
            line_weight: 2.0,
            is_outline: true,
            draw_hidden: true,
            ..LineStyle::default()
        },
    );

    let cube = document.add_object(unit_cube("Cube", DMat4::IDENTITY)?);
    let vertex = |index| PointRef::vertex(cube, index);

    let aligned = document.add_dimension(
        Dimension::aligned(vertex(0), vertex(1))
            .with_offset(0.5, 0.1)
            .with_style_ref(StyleRef::named("architectural")),
    )?;
    let height = document.add_dimension(
        Dimension::axis(Axis::Z, vertex(1), vertex(5)).with_offset(0.3, 0.05),
    )?;
    let corner_angle =
        document.add_dimension(Dimension::angular(vertex(1), vertex(0), vertex(3), 0.4))?;

    let note_style = DimensionStyle::default().with_endcaps(EndcapKind::Dot, EndcapKind::None);
    let note = document.add_annotation(
        Annotation::new(vertex(6), DVec3::new(0.5, 0.5, 0.5), "混凝土块").with_style(note_style),
    )?;

    let outline = document.add_line_group(
        LineGroup::new(cube, [(4, 5), (5, 6), (6, 7), (7, 4)])
            .with_style_ref(StyleRef::named("outline")),
    )?;

    let items = DemoItems {
        cube,
        aligned,
        height,
        corner_angle,
        note,
        outline,
    };
    debug!(
        cube = items.cube.get(),
        dimensions = 3,
        annotations = 1,
        line_groups = 1,
        "已构建演示场景"
    );
    Ok(items)
}
