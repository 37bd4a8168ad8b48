use std::f64::consts::PI;

use archdim_core::document::{
    Annotation, Dimension, Document, LineGroup, ObjectId, PointRef, SceneObject, TextTexture,
};
use archdim_core::style::{
    DimensionStyle, LineStyle, StyleRef, StyleRegistry, ViewPlane, display_color,
};
use archdim_engine::frame::{CameraInfo, FrameContext};
use archdim_render::backend::{DepthMode, Primitive, RecordedBatch, RecordingBackend};
use archdim_render::renderer::{EDIT_MODE_ALPHA, Renderer};
use archdim_render::text::{FixedAdvanceRasterizer, TextRasterizer};
use glam::{DMat4, DQuat, DVec3};

fn close(a: [f32; 3], b: [f32; 3]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
}

fn has_segment(batches: &[&RecordedBatch], a: [f32; 3], b: [f32; 3]) -> bool {
    batches.iter().any(|batch| {
        batch
            .segments()
            .any(|(s, e)| (close(s, a) && close(e, b)) || (close(s, b) && close(e, a)))
    })
}

fn renderer() -> Renderer<RecordingBackend, FixedAdvanceRasterizer> {
    Renderer::new(RecordingBackend::new(), FixedAdvanceRasterizer::default())
}

fn two_point_document() -> (Document, ObjectId) {
    let mut document = Document::new();
    let id = document.add_object(SceneObject::mesh(
        "Beam",
        DMat4::IDENTITY,
        [DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0)],
    ));
    (document, id)
}

fn aligned(id: ObjectId) -> Dimension {
    Dimension::aligned(PointRef::vertex(id, 0), PointRef::vertex(id, 1))
        .with_offset(0.5, 0.1)
        .with_view_plane(ViewPlane::XY)
}

#[test]
fn aligned_dimension_end_to_end() {
    let (mut document, id) = two_point_document();
    let item = document.add_dimension(aligned(id)).expect("添加标注失败");

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &StyleRegistry::new(), &FrameContext::default());
    assert_eq!(stats.dimensions_drawn, 1);
    assert_eq!(stats.labels_rasterized, 1);

    let dimension = document.dimension(item).expect("标注不存在");
    assert_eq!(dimension.label.text(), "3.00 m");
    assert!(!dimension.label.is_dirty());

    let backend = renderer.backend();
    let lines: Vec<_> = backend.of_kind(Primitive::Lines).collect();
    assert!(has_segment(&lines, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]));
    let overshoot = 0.005 * DimensionStyle::default().endcap_size as f32;
    assert!(has_segment(&lines, [0.0, 0.1, 0.0], [0.0, 0.5 + overshoot, 0.0]));
    assert!(has_segment(&lines, [3.0, 0.1, 0.0], [3.0, 0.5 + overshoot, 0.0]));

    let cards: Vec<_> = backend.of_kind(Primitive::TriangleFan).collect();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].texture_size, Some((72, 24)));
    assert_eq!(cards[0].uvs, vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]);
    let expected = display_color(DimensionStyle::default().color);
    assert_eq!(lines[0].color, expected);
}

#[test]
fn labels_are_rasterized_only_when_text_changes() {
    let (mut document, id) = two_point_document();
    document.add_dimension(aligned(id)).expect("添加标注失败");
    let styles = StyleRegistry::new();
    let frame = FrameContext::default();
    let mut renderer = renderer();

    assert_eq!(renderer.draw_document(&mut document, &styles, &frame).labels_rasterized, 1);
    assert_eq!(renderer.draw_document(&mut document, &styles, &frame).labels_rasterized, 0);

    // 物体缩放改变测量值，文字重新栅格化
    let object = document.object_mut(id).expect("物体不存在");
    object.transform = DMat4::from_scale(DVec3::splat(2.0));
    assert_eq!(renderer.draw_document(&mut document, &styles, &frame).labels_rasterized, 1);
    let (_, dimension) = document.dimensions().next().expect("标注不存在");
    assert_eq!(dimension.label.text(), "6.00 m");
}

fn card_width(renderer: &Renderer<RecordingBackend, FixedAdvanceRasterizer>) -> f32 {
    let card = renderer
        .backend()
        .of_kind(Primitive::TriangleFan)
        .next()
        .expect("缺少文字卡片");
    let [x0, y0, z0] = card.positions[0];
    let [x3, y3, z3] = card.positions[3];
    ((x3 - x0).powi(2) + (y3 - y0).powi(2) + (z3 - z0).powi(2)).sqrt()
}

#[test]
fn style_resolution_change_rerasterizes_label() {
    let (mut document, id) = two_point_document();
    document
        .add_dimension(aligned(id).with_style_ref(StyleRef::named("plan")))
        .expect("添加标注失败");
    let mut registry = StyleRegistry::new();
    registry.insert_dimension_style("plan", DimensionStyle::default());
    let frame = FrameContext::default();
    let mut renderer = renderer();

    let stats = renderer.draw_document(&mut document, &registry, &frame);
    assert_eq!(stats.labels_rasterized, 1);
    let coarse = card_width(&renderer);

    registry.insert_dimension_style(
        "plan",
        DimensionStyle {
            text_resolution: 144.0,
            ..DimensionStyle::default()
        },
    );
    renderer.backend_mut().clear();
    let stats = renderer.draw_document(&mut document, &registry, &frame);
    assert_eq!(stats.labels_rasterized, 1);

    let card = renderer
        .backend()
        .of_kind(Primitive::TriangleFan)
        .next()
        .expect("缺少文字卡片");
    assert_eq!(card.texture_size, Some((144, 48)));
    // 分辨率翻倍，纹理像素翻倍，卡片尺寸不变
    assert!((card_width(&renderer) - coarse).abs() < 1e-5);
}

#[test]
fn dangling_style_reference_falls_back_to_inline_record() {
    let (mut document, id) = two_point_document();
    let inline = DimensionStyle {
        color: [1.0, 0.0, 0.0, 1.0],
        ..DimensionStyle::default()
    };
    document
        .add_dimension(
            aligned(id)
                .with_style(inline)
                .with_style_ref(StyleRef::named("missing")),
        )
        .expect("添加标注失败");

    let mut registry = StyleRegistry::new();
    registry.insert_dimension_style(
        "blue",
        DimensionStyle {
            color: [0.0, 0.0, 1.0, 1.0],
            ..DimensionStyle::default()
        },
    );

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &registry, &FrameContext::default());
    assert_eq!(stats.dimensions_drawn, 1);
    let lines = renderer.backend().of_kind(Primitive::Lines).next().expect("缺少线段批次");
    assert_eq!(lines.color, [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn named_style_visibility_hides_item() {
    let (mut document, id) = two_point_document();
    document
        .add_dimension(aligned(id).with_style_ref(StyleRef::named("hidden")))
        .expect("添加标注失败");
    let mut registry = StyleRegistry::new();
    registry.insert_dimension_style(
        "hidden",
        DimensionStyle {
            visible: false,
            ..DimensionStyle::default()
        },
    );

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &registry, &FrameContext::default());
    assert_eq!(stats.dimensions_drawn, 0);
    assert_eq!(stats.skipped(), 0);
    assert!(renderer.backend().batches().is_empty());
}

#[test]
fn malformed_items_are_skipped_without_aborting_the_frame() {
    let (mut document, id) = two_point_document();
    document
        .add_dimension(Dimension::aligned(PointRef::vertex(id, 0), PointRef::vertex(id, 7)))
        .expect("添加标注失败");
    document.add_dimension(aligned(id)).expect("添加标注失败");
    document
        .add_annotation(Annotation::new(PointRef::vertex(id, 4), DVec3::Y, "悬空"))
        .expect("添加注释失败");

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &StyleRegistry::new(), &FrameContext::default());
    assert_eq!(stats.dimensions_skipped, 1);
    assert_eq!(stats.annotations_skipped, 1);
    assert_eq!(stats.dimensions_drawn, 1);
}

#[test]
fn hidden_text_still_draws_lines() {
    let (mut document, id) = two_point_document();
    document.add_dimension(aligned(id)).expect("添加标注失败");
    let frame = FrameContext {
        show_dimension_text: false,
        ..FrameContext::default()
    };

    let mut renderer = renderer();
    renderer.draw_document(&mut document, &StyleRegistry::new(), &frame);
    assert_eq!(renderer.backend().of_kind(Primitive::TriangleFan).count(), 0);
    assert_eq!(renderer.backend().of_kind(Primitive::Lines).count(), 1);
}

struct ZeroSize;

impl TextRasterizer for ZeroSize {
    fn rasterize(&mut self, _: &str, _: u32, _: f64) -> Option<TextTexture> {
        None
    }
}

#[test]
fn failed_rasterization_keeps_geometry() {
    let (mut document, id) = two_point_document();
    let item = document.add_dimension(aligned(id)).expect("添加标注失败");

    let mut renderer = Renderer::new(RecordingBackend::new(), ZeroSize);
    let stats = renderer.draw_document(&mut document, &StyleRegistry::new(), &FrameContext::default());
    assert_eq!(stats.dimensions_drawn, 1);
    assert_eq!(stats.labels_rasterized, 0);

    let label = &document.dimension(item).expect("标注不存在").label;
    assert!(label.is_dirty());
    assert!(label.texture().is_none());
    assert_eq!(renderer.backend().of_kind(Primitive::TriangleFan).count(), 0);
    let lines: Vec<_> = renderer.backend().of_kind(Primitive::Lines).collect();
    assert!(has_segment(&lines, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]));
}

#[test]
fn card_seen_from_behind_is_mirrored() {
    let (mut document, id) = two_point_document();
    document.add_dimension(aligned(id)).expect("添加标注失败");
    let frame = FrameContext {
        view_rotation: DQuat::from_rotation_y(PI),
        ..FrameContext::default()
    };

    let mut renderer = renderer();
    renderer.draw_document(&mut document, &StyleRegistry::new(), &frame);
    let card = renderer
        .backend()
        .of_kind(Primitive::TriangleFan)
        .next()
        .expect("缺少文字卡片");
    assert_eq!(card.uvs, vec![[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]);
}

#[test]
fn camera_restricted_dimension_follows_active_camera() {
    let (mut document, id) = two_point_document();
    let mut dimension = aligned(id);
    dimension.visible_in_view = Some("Section A".to_string());
    document.add_dimension(dimension).expect("添加标注失败");
    let styles = StyleRegistry::new();

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &styles, &FrameContext::default());
    assert_eq!(stats.dimensions_drawn, 0);

    let frame = FrameContext::default().with_camera(CameraInfo {
        name: "Section A".to_string(),
        location: DVec3::new(0.0, 0.0, 10.0),
        rotation: DQuat::IDENTITY,
    });
    let stats = renderer.draw_document(&mut document, &styles, &frame);
    assert_eq!(stats.dimensions_drawn, 1);
}

#[test]
fn line_group_passes_follow_style() {
    let mut document = Document::new();
    let id = document.add_object(SceneObject::mesh(
        "Outline",
        DMat4::IDENTITY,
        [DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0)],
    ));
    let style = LineStyle {
        draw_dashed: true,
        draw_hidden: true,
        hidden_weight: 0.5,
        ..LineStyle::default()
    };
    document
        .add_line_group(LineGroup::new(id, [(0, 1), (1, 2), (2, 9)]).with_style(style))
        .expect("添加线组失败");
    let frame = FrameContext {
        edit_mode: true,
        ..FrameContext::default()
    };

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &StyleRegistry::new(), &frame);
    assert_eq!(stats.line_groups_drawn, 1);

    let dashed: Vec<_> = renderer.backend().of_kind(Primitive::DashedLines).collect();
    assert_eq!(dashed.len(), 2);
    let visible = dashed[0];
    // 无效索引的线段被跳过
    assert_eq!(visible.positions.len(), 4);
    assert_eq!(visible.arc_lengths, vec![0.0, 1.0, 1.0, 2.0]);
    assert_eq!(visible.color[3], EDIT_MODE_ALPHA);
    assert_eq!(visible.depth, DepthMode::LessEqual);
    assert!((visible.depth_offset + 0.4 / 1000.0).abs() < 1e-7);

    let hidden = dashed[1];
    assert_eq!(hidden.depth, DepthMode::Greater);
    assert_eq!(hidden.thickness, 0.5);

    let corners = renderer
        .backend()
        .of_kind(Primitive::Points)
        .next()
        .expect("缺少拐角补点");
    assert_eq!(corners.positions.len(), 4);
}

#[test]
fn angular_dimension_draws_arc_and_label() {
    let mut document = Document::new();
    let id = document.add_object(SceneObject::mesh(
        "Corner",
        DMat4::IDENTITY,
        [DVec3::X, DVec3::ZERO, DVec3::Y],
    ));
    let item = document
        .add_dimension(Dimension::angular(
            PointRef::vertex(id, 0),
            PointRef::vertex(id, 1),
            PointRef::vertex(id, 2),
            1.0,
        ))
        .expect("添加角度标注失败");

    let mut renderer = renderer();
    let stats = renderer.draw_document(&mut document, &StyleRegistry::new(), &FrameContext::default());
    assert_eq!(stats.dimensions_drawn, 1);
    assert_eq!(document.dimension(item).expect("标注不存在").label.text(), "90.00°");

    let lines = renderer.backend().of_kind(Primitive::Lines).next().expect("缺少圆弧");
    for position in &lines.positions {
        let radius = (position[0].powi(2) + position[1].powi(2)).sqrt();
        assert!((radius - 1.0).abs() < 1e-5);
    }
}
