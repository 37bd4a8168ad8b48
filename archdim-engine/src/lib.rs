pub mod annotation;
pub mod billboard;
pub mod dimension;
pub mod endcap;
pub mod normal;

pub mod errors {
    use archdim_core::document::DocumentError;
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq)]
    pub enum BuildError {
        #[error("object with id {0} not found")]
        MissingObject(u64),
        #[error("vertex {index} out of range (object has {len} vertices)")]
        VertexOutOfRange { index: usize, len: usize },
        #[error("measured points coincide")]
        DegenerateSpan,
        #[error("angular dimension requires a third point")]
        MissingThirdPoint,
    }

    impl From<DocumentError> for BuildError {
        fn from(error: DocumentError) -> Self {
            match error {
                DocumentError::ObjectNotFound(id) => BuildError::MissingObject(id),
                DocumentError::VertexOutOfRange { index, len } => {
                    BuildError::VertexOutOfRange { index, len }
                }
                DocumentError::MissingThirdPoint => BuildError::MissingThirdPoint,
                DocumentError::DegenerateDimension | DocumentError::DegenerateFace => {
                    BuildError::DegenerateSpan
                }
            }
        }
    }
}

pub mod frame {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    use archdim_core::units::UnitSettings;
    use glam::{DQuat, DVec3};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Projection {
        Perspective,
        Orthographic,
    }

    /// 活动相机：名称用于"仅在该视图可见"判定，位置与旋转用于渲染模式。
    #[derive(Debug, Clone, PartialEq)]
    pub struct CameraInfo {
        pub name: String,
        pub location: DVec3,
        pub rotation: DQuat,
    }

    /// 预设视角，对应常见的正交视图。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ViewPreset {
        Top,
        Front,
        Right,
        Iso,
    }

    impl ViewPreset {
        pub fn parse(name: &str) -> Option<Self> {
            match name.trim().to_ascii_lowercase().as_str() {
                "top" => Some(ViewPreset::Top),
                "front" => Some(ViewPreset::Front),
                "right" => Some(ViewPreset::Right),
                "iso" => Some(ViewPreset::Iso),
                _ => None,
            }
        }

        /// 视图旋转：旋转后的 +Z 指向观察者。
        pub fn rotation(self) -> DQuat {
            match self {
                ViewPreset::Top => DQuat::IDENTITY,
                ViewPreset::Front => DQuat::from_rotation_x(FRAC_PI_2),
                ViewPreset::Right => DQuat::from_rotation_z(FRAC_PI_2) * DQuat::from_rotation_x(FRAC_PI_2),
                ViewPreset::Iso => {
                    DQuat::from_rotation_z(FRAC_PI_4)
                        * DQuat::from_rotation_x((1.0_f64 / 3.0_f64.sqrt()).acos())
                }
            }
        }
    }

    /// 单帧只读上下文，构建器与渲染器只通过它读取视图状态。
    #[derive(Debug, Clone)]
    pub struct FrameContext {
        pub view_rotation: DQuat,
        pub projection: Projection,
        pub viewport: [f32; 2],
        pub camera: Option<CameraInfo>,
        /// 离线渲染：视线取相机位置，文字朝向取相机旋转。
        pub render_mode: bool,
        pub show_dimension_text: bool,
        pub edit_mode: bool,
        pub units: UnitSettings,
    }

    impl Default for FrameContext {
        fn default() -> Self {
            Self {
                view_rotation: DQuat::IDENTITY,
                projection: Projection::Perspective,
                viewport: [1280.0, 720.0],
                camera: None,
                render_mode: false,
                show_dimension_text: true,
                edit_mode: false,
                units: UnitSettings::default(),
            }
        }
    }

    impl FrameContext {
        pub fn from_preset(preset: ViewPreset) -> Self {
            Self {
                view_rotation: preset.rotation(),
                ..Self::default()
            }
        }

        pub fn with_units(mut self, units: UnitSettings) -> Self {
            self.units = units;
            self
        }

        pub fn with_camera(mut self, camera: CameraInfo) -> Self {
            self.camera = Some(camera);
            self
        }

        #[inline]
        pub fn is_orthographic(&self) -> bool {
            matches!(self.projection, Projection::Orthographic)
        }

        pub fn active_camera_name(&self) -> Option<&str> {
            self.camera.as_ref().map(|camera| camera.name.as_str())
        }

        fn render_camera(&self) -> Option<&CameraInfo> {
            if self.render_mode {
                self.camera.as_ref()
            } else {
                None
            }
        }

        /// 视线方向（单位向量）。
        pub fn look_vector(&self) -> DVec3 {
            self.render_camera()
                .and_then(|camera| camera.location.try_normalize())
                .unwrap_or_else(|| self.view_rotation * DVec3::Z)
        }

        /// 文字卡片翻转判定使用的旋转。
        pub fn billboard_rotation(&self) -> DQuat {
            self.render_camera()
                .map(|camera| camera.rotation)
                .unwrap_or(self.view_rotation)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn assert_close(a: DVec3, b: DVec3) {
            assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
        }

        #[test]
        fn presets_point_view_axis_at_observer() {
            assert_close(FrameContext::from_preset(ViewPreset::Top).look_vector(), DVec3::Z);
            assert_close(
                FrameContext::from_preset(ViewPreset::Front).look_vector(),
                DVec3::NEG_Y,
            );
            assert_close(FrameContext::from_preset(ViewPreset::Right).look_vector(), DVec3::X);

            let iso = FrameContext::from_preset(ViewPreset::Iso).look_vector();
            let third = 1.0 / 3.0_f64.sqrt();
            assert_close(iso, DVec3::new(third, -third, third));
            assert_eq!(ViewPreset::parse(" ISO "), Some(ViewPreset::Iso));
            assert_eq!(ViewPreset::parse("bottom"), None);
        }

        #[test]
        fn render_mode_uses_camera_location() {
            let camera = CameraInfo {
                name: "Camera".to_string(),
                location: DVec3::new(0.0, -10.0, 0.0),
                rotation: DQuat::from_rotation_x(FRAC_PI_2),
            };
            let mut frame = FrameContext::default().with_camera(camera);
            assert_close(frame.look_vector(), DVec3::Z);
            assert_eq!(frame.billboard_rotation(), DQuat::IDENTITY);

            frame.render_mode = true;
            assert_close(frame.look_vector(), DVec3::NEG_Y);
            assert_eq!(frame.billboard_rotation(), DQuat::from_rotation_x(FRAC_PI_2));
            assert_eq!(frame.active_camera_name(), Some("Camera"));
        }
    }
}
