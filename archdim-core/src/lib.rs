pub mod document;
pub mod style;

pub mod geometry {
    use glam::{DMat4, DQuat, DVec3};
    use serde::{Deserialize, Serialize};

    /// 坐标轴，供主轴判定与轴向标注使用。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Axis {
        X,
        Y,
        Z,
    }

    impl Axis {
        pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

        #[inline]
        pub fn index(self) -> usize {
            match self {
                Axis::X => 0,
                Axis::Y => 1,
                Axis::Z => 2,
            }
        }

        /// 该轴方向的单位向量。
        #[inline]
        pub fn unit(self) -> DVec3 {
            match self {
                Axis::X => DVec3::X,
                Axis::Y => DVec3::Y,
                Axis::Z => DVec3::Z,
            }
        }

        #[inline]
        pub fn component(self, vector: DVec3) -> f64 {
            vector[self.index()]
        }

        pub fn name(self) -> &'static str {
            match self {
                Axis::X => "X",
                Axis::Y => "Y",
                Axis::Z => "Z",
            }
        }
    }

    /// 使用物体世界矩阵将局部坐标变换到世界坐标。
    #[inline]
    pub fn transform_point(matrix: &DMat4, local: DVec3) -> DVec3 {
        matrix.transform_point3(local)
    }

    #[inline]
    pub fn distance(a: DVec3, b: DVec3) -> f64 {
        a.distance(b)
    }

    /// 沿 `start -> end` 前进 `d` 的距离。两点重合时把 `d` 直接当作插值系数，
    /// 与旧版绘制逻辑保持一致。
    pub fn interpolate3d(start: DVec3, end: DVec3, d: f64) -> DVec3 {
        let span = end - start;
        let total = span.length();
        let factor = if total > 0.0 { d / total } else { d };
        start + span * factor
    }

    /// 绝对值最大的分量所在轴；相等时按 X > Y > Z 的优先级。
    pub fn dominant_axis(vector: DVec3) -> Axis {
        let abs = vector.abs();
        if abs.x >= abs.y && abs.x >= abs.z {
            Axis::X
        } else if abs.y >= abs.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// 标注端点的规范顺序：主轴为 X 时 X 较大者在前，主轴为 Y/Z 时较小者在前。
    /// 这一不对称决定了文字朝向，不能统一成同一方向。
    pub fn sort_points(a: DVec3, b: DVec3) -> (DVec3, DVec3) {
        let axis = dominant_axis(a - b);
        let (first, second) = (axis.component(a), axis.component(b));
        let swap = match axis {
            Axis::X => second > first,
            Axis::Y | Axis::Z => second < first,
        };
        if swap { (b, a) } else { (a, b) }
    }

    /// 仅保留指定轴分量，其余分量清零。
    #[inline]
    pub fn mask_to_axis(point: DVec3, axis: Axis) -> DVec3 {
        axis.unit() * axis.component(point)
    }

    /// 绕任意轴旋转向量；轴长度为零时原样返回。
    pub fn rotate_about_axis(vector: DVec3, axis: DVec3, angle: f64) -> DVec3 {
        match axis.try_normalize() {
            Some(axis) => DQuat::from_axis_angle(axis, angle) * vector,
            None => vector,
        }
    }

    /// Newell 法计算多边形法向量（已归一化），退化时返回 None。
    pub fn polygon_normal(points: &[DVec3]) -> Option<DVec3> {
        if points.len() < 3 {
            return None;
        }
        let mut normal = DVec3::ZERO;
        for (index, current) in points.iter().enumerate() {
            let next = points[(index + 1) % points.len()];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal.try_normalize()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::FRAC_PI_2;

        #[test]
        fn dominant_axis_prefers_earlier_axis_on_ties() {
            assert_eq!(dominant_axis(DVec3::new(1.0, -1.0, 0.5)), Axis::X);
            assert_eq!(dominant_axis(DVec3::new(0.2, -2.0, 2.0)), Axis::Y);
            assert_eq!(dominant_axis(DVec3::new(0.2, 0.1, -3.0)), Axis::Z);
            assert_eq!(dominant_axis(DVec3::ZERO), Axis::X);
        }

        #[test]
        fn sort_points_is_symmetric_under_swap() {
            let pairs = [
                (DVec3::new(0.0, 0.0, 0.0), DVec3::new(3.0, 0.0, 0.0)),
                (DVec3::new(1.0, 5.0, 0.0), DVec3::new(1.5, -2.0, 0.3)),
                (DVec3::new(0.0, 0.0, 4.0), DVec3::new(0.1, 0.2, -1.0)),
                (DVec3::new(2.0, 2.0, 0.0), DVec3::new(0.0, 0.0, 0.0)),
            ];
            for (a, b) in pairs {
                assert_eq!(sort_points(a, b), sort_points(b, a));
            }
        }

        #[test]
        fn sort_points_orders_x_descending_and_yz_ascending() {
            let (first, _) = sort_points(DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0));
            assert_eq!(first.x, 3.0);

            let (first, _) = sort_points(DVec3::new(0.0, 4.0, 0.0), DVec3::ZERO);
            assert_eq!(first.y, 0.0);

            let (first, _) = sort_points(DVec3::new(0.0, 0.0, 2.0), DVec3::new(0.0, 0.0, -2.0));
            assert_eq!(first.z, -2.0);
        }

        #[test]
        fn interpolate_handles_coincident_points() {
            let mid = interpolate3d(DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0), 2.0);
            assert!((mid - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-12);

            let same = interpolate3d(DVec3::ONE, DVec3::ONE, 0.5);
            assert_eq!(same, DVec3::ONE);
        }

        #[test]
        fn rotate_about_axis_ignores_zero_axis() {
            let rotated = rotate_about_axis(DVec3::X, DVec3::Z, FRAC_PI_2);
            assert!((rotated - DVec3::Y).length() < 1e-12);
            assert_eq!(rotate_about_axis(DVec3::X, DVec3::ZERO, 1.0), DVec3::X);
        }

        #[test]
        fn polygon_normal_follows_winding() {
            let quad = [
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ];
            let normal = polygon_normal(&quad).expect("quad has a normal");
            assert!((normal - DVec3::Z).length() < 1e-12);
            assert!(polygon_normal(&quad[..2]).is_none());
        }
    }
}

pub mod units {
    use serde::{Deserialize, Serialize};

    pub const METERS_TO_INCHES: f64 = 39.370_078_740_157_49;
    pub const MAX_DECIMAL_PRECISION: u8 = 5;
    pub const IMPERIAL_PRECISIONS: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UnitSystem {
        None,
        Metric,
        Imperial,
    }

    impl Default for UnitSystem {
        fn default() -> Self {
            UnitSystem::Metric
        }
    }

    /// 长度单位。`Adaptive` 在公制下按数值大小自动选择 m/cm/mm。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LengthUnit {
        Adaptive,
        Meters,
        Centimeters,
        Millimeters,
        Feet,
        Inches,
    }

    impl Default for LengthUnit {
        fn default() -> Self {
            LengthUnit::Adaptive
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum RotationUnit {
        Degrees,
        Radians,
    }

    impl Default for RotationUnit {
        fn default() -> Self {
            RotationUnit::Degrees
        }
    }

    /// 单位与精度设置，由宿主只读提供。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct UnitSettings {
        pub system: UnitSystem,
        pub length_unit: LengthUnit,
        /// 英制下是否拆分英尺与英寸。
        pub separate_units: bool,
        pub scale_length: f64,
        /// 英寸分数分母：1/2/4/8/16/32/64。
        pub imperial_precision: u32,
        /// 小数位数（0-5）。
        pub decimal_precision: u8,
        pub hide_units: bool,
        pub rotation_unit: RotationUnit,
    }

    impl Default for UnitSettings {
        fn default() -> Self {
            Self {
                system: UnitSystem::Metric,
                length_unit: LengthUnit::Adaptive,
                separate_units: false,
                scale_length: 1.0,
                imperial_precision: 16,
                decimal_precision: 2,
                hide_units: false,
                rotation_unit: RotationUnit::Degrees,
            }
        }
    }

    impl UnitSettings {
        pub fn metric() -> Self {
            Self::default()
        }

        /// 英制设置，默认拆分英尺。
        pub fn imperial(precision: u32) -> Self {
            Self {
                system: UnitSystem::Imperial,
                separate_units: true,
                imperial_precision: precision,
                ..Self::default()
            }
        }

        #[inline]
        pub fn has_valid_imperial_precision(&self) -> bool {
            IMPERIAL_PRECISIONS.contains(&self.imperial_precision)
        }

        #[inline]
        fn decimals(&self) -> usize {
            usize::from(self.decimal_precision.min(MAX_DECIMAL_PRECISION))
        }
    }

    /// 将以米为单位的长度格式化为标注文字。
    pub fn format_distance(value: f64, settings: &UnitSettings) -> String {
        let value = value * settings.scale_length;
        let precision = settings.decimals();
        match settings.system {
            UnitSystem::Imperial => format_imperial(value, settings),
            UnitSystem::Metric => format_metric(value, precision, settings),
            UnitSystem::None => format!("{value:.precision$}"),
        }
    }

    /// 角度文字；角度制时附加 `°`。
    pub fn format_angle(radians: f64, settings: &UnitSettings) -> String {
        let precision = settings.decimals();
        match settings.rotation_unit {
            RotationUnit::Degrees => format!("{:.precision$}°", radians.to_degrees()),
            RotationUnit::Radians => format!("{radians:.precision$}"),
        }
    }

    fn format_metric(value: f64, precision: usize, settings: &UnitSettings) -> String {
        let (scaled, suffix) = match settings.length_unit {
            LengthUnit::Meters => (value, "m"),
            LengthUnit::Centimeters => (value * 100.0, "cm"),
            LengthUnit::Millimeters => (value * 1000.0, "mm"),
            LengthUnit::Adaptive | LengthUnit::Feet | LengthUnit::Inches => {
                let rounded = (value * 100.0).round_ties_even() / 100.0;
                if rounded >= 1.0 {
                    (value, "m")
                } else if rounded >= 0.01 {
                    (value * 100.0, "cm")
                } else {
                    (value * 1000.0, "mm")
                }
            }
        };
        if settings.hide_units {
            format!("{scaled:.precision$}")
        } else {
            format!("{scaled:.precision$} {suffix}")
        }
    }

    fn format_imperial(value: f64, settings: &UnitSettings) -> String {
        let mut denominator = i64::from(snap_precision(settings.imperial_precision));
        let mut decimal_inches = value * METERS_TO_INCHES;

        let split_feet = settings.length_unit != LengthUnit::Inches
            && (settings.separate_units || settings.length_unit == LengthUnit::Feet);
        let mut feet = 0_i64;
        if split_feet {
            feet = (decimal_inches / 12.0).floor() as i64;
            decimal_inches -= feet as f64 * 12.0;
        }

        let mut inches = decimal_inches.floor() as i64;
        let mut numerator =
            (denominator as f64 * (decimal_inches - inches as f64)).round_ties_even() as i64;

        if numerator == denominator {
            numerator = 0;
            inches += 1;
        } else {
            while numerator != 0 && numerator % 2 == 0 && denominator > 1 {
                numerator /= 2;
                denominator /= 2;
            }
        }

        if split_feet && inches >= 12 {
            feet += inches / 12;
            inches %= 12;
        }

        let mut text = String::new();
        if feet != 0 {
            text.push_str(&format!("{feet}' "));
        }
        if inches != 0 {
            text.push_str(&inches.to_string());
            text.push(if numerator != 0 { '-' } else { '"' });
        }
        if numerator != 0 {
            text.push_str(&format!("{numerator}/{denominator}\""));
        }

        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            "0\"".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// 非法分母向下取最近的 2 的幂（限制在 1..=64）。
    fn snap_precision(precision: u32) -> u32 {
        let clamped = precision.clamp(1, 64);
        1 << (31 - clamped.leading_zeros())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn adaptive_metric() -> UnitSettings {
            UnitSettings::metric()
        }

        #[test]
        fn imperial_one_meter_at_sixteenths() {
            let settings = UnitSettings::imperial(16);
            assert_eq!(format_distance(1.0, &settings), "3' 3-3/8\"");
        }

        #[test]
        fn imperial_fraction_reduces_and_carries() {
            let settings = UnitSettings::imperial(16);
            // 6 英寸整
            assert_eq!(format_distance(6.0 / METERS_TO_INCHES, &settings), "6\"");
            // 半英寸
            assert_eq!(format_distance(0.5 / METERS_TO_INCHES, &settings), "1/2\"");
            // 11.999 英寸进位到 1 英尺
            assert_eq!(format_distance(11.999 / METERS_TO_INCHES, &settings), "1'");
            assert_eq!(format_distance(0.0, &settings), "0\"");
        }

        #[test]
        fn imperial_inches_only_keeps_total_inches() {
            let settings = UnitSettings {
                length_unit: LengthUnit::Inches,
                ..UnitSettings::imperial(8)
            };
            assert_eq!(format_distance(1.0, &settings), "39-3/8\"");
        }

        #[test]
        fn imperial_invalid_precision_snaps_down() {
            let settings = UnitSettings::imperial(12);
            assert!(!settings.has_valid_imperial_precision());
            // 分母 12 取 8
            assert_eq!(format_distance(1.0, &settings), "3' 3-3/8\"");
        }

        #[test]
        fn metric_adaptive_picks_unit_by_magnitude() {
            let settings = adaptive_metric();
            assert_eq!(format_distance(0.005, &settings), "5.00 mm");
            assert_eq!(format_distance(0.5, &settings), "50.00 cm");
            assert_eq!(format_distance(1.5, &settings), "1.50 m");
            assert_eq!(format_distance(3.0, &settings), "3.00 m");
        }

        #[test]
        fn metric_hide_units_and_precision() {
            let settings = UnitSettings {
                hide_units: true,
                decimal_precision: 3,
                ..adaptive_metric()
            };
            assert_eq!(format_distance(0.005, &settings), "5.000");
            assert_eq!(format_distance(0.5, &settings), "50.000");
            assert_eq!(format_distance(1.5, &settings), "1.500");
        }

        #[test]
        fn metric_fixed_units_and_scale() {
            let settings = UnitSettings {
                length_unit: LengthUnit::Millimeters,
                decimal_precision: 0,
                scale_length: 2.0,
                ..adaptive_metric()
            };
            assert_eq!(format_distance(1.5, &settings), "3000 mm");
        }

        #[test]
        fn plain_numbers_without_unit_system() {
            let settings = UnitSettings {
                system: UnitSystem::None,
                decimal_precision: 1,
                ..adaptive_metric()
            };
            assert_eq!(format_distance(2.26, &settings), "2.3");
        }

        #[test]
        fn angles_in_degrees_and_radians() {
            let settings = adaptive_metric();
            assert_eq!(format_angle(std::f64::consts::FRAC_PI_2, &settings), "90.00°");
            let radians = UnitSettings {
                rotation_unit: RotationUnit::Radians,
                ..adaptive_metric()
            };
            assert_eq!(format_angle(std::f64::consts::PI, &radians), "3.14");
        }
    }
}
