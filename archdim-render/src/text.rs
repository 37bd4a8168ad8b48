use archdim_core::document::{TextLabel, TextTexture};
use tracing::trace;

use crate::errors::RenderError;

/// 栅格化时使用的字号（像素），卡片尺寸由样式字号另行缩放。
pub const LABEL_FONT_SIZE: u32 = 20;

/// 外部文字栅格化接口。返回 `None` 表示无法生成（例如零尺寸）。
pub trait TextRasterizer {
    fn rasterize(&mut self, text: &str, size_px: u32, resolution: f64) -> Option<TextTexture>;
}

/// 等宽栅格化：每个字符占固定宽度的单元格，非空白字符填充为不透明白色。
#[derive(Debug, Clone)]
pub struct FixedAdvanceRasterizer {
    /// 字符宽度与字号之比。
    pub advance: f64,
    /// 行高与字号之比。
    pub line_height: f64,
}

impl Default for FixedAdvanceRasterizer {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl FixedAdvanceRasterizer {
    fn cell_size(&self, size_px: u32, resolution: f64) -> (u32, u32) {
        let pixels = f64::from(size_px) * resolution / 72.0;
        (
            (pixels * self.advance).round().max(0.0) as u32,
            (pixels * self.line_height).round().max(0.0) as u32,
        )
    }
}

impl TextRasterizer for FixedAdvanceRasterizer {
    fn rasterize(&mut self, text: &str, size_px: u32, resolution: f64) -> Option<TextTexture> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return None;
        }
        let lines: Vec<Vec<char>> = text.lines().map(|line| line.chars().collect()).collect();
        let columns = lines.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let rows = lines.len() as u32;
        let (cell_w, cell_h) = self.cell_size(size_px, resolution);

        let width = columns.checked_mul(cell_w)?;
        let height = rows.checked_mul(cell_h)?;
        let mut pixels = vec![0u8; width as usize * height as usize * 4];

        // 纹理第一行对应文字最后一行
        for (row, line) in lines.iter().rev().enumerate() {
            for (column, ch) in line.iter().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                for y in 0..cell_h {
                    let py = row as u32 * cell_h + y;
                    let start = (py * width + column as u32 * cell_w) as usize * 4;
                    let end = start + cell_w as usize * 4;
                    pixels[start..end].fill(255);
                }
            }
        }

        TextTexture::new(width, height, pixels)
    }
}

/// 标签为脏或缓存纹理的分辨率与样式不一致时重新栅格化。空文字以单个空格代替，
/// 失败时标签保持为脏且没有纹理。返回本次是否重新生成了纹理。
pub fn refresh_label<R>(
    label: &mut TextLabel,
    rasterizer: &mut R,
    resolution: f64,
) -> Result<bool, RenderError>
where
    R: TextRasterizer + ?Sized,
{
    if label.resolution().is_some_and(|cached| cached != resolution) {
        label.mark_dirty();
    }
    if !label.is_dirty() {
        return Ok(false);
    }
    let text = if label.text().is_empty() {
        " ".to_string()
    } else {
        label.text().to_string()
    };

    match rasterizer.rasterize(&text, LABEL_FONT_SIZE, resolution) {
        Some(texture) => {
            trace!(text = %text, width = texture.width, height = texture.height, "已栅格化标注文字");
            label.store_texture(texture, resolution);
            Ok(true)
        }
        None => Err(RenderError::Rasterize { text }),
    }
}
