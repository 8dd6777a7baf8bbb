use std::fmt::Write;
use std::sync::Arc;

use resvg::usvg::{self, Options as UsvgOptions, fontdb};
use resvg::{
    render as resvg_render,
    tiny_skia::{Pixmap, Transform},
};
use tokio::task::spawn_blocking;
use unicode_width::UnicodeWidthChar;

use crate::config::AppConfig;
use crate::error::AppError;

use super::assets::LoadedAssets;
use super::layout::{LayoutNode, TextAlign, TextStyle, WrapPolicy, build_layout};
use super::types::RenderRequest;

/// 解析并校验后的矢量图。
///
/// 内部持有已完成字体解析与几何解析的 usvg 树，尺寸与请求像素一致。
/// 由 `render` 产出，由 `encode` 消费一次。
#[derive(Debug)]
pub struct VectorGraphic {
    tree: usvg::Tree,
}

impl VectorGraphic {
    pub fn width(&self) -> u32 {
        self.tree.size().to_int_size().width()
    }

    pub fn height(&self) -> u32 {
        self.tree.size().to_int_size().height()
    }
}

// 半角字符平均宽度按 0.55em 估算（粗体），全角按 1em。
// 与布局构建一样，这是估宽启发式而非真实字形度量。
const HALF_WIDTH_ADVANCE_EM: f64 = 0.55;

fn char_advance(ch: char, font_size: f64) -> f64 {
    match UnicodeWidthChar::width(ch) {
        Some(2) => font_size,
        Some(0) | None => 0.0,
        _ => font_size * HALF_WIDTH_ADVANCE_EM,
    }
}

fn text_advance(text: &str, font_size: f64) -> f64 {
    text.chars().map(|ch| char_advance(ch, font_size)).sum()
}

/// 把超出行宽的不可断片段按字符强制切开
fn break_long_run(run: &str, font_size: f64, max_width: f64, lines: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_width = 0.0;
    for ch in run.chars() {
        let advance = char_advance(ch, font_size);
        if !current.is_empty() && current_width + advance > max_width {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        current.push(ch);
        current_width += advance;
    }
    if !current.is_empty() {
        lines.push(current);
    }
}

/// 按估算宽度折行：优先在空白处断行，整词放不下才按字符强制切开。
fn wrap_text(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let space_advance = char_advance(' ', font_size);
    let mut lines = Vec::new();

    for input_line in text.lines() {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in input_line.split_whitespace() {
            let word_width = text_advance(word, font_size);
            let needed = if current.is_empty() {
                word_width
            } else {
                space_advance + word_width
            };

            if current_width + needed <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                    current_width += space_advance;
                }
                current.push_str(word);
                current_width += word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }

            if word_width <= max_width {
                current.push_str(word);
                current_width = word_width;
            } else {
                break_long_run(word, font_size, max_width, &mut lines);
                // 强制切行的尾巴留在当前行，后续词若放得下则继续拼接
                if let Some(tail) = lines.pop() {
                    current_width = text_advance(&tail, font_size);
                    current = tail;
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 把布局树展开为 SVG 文本。
///
/// 布局树形态固定（容器 → 背景图 → 文本），这里负责把盒模型语义翻译成
/// SVG 原语：cover 对应 preserveAspectRatio 的 xMidYMid slice，
/// 居中文本块由折行结果逐行定位。
fn compose_svg(layout: &LayoutNode, font_family: &str) -> Result<String, AppError> {
    let fmt_err = |e| AppError::Render(format!("SVG formatting error: {e}"));

    let LayoutNode::Container {
        width,
        height,
        fill,
        children,
    } = layout
    else {
        return Err(AppError::Render("布局根节点必须是容器".to_string()));
    };
    let (width, height) = (*width, *height);

    // 预分配，文本不长时一次分配即可容纳
    let mut svg = String::with_capacity(4096);

    writeln!(
        svg,
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#
    )
    .map_err(fmt_err)?;

    // 背景填充
    writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="{}" />"#,
        escape_xml(fill)
    )
    .map_err(fmt_err)?;

    for child in children {
        match child {
            LayoutNode::Container { .. } => {
                return Err(AppError::Render("不支持嵌套容器布局".to_string()));
            }
            LayoutNode::Image {
                href,
                // 单容器组合下绝对铺满与流内铺满退化为同一几何
                position: _,
                cover,
            } => {
                let preserve = if *cover { "xMidYMid slice" } else { "none" };
                writeln!(
                    svg,
                    r#"<image href="{}" x="0" y="0" width="100%" height="100%" preserveAspectRatio="{preserve}" />"#,
                    escape_xml(href)
                )
                .map_err(fmt_err)?;
            }
            LayoutNode::Text {
                content,
                position: _,
                style,
            } => {
                write_text_layer(&mut svg, content, style, font_family, width, height)
                    .map_err(fmt_err)?;
            }
        }
    }

    writeln!(svg, "</svg>").map_err(fmt_err)?;
    Ok(svg)
}

fn write_text_layer(
    svg: &mut String,
    content: &str,
    style: &TextStyle,
    font_family: &str,
    width: u32,
    height: u32,
) -> Result<(), std::fmt::Error> {
    let font_size = style.font_size;
    let max_line_width = width as f64 * style.max_width_ratio;
    let lines = match style.wrap {
        WrapPolicy::KeepAllBreakLongRuns => wrap_text(content, font_size, max_line_width),
    };
    if lines.is_empty() {
        return Ok(());
    }

    // CSS text-shadow 的模糊半径约等于 2 倍高斯标准差
    let std_deviation = style.shadow.blur / 2.0;
    writeln!(
        svg,
        r##"<defs><filter id="text-shadow" x="-50%" y="-50%" width="200%" height="200%"><feDropShadow dx="{}" dy="{}" stdDeviation="{}" flood-color="#000" flood-opacity="{}" /></filter></defs>"##,
        style.shadow.dx, style.shadow.dy, std_deviation, style.shadow.opacity
    )?;

    let weight = if style.bold { 700 } else { 400 };
    writeln!(svg, "<style>")?;
    writeln!(
        svg,
        r#".text-main {{ font-size: {font_size}px; fill: {}; font-weight: {weight}; font-family: "{font_family}"; }}"#,
        escape_xml(&style.color)
    )?;
    writeln!(svg, "</style>")?;

    let anchor = match style.align {
        TextAlign::Center => "middle",
    };
    let center_x = width as f64 / 2.0;
    let line_height = style.line_height * font_size;
    let block_top = (height as f64 - lines.len() as f64 * line_height) / 2.0;

    writeln!(svg, r#"<g filter="url(#text-shadow)">"#)?;
    for (i, line) in lines.iter().enumerate() {
        // 基线近似：行框中心再向下 0.35em（大写高度的一半）
        let baseline = block_top + (i as f64 + 0.5) * line_height + 0.35 * font_size;
        writeln!(
            svg,
            r#"<text x="{center_x}" y="{baseline:.1}" text-anchor="{anchor}" class="text-main">{}</text>"#,
            escape_xml(line)
        )?;
    }
    writeln!(svg, "</g>")?;
    Ok(())
}

/// 矢量阶段：校验几何、载入字体、展开布局树并解析为矢量图。
///
/// 字体按单一字重/字形处理——树中只有一个文本节点，供入的字体对全部
/// 文本生效。字体数据损坏或几何不一致返回 `Render` 错误。
pub fn render(
    layout: &LayoutNode,
    font_bytes: &[u8],
    width: u32,
    height: u32,
) -> Result<VectorGraphic, AppError> {
    let t0 = std::time::Instant::now();

    if width == 0 || height == 0 {
        return Err(AppError::Render(format!(
            "输出尺寸必须为正: {width}x{height}"
        )));
    }
    if let LayoutNode::Container {
        width: lw,
        height: lh,
        ..
    } = layout
    {
        if *lw != width || *lh != height {
            return Err(AppError::Render(format!(
                "布局尺寸 {lw}x{lh} 与请求尺寸 {width}x{height} 不一致"
            )));
        }
    }

    let mut font_db = fontdb::Database::new();
    font_db.load_font_data(font_bytes.to_vec());
    let font_family = font_db
        .faces()
        .next()
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        .ok_or_else(|| AppError::Render("字体数据无法解析出任何字形".to_string()))?;

    let svg = compose_svg(layout, &font_family)?;
    let t_compose = t0.elapsed();

    let opts = UsvgOptions {
        fontdb: Arc::new(font_db),
        font_family: font_family.clone(),
        font_size: 16.0,
        languages: vec!["ja".to_string(), "en".to_string()],
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
        .map_err(|e| AppError::Render(format!("Failed to parse SVG: {e}")))?;
    let t_parse = t0.elapsed();

    tracing::debug!(
        "矢量阶段分段: 组装={:?}, 解析={:?}, 总计={:?}",
        t_compose,
        t_parse - t_compose,
        t_parse
    );

    Ok(VectorGraphic { tree })
}

/// 栅格阶段：矢量图 → 未压缩位图 → PNG。
///
/// 不做任何缩放，尺寸以矢量图为准。入参来自 `render` 的校验产物，
/// 失败按内部不变量破坏处理（`Encode`）。
pub fn encode(vector: &VectorGraphic) -> Result<Vec<u8>, AppError> {
    let t0 = std::time::Instant::now();

    let size = vector.tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| AppError::Encode("Failed to create pixmap".to_string()))?;

    resvg_render(&vector.tree, Transform::default(), &mut pixmap.as_mut());
    let t_raster = t0.elapsed();

    let mut out = Vec::with_capacity(size.width() as usize * size.height() as usize * 4);
    {
        let mut encoder = png::Encoder::new(&mut out, size.width(), size.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if AppConfig::global().image.optimize_speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| AppError::Encode(format!("PNG write_header error: {e}")))?;
        writer
            .write_image_data(pixmap.data())
            .map_err(|e| AppError::Encode(format!("PNG write_image_data error: {e}")))?;
        writer
            .finish()
            .map_err(|e| AppError::Encode(format!("PNG finish error: {e}")))?;
    }
    let t_encode = t0.elapsed();

    tracing::debug!(
        "栅格阶段分段: 栅格化={:?}, 编码={:?}, 总计={:?}",
        t_raster,
        t_encode - t_raster,
        t_encode
    );

    Ok(out)
}

/// 完整管线（同步版）：布局 → 矢量 → 栅格。
pub fn render_preview(request: &RenderRequest, assets: &LoadedAssets) -> Result<Vec<u8>, AppError> {
    let layout = build_layout(request, assets);
    let vector = render(&layout, &assets.font_bytes, request.width, request.height)?;
    encode(&vector)
}

/// 完整管线（异步版）。
///
/// SVG 解析、栅格化与 PNG 编码都是 CPU 密集操作，放入 Tokio 的阻塞线程池，
/// 避免阻塞异步运行时线程。
pub async fn render_preview_async(
    request: RenderRequest,
    assets: Arc<LoadedAssets>,
) -> Result<Vec<u8>, AppError> {
    let handle = spawn_blocking(move || render_preview(&request, &assets));

    handle
        .await
        .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
}
