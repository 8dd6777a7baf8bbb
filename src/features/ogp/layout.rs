use super::assets::LoadedAssets;
use super::types::RenderRequest;

/// 根据文本长度与容器尺寸推算字号（像素）。
///
/// 这是一个不查真实字形度量的启发式：基准字号取 min(宽/8, 高/3)，
/// 超过 10 个字符后按字符数反比缩小，下限为容器高度的 1/10。
/// 极长文本在下限字号下仍可能溢出 90% 宽度盒，这是被接受的近似，
/// 不要在这里"修正"公式——视觉输出的兼容性优先。
pub fn calculate_font_size(text: &str, container_width: u32, container_height: u32) -> f64 {
    let base = (container_width as f64 / 8.0).min(container_height as f64 / 3.0);

    let text_length = text.chars().count();
    let font_size = if text_length > 10 {
        base * (10.0 / text_length as f64)
    } else {
        base
    };

    let min_font_size = container_height as f64 / 10.0;
    font_size.max(min_font_size)
}

/// 节点在父容器中的定位方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// 常规流内，由父容器居中
    Flow,
    /// 绝对定位，铺满整个父容器
    AbsoluteFill,
}

/// 文本对齐方式（当前组合只需要居中）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Center,
}

/// 换行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapPolicy {
    /// 尽量不在完整词内断行；超长的不可断片段允许强制断开
    /// （对应 CSS 的 word-break: keep-all + overflow-wrap: break-word）
    KeepAllBreakLongRuns,
}

/// 文本投影样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextShadow {
    pub dx: f64,
    pub dy: f64,
    pub blur: f64,
    pub opacity: f64,
}

/// 文本节点样式
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: String,
    pub bold: bool,
    pub shadow: TextShadow,
    pub align: TextAlign,
    /// 文本盒最大宽度占容器宽度的比例
    pub max_width_ratio: f64,
    /// 行高倍数
    pub line_height: f64,
    pub wrap: WrapPolicy,
}

/// 布局树节点：一次渲染调用内构建、构建后不可变的纯数据结构。
///
/// 组合形态固定且很小，按标签枚举表达即可，不需要组件模型。
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    /// 容器盒
    Container {
        width: u32,
        height: u32,
        fill: String,
        children: Vec<LayoutNode>,
    },
    /// 图片层
    Image {
        href: String,
        position: Position,
        /// cover 语义：等比缩放至完全覆盖，裁掉溢出
        cover: bool,
    },
    /// 文本层
    Text {
        content: String,
        position: Position,
        style: TextStyle,
    },
}

/// 由请求与已加载资源构建固定的三层组合（自底向上）：
/// 白底容器 → cover 铺满的背景图 → 居中文本。
///
/// 纯函数，无错误分支。
pub fn build_layout(request: &RenderRequest, assets: &LoadedAssets) -> LayoutNode {
    let font_size = calculate_font_size(&request.text, request.width, request.height);

    LayoutNode::Container {
        width: request.width,
        height: request.height,
        fill: "#fff".to_string(),
        children: vec![
            LayoutNode::Image {
                href: assets.background_data_uri.clone(),
                position: Position::AbsoluteFill,
                cover: true,
            },
            LayoutNode::Text {
                content: request.text.clone(),
                position: Position::AbsoluteFill,
                style: TextStyle {
                    font_size,
                    color: "#fff".to_string(),
                    bold: true,
                    shadow: TextShadow {
                        dx: 4.0,
                        dy: 4.0,
                        blur: 8.0,
                        opacity: 0.7,
                    },
                    align: TextAlign::Center,
                    max_width_ratio: 0.9,
                    line_height: 1.2,
                    wrap: WrapPolicy::KeepAllBreakLongRuns,
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn assets() -> LoadedAssets {
        LoadedAssets {
            font_bytes: Bytes::from_static(b"font"),
            background_data_uri: "data:image/png;base64,AAAA".to_string(),
        }
    }

    #[test]
    fn single_char_uses_base_size() {
        // min(1200/8, 630/3) = min(150, 210) = 150
        assert_eq!(calculate_font_size("桜", 1200, 630), 150.0);
    }

    #[test]
    fn short_text_size_is_independent_of_content() {
        // 10 个字符以内与文本内容无关
        assert_eq!(
            calculate_font_size("abcdefghij", 1200, 630),
            calculate_font_size("あいうえおかきくけこ", 1200, 630)
        );
        assert_eq!(calculate_font_size("abcdefghij", 1200, 630), 150.0);
    }

    #[test]
    fn twenty_chars_shrink_inversely() {
        // base=150, candidate=150*(10/20)=75, floor=63 → 75
        assert_eq!(calculate_font_size("12345678901234567890", 1200, 630), 75.0);
    }

    #[test]
    fn very_long_text_clamps_to_floor() {
        let text = "x".repeat(100);
        // candidate=150*0.1=15 < floor=63
        assert_eq!(calculate_font_size(&text, 1200, 630), 63.0);
    }

    #[test]
    fn size_is_monotonic_beyond_threshold_and_never_below_floor() {
        let mut prev = f64::INFINITY;
        for len in 11..200 {
            let text = "あ".repeat(len);
            let size = calculate_font_size(&text, 1200, 630);
            assert!(size <= prev, "font size grew at len {len}");
            assert!(size >= 63.0, "font size fell below floor at len {len}");
            prev = size;
        }
    }

    #[test]
    fn length_counts_scalar_values_not_bytes() {
        // 3 个多字节字符应按 3 个字符计
        assert_eq!(calculate_font_size("桜桜桜", 1200, 630), 150.0);
    }

    #[test]
    fn layout_is_a_fixed_three_layer_stack() {
        let req = RenderRequest {
            width: 1200,
            height: 630,
            text: "桜".to_string(),
        };
        let root = build_layout(&req, &assets());

        let LayoutNode::Container {
            width,
            height,
            fill,
            children,
        } = root
        else {
            panic!("root must be a container");
        };
        assert_eq!((width, height), (1200, 630));
        assert_eq!(fill, "#fff");
        assert_eq!(children.len(), 2);

        // 底层：cover 铺满的背景图
        let LayoutNode::Image {
            href,
            position,
            cover,
        } = &children[0]
        else {
            panic!("first child must be the background image");
        };
        assert_eq!(href, "data:image/png;base64,AAAA");
        assert_eq!(*position, Position::AbsoluteFill);
        assert!(cover);

        // 顶层：居中文本
        let LayoutNode::Text { content, style, .. } = &children[1] else {
            panic!("second child must be the text layer");
        };
        assert_eq!(content, "桜");
        assert_eq!(style.font_size, 150.0);
        assert_eq!(style.color, "#fff");
        assert!(style.bold);
        assert_eq!(style.max_width_ratio, 0.9);
        assert_eq!(style.line_height, 1.2);
        assert_eq!(style.shadow.dx, 4.0);
        assert_eq!(style.shadow.blur, 8.0);
    }
}
