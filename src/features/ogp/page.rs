use minijinja::{Environment, context};
use once_cell::sync::OnceCell;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::AppConfig;
use crate::error::AppError;

/// 内置模板环境（`.html` 后缀自动启用 HTML 转义）
static TEMPLATES: OnceCell<Environment<'static>> = OnceCell::new();

fn templates() -> &'static Environment<'static> {
    TEMPLATES.get_or_init(|| {
        let mut env = Environment::new();
        env.add_template("ogp.html", include_str!("../../../templates/ogp.html"))
            .expect("builtin template must be valid");
        env
    })
}

/// URL 路径段编码（encodeURIComponent 语义：`/` 也会被编码）
fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

/// HTML 端点的输入参数（路径段已由路由层完成百分号解码）
pub struct OgpPage<'a> {
    pub text: &'a str,
    pub user_id: &'a str,
    pub tree_id: &'a str,
    /// 本服务对外 origin，用于拼 og:image 绝对地址
    pub origin: &'a str,
}

/// 渲染跳转用 HTML 壳：OGP/Twitter meta 标签 + 延时跳转脚本。
///
/// 所有用户输入经模板自动转义后才进入标签属性；嵌入 URL 的路径段
/// 另行百分号编码，杜绝注入。
pub fn render_page(page: &OgpPage<'_>) -> Result<String, AppError> {
    let ogp = &AppConfig::global().ogp;

    let image_url = format!(
        "{}/image/{}/{}/{}",
        page.origin,
        ogp.default_width,
        ogp.default_height,
        encode_segment(page.text)
    );
    let redirect_url = format!(
        "{}/trees/{}/{}",
        ogp.frontend_origin,
        encode_segment(page.user_id),
        encode_segment(page.tree_id)
    );

    templates()
        .get_template("ogp.html")
        .and_then(|tpl| {
            tpl.render(context! {
                text => page.text,
                origin => page.origin,
                image_url => image_url,
                redirect_url => redirect_url,
                description => ogp.description,
                twitter_site => ogp.twitter_site,
                delay_ms => ogp.redirect_delay_ms,
            })
        })
        .map_err(|e| AppError::Internal(format!("模板渲染失败: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> OgpPage<'_> {
        OgpPage {
            text,
            user_id: "user1",
            tree_id: "tree9",
            origin: "https://ogp.example.com",
        }
    }

    #[test]
    fn embeds_meta_tags_with_default_dimensions() {
        let html = render_page(&page("hello")).unwrap();

        assert!(html.contains(r#"<meta property="og:type" content="website" />"#));
        assert!(html.contains(r#"<meta name="twitter:card" content="summary_large_image" />"#));
        assert!(html.contains("https://ogp.example.com/image/1200/630/hello"));
        assert!(html.contains("/trees/user1/tree9"));
        assert!(html.contains("}, 1000);"));
    }

    #[test]
    fn user_text_is_html_escaped_and_url_encoded() {
        let html = render_page(&page(r#"<script>alert(1)</script>"#)).unwrap();

        // 属性与标题内不允许出现原始标签
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        // og:image 的路径段为百分号编码
        assert!(html.contains("/image/1200/630/%3Cscript%3E"));
    }

    #[test]
    fn multibyte_text_is_percent_encoded_in_image_url() {
        let html = render_page(&page("桜")).unwrap();
        assert!(html.contains("/image/1200/630/%E6%A1%9C"));
    }

    #[test]
    fn path_ids_are_url_encoded_in_redirect_target() {
        let p = OgpPage {
            text: "t",
            user_id: "a/b",
            tree_id: "c d",
            origin: "https://ogp.example.com",
        };
        let html = render_page(&p).unwrap();
        assert!(html.contains("/trees/a%2Fb/c%20d"));
    }
}
