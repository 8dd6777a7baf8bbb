mod assets;
pub mod handler;
mod layout;
mod page;
mod renderer;
mod store;
mod types;

pub use assets::{AssetCache, LoadedAssets};
pub use handler::create_ogp_router;
pub use layout::{
    LayoutNode, Position, TextAlign, TextShadow, TextStyle, WrapPolicy, build_layout,
    calculate_font_size,
};
pub use page::{OgpPage, render_page};
pub use renderer::{VectorGraphic, encode, render, render_preview, render_preview_async};
pub use store::{FsObjectStore, HttpObjectStore, MemObjectStore, ObjectStore};
pub use types::RenderRequest;
