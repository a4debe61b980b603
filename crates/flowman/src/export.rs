//! Format conversion: surface state → downloadable XML, and → PNG via the
//! surface's SVG export rasterized off-screen.

use flowman_core::{EditingSurface, MarkupExportOptions, SurfaceError};

/// Fixed base name for downloadable artifacts.
pub const EXPORT_BASE_NAME: &str = "diagram";

/// File name for the markup artifact (`diagram.bpmn`).
pub fn xml_file_name() -> String {
    format!("{EXPORT_BASE_NAME}.bpmn")
}

/// File name for the raster artifact (`diagram.png`).
pub fn png_file_name() -> String {
    format!("{EXPORT_BASE_NAME}.png")
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Vector(#[from] SurfaceError),
    #[error("failed to parse exported SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
}

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

/// Serializes the surface state to formatted markup bytes, ready to hand to
/// a file download.
pub async fn to_downloadable_xml(surface: &dyn EditingSurface) -> Result<Vec<u8>, SurfaceError> {
    let markup = surface
        .export_markup(MarkupExportOptions::formatted())
        .await?;
    Ok(markup.into_bytes())
}

/// Two-stage export: SVG from the surface, then off-screen rasterization to
/// PNG on an opaque white background at the SVG's intrinsic dimensions.
///
/// A stage (b) failure never invalidates consumers of the markup export;
/// the session runs the two artifact exports as independent attempts.
pub async fn to_raster_image(
    surface: &dyn EditingSurface,
    options: &RasterOptions,
) -> Result<Vec<u8>, RenderError> {
    let svg = surface.export_vector_image().await?;
    svg_to_png(&svg, options)
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>, RenderError> {
    let pixmap = svg_to_pixmap(svg, options.scale)?;
    pixmap.encode_png().map_err(|_| RenderError::PngEncode)
}

#[derive(Debug, Clone, Copy)]
struct ParsedViewBox {
    width: f32,
    height: f32,
}

fn parse_svg_viewbox(svg: &str) -> Option<ParsedViewBox> {
    // Cheap, non-validating parse for root viewBox: `viewBox="minX minY w h"`.
    // Sufficient for the SVG shapes editing surfaces emit.
    let i = svg.find("viewBox=\"")?;
    let rest = &svg[i + "viewBox=\"".len()..];
    let end = rest.find('"')?;
    let raw = &rest[..end];
    let mut it = raw.split_whitespace();
    let _min_x = it.next()?.parse::<f32>().ok()?;
    let _min_y = it.next()?.parse::<f32>().ok()?;
    let width = it.next()?.parse::<f32>().ok()?;
    let height = it.next()?.parse::<f32>().ok()?;
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Some(ParsedViewBox { width, height })
    } else {
        None
    }
}

fn svg_to_pixmap(svg: &str, scale: f32) -> Result<tiny_skia::Pixmap, RenderError> {
    let mut opt = usvg::Options::default();
    // Keep output stable-ish across environments while still using system fonts.
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RenderError::SvgParse)?;

    // `usvg`/`resvg` already apply the root viewBox transform, so the pixmap
    // only needs the intrinsic width/height (falling back to the tree size
    // when the SVG has no viewBox).
    let (width, height) = match parse_svg_viewbox(svg) {
        Some(vb) => (vb.width, vb.height),
        None => {
            let size = tree.size();
            (size.width(), size.height())
        }
    };

    let width_px = (width * scale).ceil().max(1.0) as u32;
    let height_px = (height * scale).ceil().max(1.0) as u32;

    let mut pixmap =
        tiny_skia::Pixmap::new(width_px, height_px).ok_or(RenderError::PixmapAlloc)?;
    pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));

    let transform = tiny_skia::Transform::from_scale(scale, scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}
