//! A reference [`EditingSurface`] with no GUI attached.
//!
//! It validates imports as BPMN-shaped XML, stores the markup verbatim and
//! draws the DI shape bounds as plain outlines. That is enough for the whole
//! import/export pipeline (including rasterization) to run and be tested
//! without a browser engine.

use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::surface::{EditingSurface, MarkupExportOptions, SurfaceError};

const SHAPE_PADDING: f64 = 20.0;

#[derive(Debug, Default)]
struct SurfaceState {
    current: Option<String>,
    destroyed: bool,
}

#[derive(Debug, Default)]
pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EditingSurface for HeadlessSurface {
    async fn import_markup(&self, markup: &str) -> Result<(), SurfaceError> {
        let mut state = self.state();
        if state.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        validate_bpmn(markup)?;
        state.current = Some(markup.to_string());
        Ok(())
    }

    async fn export_markup(&self, _options: MarkupExportOptions) -> Result<String, SurfaceError> {
        let state = self.state();
        if state.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        // Imports are stored verbatim, so the formatted and raw variants
        // coincide for this surface.
        state.current.clone().ok_or(SurfaceError::MarkupExport {
            message: "no diagram loaded".to_string(),
        })
    }

    async fn export_vector_image(&self) -> Result<String, SurfaceError> {
        let state = self.state();
        if state.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        let markup = state.current.as_deref().ok_or(SurfaceError::VectorExport {
            message: "no diagram loaded".to_string(),
        })?;
        render_bounds_svg(markup)
    }

    fn destroy(&self) {
        let mut state = self.state();
        state.destroyed = true;
        state.current = None;
    }
}

fn validate_bpmn(markup: &str) -> Result<(), SurfaceError> {
    let doc = roxmltree::Document::parse(markup).map_err(|err| SurfaceError::MalformedMarkup {
        message: err.to_string(),
    })?;
    let root = doc.root_element().tag_name().name();
    if root != "definitions" {
        return Err(SurfaceError::MalformedMarkup {
            message: format!("expected a BPMN definitions root, found <{root}>"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ShapeBounds {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Renders the diagram's DI bounds as outlined rectangles. The SVG viewBox
/// spans the shape extents plus padding, so the intrinsic dimensions match
/// what a graphical engine would report for the same diagram.
fn render_bounds_svg(markup: &str) -> Result<String, SurfaceError> {
    let doc = roxmltree::Document::parse(markup).map_err(|err| SurfaceError::VectorExport {
        message: err.to_string(),
    })?;

    let mut shapes = Vec::new();
    for node in doc.descendants() {
        if node.tag_name().name() != "Bounds" {
            continue;
        }
        let attr = |name: &str| node.attribute(name).and_then(|v| v.parse::<f64>().ok());
        if let (Some(x), Some(y), Some(width), Some(height)) =
            (attr("x"), attr("y"), attr("width"), attr("height"))
        {
            shapes.push(ShapeBounds {
                x,
                y,
                width,
                height,
            });
        }
    }

    let (min_x, min_y, max_x, max_y) = shapes.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), s| {
            (
                min_x.min(s.x),
                min_y.min(s.y),
                max_x.max(s.x + s.width),
                max_y.max(s.y + s.height),
            )
        },
    );

    let (origin_x, origin_y, width, height) = if shapes.is_empty() {
        (0.0, 0.0, 120.0, 80.0)
    } else {
        (
            min_x - SHAPE_PADDING,
            min_y - SHAPE_PADDING,
            (max_x - min_x) + 2.0 * SHAPE_PADDING,
            (max_y - min_y) + 2.0 * SHAPE_PADDING,
        )
    };

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"#
    );
    for s in &shapes {
        let x = s.x - origin_x;
        let y = s.y - origin_y;
        let _ = write!(
            svg,
            r##"<rect x="{x}" y="{y}" width="{w}" height="{h}" rx="4" fill="none" stroke="#1f2937" stroke-width="2"/>"##,
            w = s.width,
            h = s.height,
        );
    }
    svg.push_str("</svg>");
    Ok(svg)
}
