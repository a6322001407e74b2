use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::foundation::error::{TelesyncError, TelesyncResult};

/// Renders overlay SVGs into fixed-size PNGs.
///
/// The font database is loaded once and shared by every frame of a job.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("faces", &self.fontdb.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Rasterizer {
    pub fn new(width: u32, height: u32) -> TelesyncResult<Self> {
        if width == 0 || height == 0 {
            return Err(TelesyncError::validation(
                "raster width/height must be non-zero",
            ));
        }
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Ok(Self {
            fontdb: Arc::new(db),
            width,
            height,
        })
    }

    /// Rasterize `svg_path` into `png_path`. Blocking.
    pub fn rasterize_file(&self, svg_path: &Path, png_path: &Path) -> TelesyncResult<()> {
        let bytes = std::fs::read(svg_path)
            .with_context(|| format!("read overlay svg '{}'", svg_path.display()))?;
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(&bytes, &opts).map_err(|e| {
            TelesyncError::compositing(format!(
                "failed to parse overlay svg '{}': {e}",
                svg_path.display()
            ))
        })?;

        let mut rgba = rasterize_svg_to_premul_rgba8(&tree, self.width, self.height)?;
        demultiply_rgba8(&mut rgba)?;

        image::save_buffer_with_format(
            png_path,
            &rgba,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write overlay png '{}'", png_path.display()))?;
        Ok(())
    }

    /// Rasterize every SVG next to itself (`.svg` -> `.png`) on the blocking pool, in order.
    ///
    /// Each PNG is pushed onto `written` as soon as it exists, so the caller can remove them
    /// whether or not the batch succeeds.
    pub async fn rasterize_all(
        &self,
        svg_paths: &[PathBuf],
        written: &mut Vec<PathBuf>,
    ) -> TelesyncResult<()> {
        let total = svg_paths.len();
        for (i, svg) in svg_paths.iter().enumerate() {
            let png = svg.with_extension("png");
            let this = self.clone();
            let (src, dst) = (svg.clone(), png.clone());
            tokio::task::spawn_blocking(move || this.rasterize_file(&src, &dst))
                .await
                .map_err(|e| {
                    TelesyncError::compositing(format!("rasterize task panicked: {e}"))
                })??;
            written.push(png);

            if (i + 1) % 50 == 0 {
                tracing::info!("rasterized {}/{total} overlays", i + 1);
            }
        }
        Ok(())
    }
}

pub fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> TelesyncResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| TelesyncError::compositing("failed to allocate svg pixmap"))?;

    let size = tree.size();
    if !size.width().is_finite() || size.width() <= 0.0 || size.height() <= 0.0 {
        return Err(TelesyncError::compositing("svg has invalid width/height"));
    }
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.take())
}

/// Convert premultiplied RGBA8 to straight alpha in place (PNG stores straight alpha).
pub fn demultiply_rgba8(px: &mut [u8]) -> TelesyncResult<()> {
    if !px.len().is_multiple_of(4) {
        return Err(TelesyncError::compositing(
            "demultiply_rgba8 expects an rgba8 buffer",
        ));
    }
    for p in px.chunks_exact_mut(4) {
        let a = u32::from(p[3]);
        if a == 0 {
            p[..3].fill(0);
            continue;
        }
        if a == 255 {
            continue;
        }
        for c in &mut p[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/media/raster.rs"]
mod tests;
