//! Scan-code (2D barcode) artifacts for indexed torrents.
//!
//! Rendering is delegated to a [`ScanCodeRenderer`]; this module owns the
//! on-disk layout `<root>/<c1>/…/<c7>/<INFOHASH>.png`. [`QrCodeRenderer`]
//! is the production renderer.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

use crate::infohash::InfoHash;

#[derive(Debug, Error)]
pub enum ScanCodeError {
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a payload (a magnet URI) into PNG bytes.
pub trait ScanCodeRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<Vec<u8>, ScanCodeError>;
}

/// Pixels per QR module.
pub const MODULE_SIZE: u32 = 7;

/// QR codes at error-correction level M, [`MODULE_SIZE`] pixels per module,
/// no quiet zone, grayscale PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeRenderer;

impl ScanCodeRenderer for QrCodeRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>, ScanCodeError> {
        let code = QrCode::with_error_correction_level(payload, EcLevel::M)
            .map_err(|e| ScanCodeError::Render(e.to_string()))?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(false)
            .module_dimensions(MODULE_SIZE, MODULE_SIZE)
            .build();

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ScanCodeError::Render(e.to_string()))?;
        Ok(png)
    }
}

/// Writes rendered scan codes under a sharded directory tree.
#[derive(Clone)]
pub struct ScanCodeWriter {
    root: PathBuf,
    renderer: Arc<dyn ScanCodeRenderer>,
}

impl ScanCodeWriter {
    pub fn new(root: impl Into<PathBuf>, renderer: Arc<dyn ScanCodeRenderer>) -> Self {
        Self {
            root: root.into(),
            renderer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact for `infohash` lives. Pure, touches nothing.
    pub fn path_for(&self, infohash: &InfoHash) -> PathBuf {
        infohash
            .shard_dir(&self.root)
            .join(format!("{}.png", infohash))
    }

    /// Render the magnet URI of `infohash` and write it to [`path_for`](Self::path_for).
    pub fn write(&self, infohash: &InfoHash) -> Result<PathBuf, ScanCodeError> {
        let png = self.renderer.render(&infohash.magnet_uri())?;

        let dir = infohash.shard_dir(&self.root);
        std::fs::create_dir_all(&dir).map_err(|source| ScanCodeError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = self.path_for(infohash);
        std::fs::write(&path, png).map_err(|source| ScanCodeError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
