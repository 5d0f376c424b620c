//! World persistence in the `save.ccc` format.
//!
//! The file is a gzip stream. Current saves are version 3:
//!
//! ```text
//! [f32 LE size_x][f32 LE size_y][f32 LE size_z][i32 LE 3][cells in grid order]
//! ```
//!
//! Version 1 files start with `[i32 LE 1]` and hold a fixed 256×64×256 world
//! stored x-major. They are still readable and are transposed on load.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;
use tokio::task::JoinHandle;

use classic_engine::world::BlockId;
use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::Dimensions;

use crate::server::Server;

const LEGACY_VERSION: i32 = 1;
const CURRENT_VERSION: i32 = 3;
/// Three f32 extents followed by the i32 version tag.
const V3_HEADER_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unsupported save version {0}")]
    UnsupportedVersion(i32),
    #[error("save file truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("invalid world dimensions {0:?}")]
    InvalidDimensions([f32; 3]),
    #[error(transparent)]
    Io(#[from] io::Error),
}

// ── Save ─────────────────────────────────────────────────────────────────────

/// Write `grid` to `path` as a version 3 save. The data goes to a sibling
/// temporary file first and is renamed into place, so a crash mid-write
/// never leaves a half-written save behind.
pub fn save_grid(grid: &VoxelGrid, path: &Path) -> Result<(), PersistenceError> {
    let start = Instant::now();
    let tmp = temp_path(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let dims = grid.dimensions();
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(&tmp)?), Compression::default());
    for extent in [dims.x, dims.y, dims.z] {
        encoder.write_all(&(extent as f32).to_le_bytes())?;
    }
    encoder.write_all(&CURRENT_VERSION.to_le_bytes())?;
    encoder.write_all(grid.payload())?;
    encoder.finish()?.flush()?;
    fs::rename(&tmp, path)?;

    tracing::info!(
        "World saved to {} ({}x{}x{}, {:.2?})",
        path.display(),
        dims.x,
        dims.y,
        dims.z,
        start.elapsed(),
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Load ─────────────────────────────────────────────────────────────────────

/// Load a save file. `Ok(None)` means there is no file at `path`; every other
/// failure is an error the caller answers by generating a fresh world.
pub fn load_grid(path: &Path) -> Result<Option<VoxelGrid>, PersistenceError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut raw = Vec::new();
    GzDecoder::new(BufReader::new(file)).read_to_end(&mut raw)?;
    let grid = decode(&raw)?;
    let dims = grid.dimensions();
    tracing::info!(
        "Loaded world from {} ({}x{}x{})",
        path.display(),
        dims.x,
        dims.y,
        dims.z
    );
    Ok(Some(grid))
}

/// Decode an already-inflated save.
pub fn decode(raw: &[u8]) -> Result<VoxelGrid, PersistenceError> {
    let leading = read_i32(raw, 0)?;
    if leading == LEGACY_VERSION {
        return decode_legacy(&raw[4..]);
    }

    let version = read_i32(raw, 12)?;
    if version != CURRENT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }
    let extents = [read_f32(raw, 0)?, read_f32(raw, 4)?, read_f32(raw, 8)?];
    let dims = dimensions_from(extents).ok_or(PersistenceError::InvalidDimensions(extents))?;

    let cells = &raw[V3_HEADER_LEN..];
    if cells.len() < dims.volume() {
        return Err(PersistenceError::Truncated {
            expected: V3_HEADER_LEN + dims.volume(),
            found: raw.len(),
        });
    }
    VoxelGrid::from_payload(dims, &cells[..dims.volume()])
        .ok_or(PersistenceError::InvalidDimensions(extents))
}

/// Version 1 cells are laid out `x*256*64 + z*64 + y`.
fn decode_legacy(cells: &[u8]) -> Result<VoxelGrid, PersistenceError> {
    let dims = Dimensions::LEGACY;
    if cells.len() < dims.volume() {
        return Err(PersistenceError::Truncated {
            expected: 4 + dims.volume(),
            found: 4 + cells.len(),
        });
    }
    let mut grid = VoxelGrid::new(dims);
    for pos in grid.positions() {
        let (x, y, z) = (pos.x as usize, pos.y as usize, pos.z as usize);
        let src = x * dims.z * dims.y + z * dims.y + y;
        grid.set(pos, BlockId(cells[src]));
    }
    tracing::info!("Converted legacy version 1 save");
    Ok(grid)
}

fn dimensions_from(extents: [f32; 3]) -> Option<Dimensions> {
    let axis = |v: f32| {
        (v.is_finite() && v.fract() == 0.0 && v >= 1.0 && v <= Dimensions::MAX_AXIS as f32)
            .then_some(v as usize)
    };
    Dimensions::new(axis(extents[0])?, axis(extents[1])?, axis(extents[2])?)
}

fn field(raw: &[u8], at: usize) -> Result<[u8; 4], PersistenceError> {
    raw.get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or(PersistenceError::Truncated {
            expected: at + 4,
            found: raw.len(),
        })
}

fn read_i32(raw: &[u8], at: usize) -> Result<i32, PersistenceError> {
    field(raw, at).map(i32::from_le_bytes)
}

fn read_f32(raw: &[u8], at: usize) -> Result<f32, PersistenceError> {
    field(raw, at).map(f32::from_le_bytes)
}

// ── Autosave ─────────────────────────────────────────────────────────────────

/// Save a snapshot of the world every `period` until the server shuts down.
/// The write runs on a blocking thread so the tick is never held up by disk I/O.
pub fn spawn_autosave(server: Arc<Server>, path: PathBuf, period: Duration) -> JoinHandle<()> {
    let mut shutdown = server.shutdown_signal();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick is immediate, skip it
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            tracing::info!("Autosaving...");
            let snapshot = server.world_snapshot();
            let target = path.clone();
            match tokio::task::spawn_blocking(move || save_grid(&snapshot, &target)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Autosave failed: {}", e),
                Err(e) => tracing::error!("Autosave task panicked: {}", e),
            }
        }
        tracing::debug!("Autosave stopped");
    })
}
