//! Mixline Render - Waveform rasterization for the timeline
//!
//! Produces toolkit-independent RGBA bitmaps:
//! - Mirrored gradient waveform bars, single-color or frequency-colored
//! - A global LRU tile cache with explicit disposal of evicted bitmaps
//! - The minimap overview

pub mod bitmap;
pub mod minimap;
pub mod renderer;
pub mod tile_cache;

pub use bitmap::TileBitmap;
pub use minimap::{Minimap, MinimapTrack};
pub use renderer::{render_waveform, WaveformStyle};
pub use tile_cache::{CacheStats, DisposalQueue, Tile, TileCache, TileDisposer, TileKey, TileRequest};
