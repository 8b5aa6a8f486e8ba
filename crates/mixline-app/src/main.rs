//! Mixline - Multi-track mixing timeline
//!
//! Demo host for the timeline engine: a synthetic mix of tracks, an
//! in-memory project store and a simulated transport.

use anyhow::Result;
use eframe::egui;
use mixline_core::{
    CueKind, CuePoint, CurveType, EngineConfig, MixlineError, PeakSet, Track, TrackId, TrackUpdate,
};
use mixline_timeline::{
    PlaybackPosition, PlayheadClock, SharedStore, TrackUpdater, Transport, ViewState,
};
use mixline_ui::{Theme, TimelineAction, TimelineCanvas, TimelineInput};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const PEAKS_PER_SECOND: f64 = 20.0;

fn main() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Mixline starting...");

    let config = load_config(std::env::args().nth(1).map(PathBuf::from))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 420.0])
            .with_title("Mixline"),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    eframe::run_native(
        "Mixline",
        options,
        Box::new(move |cc| Ok(Box::new(MixlineApp::new(cc, config)))),
    )?;

    Ok(())
}

/// Explicit path first, then `<config dir>/mixline/engine.json`, then defaults.
fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    if let Some(path) = path {
        let config = EngineConfig::load_from_file(&path)?;
        info!(path = %path.display(), "Loaded engine config");
        return Ok(config);
    }
    let user = dirs::config_dir().map(|d| d.join("mixline").join("engine.json"));
    match user {
        Some(path) if path.exists() => match EngineConfig::load_from_file(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded engine config");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid engine config");
                Ok(EngineConfig::default())
            }
        },
        _ => Ok(EngineConfig::default()),
    }
}

// ── Project store ──────────────────────────────────────────────

/// The authoritative track list.
struct Project {
    tracks: Vec<Track>,
}

impl TrackUpdater for Project {
    fn update_track(&mut self, track_id: TrackId, update: &TrackUpdate) -> mixline_core::Result<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or(MixlineError::TrackNotFound(track_id))?;
        update.apply_to(track);
        info!(track = %track.name, trim_start = track.trim_start, trim_end = ?track.trim_end, "Track saved");
        Ok(())
    }
}

// ── Simulated transport ────────────────────────────────────────

#[derive(Debug, Default)]
struct DemoTransport {
    /// Track, start time and wall-clock start of the current run.
    run: Option<(TrackId, f64, Instant)>,
    loop_region: Option<(f64, f64)>,
}

impl Transport for DemoTransport {
    fn play(&mut self, track_id: TrackId, at: f64) {
        info!(track = %track_id, at, "Play");
        self.run = Some((track_id, at, Instant::now()));
    }

    fn stop(&mut self) {
        info!("Stop");
        self.run = None;
        self.loop_region = None;
    }

    fn set_loop_region(&mut self, start: f64, end: f64) {
        info!(start, end, "Loop region set");
        self.loop_region = Some((start, end));
    }
}

impl DemoTransport {
    /// Advance playback and return the current position.
    fn tick(&mut self, tracks: &[Track], now: Instant) -> Option<PlaybackPosition> {
        let (track_id, at, started) = self.run?;
        let mut time = at + now.saturating_duration_since(started).as_secs_f64();
        if let Some((start, end)) = self.loop_region {
            if time >= end && end > start {
                time = start + (time - start) % (end - start);
            }
        }
        let index = tracks.iter().position(|t| t.id == track_id)?;
        let track = &tracks[index];
        if time >= track.effective_trim_end() {
            match tracks.get(index + 1) {
                Some(next) => {
                    self.run = Some((next.id, next.trim_start, now));
                    return Some(PlaybackPosition {
                        track_id: Some(next.id),
                        time: next.trim_start,
                        playing: true,
                    });
                }
                None => {
                    self.stop();
                    return Some(PlaybackPosition {
                        track_id: Some(track_id),
                        time: track.effective_trim_end(),
                        playing: false,
                    });
                }
            }
        }
        Some(PlaybackPosition {
            track_id: Some(track_id),
            time,
            playing: true,
        })
    }
}

// ── Synthetic material ─────────────────────────────────────────

fn demo_tracks() -> Vec<Track> {
    let mut intro = Track::new("Opening Groove", 214.0).with_beat_grid(122.0, 0.42);
    intro.cue_points.push(CuePoint::new(64.0, "Drop", CueKind::Marker));
    intro.crossfade_curve = CurveType::EqualPower;

    let mut middle = Track::new("Night Drive", 248.0).with_beat_grid(124.0, 0.18);
    middle.trim_start = 12.0;
    middle.crossfade_duration = Some(12.0);
    middle.crossfade_curve = CurveType::SCurve;

    let closer = Track::new("Last Light", 186.0);
    vec![intro, middle, closer]
}

/// Deterministic envelope with some band movement.
fn demo_peaks(track: &Track, seed: f64) -> PeakSet {
    let n = (track.duration * PEAKS_PER_SECOND).round().max(1.0) as usize;
    let envelope = |i: usize, rate: f64, phase: f64| -> f32 {
        let t = i as f64 / PEAKS_PER_SECOND;
        let swell = 0.55 + 0.35 * (t / track.duration * std::f64::consts::PI).sin();
        let beat = 0.5 + 0.5 * (t * rate + phase + seed).sin().abs();
        (swell * beat).clamp(0.0, 1.0) as f32
    };
    let overall = (0..n).map(|i| envelope(i, 6.4, 0.0)).collect();
    let low = (0..n).map(|i| envelope(i, 6.4, 0.3) * 0.9).collect();
    let mid = (0..n).map(|i| envelope(i, 2.1, 1.1) * 0.7).collect();
    let high = (0..n).map(|i| envelope(i, 13.0, 2.0) * 0.5).collect();
    PeakSet::with_bands(overall, low, mid, high)
}

// ── App ────────────────────────────────────────────────────────

struct MixlineApp {
    project: Project,
    peaks: HashMap<TrackId, PeakSet>,
    transport: DemoTransport,
    clock: Arc<PlayheadClock>,
    canvas: TimelineCanvas,
    status: String,
}

impl MixlineApp {
    fn new(cc: &eframe::CreationContext<'_>, config: EngineConfig) -> Self {
        Theme::apply(&cc.egui_ctx);

        let tracks = demo_tracks();
        let peaks = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, demo_peaks(t, i as f64)))
            .collect();
        let clock = Arc::new(PlayheadClock::new());
        clock.publish(PlaybackPosition {
            track_id: tracks.first().map(|t| t.id),
            time: tracks.first().map_or(0.0, |t| t.trim_start),
            playing: false,
        });
        let store = SharedStore::shared(ViewState::default());
        let canvas = TimelineCanvas::new(config, store, Arc::clone(&clock));

        Self {
            project: Project { tracks },
            peaks,
            transport: DemoTransport::default(),
            clock,
            canvas,
            status: String::new(),
        }
    }

    fn toggle_playback(&mut self) {
        let position = self.clock.position();
        if position.playing {
            self.transport.stop();
            self.clock.publish(PlaybackPosition {
                playing: false,
                ..position
            });
        } else if let Some(track_id) = position.track_id {
            self.transport.play(track_id, position.time);
        }
    }

    fn handle(&mut self, action: TimelineAction) {
        match action {
            TimelineAction::Seek { track_id, time } => {
                let playing = self.clock.position().playing;
                if playing {
                    self.transport.play(track_id, time);
                }
                self.clock.publish(PlaybackPosition {
                    track_id: Some(track_id),
                    time,
                    playing,
                });
            }
            TimelineAction::Committed { track_id } => {
                self.status = format!("Saved {}", self.track_name(track_id));
            }
            TimelineAction::CommitRejected { track_id, reason } => {
                self.status = format!("Could not save {}: {}", self.track_name(track_id), reason);
            }
            TimelineAction::SelectionChanged(selection) => {
                self.status = match selection {
                    Some(sel) => format!("Selected {:.2}s - {:.2}s", sel.start, sel.end),
                    None => String::new(),
                };
            }
        }
    }

    fn track_name(&self, track_id: TrackId) -> &str {
        self.project
            .tracks
            .iter()
            .find(|t| t.id == track_id)
            .map_or("track", |t| t.name.as_str())
    }
}

impl eframe::App for MixlineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if let Some(position) = self.transport.tick(&self.project.tracks, now) {
            self.clock.publish(position);
        }
        if self.clock.position().playing {
            ctx.request_repaint();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.toggle_playback();
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let position = self.clock.position();
                let label = if position.playing { "Stop" } else { "Play" };
                if ui.button(label).clicked() {
                    self.toggle_playback();
                }
                ui.label(
                    egui::RichText::new(format!("{:.2}s", position.time))
                        .size(Theme::FONT_SM)
                        .color(Theme::t2()),
                );
                ui.separator();
                ui.label(egui::RichText::new(&self.status).size(Theme::FONT_XS).color(Theme::t3()));
            });
        });

        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            let tracks = self.project.tracks.clone();
            actions = self.canvas.show(
                ui,
                TimelineInput {
                    tracks: &tracks,
                    peaks: &self.peaks,
                    now,
                    updater: &mut self.project,
                    transport: &mut self.transport,
                },
            );
        });
        for action in actions {
            self.handle(action);
        }
    }
}

impl Drop for MixlineApp {
    fn drop(&mut self) {
        let results = self.canvas.flush(&mut self.project);
        if !results.is_empty() {
            info!(count = results.len(), "Flushed pending edits on exit");
        }
    }
}
