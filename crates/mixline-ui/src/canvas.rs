//! egui timeline canvas.
//!
//! Hosts the engine components behind one widget: layout, waveform tiles,
//! hit testing, drag editing, region selection, scroll/zoom sync and the
//! playhead. The widget owns no project data; the host passes the committed
//! tracks in every frame and persists edits through [`TrackUpdater`].

use crate::minimap::MinimapView;
use crate::theme::Theme;
use egui::{
    Color32, CursorIcon, Pos2, Rect, Rounding, Sense, Shape, Stroke, TextureHandle,
    TextureOptions, Vec2,
};
use mixline_core::{
    sample_curve, CueKind, CuePoint, EngineConfig, PeakSet, SnapMode, Track, TrackId, TrackUpdate,
};
use mixline_render::{DisposalQueue, TileBitmap, TileCache, TileRequest};
use mixline_timeline::{
    CommitResult, DragGesture, DragHandler, EditDrag, EditSession, EditTarget, ElementRole, Hit,
    HitTester, PlayheadClock, PlayheadTransform, PointerHost, PointerId, RegionSelector,
    SelectionEdge, SelectionRegion, StateContainer, SubscriptionId, TrackLayout, TrackUpdater,
    Transport, TrimEdge, ViewState, ViewportSync,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const POINTER: PointerId = PointerId(0);
const RULER_HEIGHT: f32 = 20.0;
const MIN_GRID_SPACING: f64 = 6.0;

// ── Actions ────────────────────────────────────────────────────

/// Events the host may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineAction {
    Seek { track_id: TrackId, time: f64 },
    Committed { track_id: TrackId },
    CommitRejected { track_id: TrackId, reason: String },
    SelectionChanged(Option<SelectionRegion>),
}

/// Per-frame inputs from the host.
pub struct TimelineInput<'a> {
    /// Committed tracks in timeline order.
    pub tracks: &'a [Track],
    pub peaks: &'a HashMap<TrackId, PeakSet>,
    pub now: Instant,
    pub updater: &'a mut dyn TrackUpdater,
    pub transport: &'a mut dyn Transport,
}

// ── Pointer host ───────────────────────────────────────────────

/// egui routes a drag to the widget that started it, so capture only has to
/// be tracked. Text selection is switched off through the style.
struct EguiPointerHost<'a> {
    ctx: &'a egui::Context,
    captured: &'a mut Option<PointerId>,
}

impl PointerHost for EguiPointerHost<'_> {
    fn capture_pointer(&mut self, pointer: PointerId) {
        *self.captured = Some(pointer);
    }

    fn release_pointer(&mut self, pointer: PointerId) {
        if *self.captured == Some(pointer) {
            *self.captured = None;
        }
    }

    fn set_text_selection_enabled(&mut self, enabled: bool) {
        self.ctx
            .style_mut(|style| style.interaction.selectable_labels = enabled);
    }
}

// ── Drag adapters ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum BodyOutcome {
    None,
    Clicked,
    Released(Option<SelectionRegion>),
}

/// Drag on the track body draws out a region selection.
struct BodyDrag<'a> {
    regions: &'a mut RegionSelector,
    track: &'a Track,
    layout: &'a TrackLayout,
    origin_x: f64,
    outcome: &'a mut BodyOutcome,
}

impl DragHandler for BodyDrag<'_> {
    fn on_drag_start(&mut self) {}

    fn on_drag_move(&mut self, dx: f64) {
        let x = self.origin_x + dx;
        if let Some(time) = self.layout.x_to_time(self.track.id, x) {
            self.regions.drag(self.track, time, x);
        }
    }

    fn on_drag_end(&mut self, dx: f64) {
        self.on_drag_move(dx);
        *self.outcome = BodyOutcome::Released(self.regions.release());
    }

    fn on_click(&mut self) {
        self.regions.release();
        *self.outcome = BodyOutcome::Clicked;
    }
}

/// Drag on an edge of the active selection.
struct SelectionEdgeDrag<'a> {
    regions: &'a mut RegionSelector,
    track: &'a Track,
    edge: SelectionEdge,
    pixels_per_second: f64,
    snap: SnapMode,
    outcome: &'a mut BodyOutcome,
}

impl DragHandler for SelectionEdgeDrag<'_> {
    fn on_drag_start(&mut self) {
        self.regions.begin_edge(self.edge);
    }

    fn on_drag_move(&mut self, dx: f64) {
        self.regions
            .drag_edge(self.track, dx, self.pixels_per_second, self.snap);
    }

    fn on_drag_end(&mut self, dx: f64) {
        self.on_drag_move(dx);
        self.regions.end_edge();
        *self.outcome = BodyOutcome::Released(self.regions.active());
    }
}

struct NoopDrag;

impl DragHandler for NoopDrag {
    fn on_drag_start(&mut self) {}
    fn on_drag_move(&mut self, _dx: f64) {}
    fn on_drag_end(&mut self, _dx: f64) {}
}

#[derive(Debug, Clone, Copy)]
struct Press {
    hit: Hit,
    origin_x: f64,
    /// Last pointer position seen while pressed, in timeline coordinates.
    last: mixline_core::Vec2,
}

impl Press {
    fn new(hit: Hit, at: mixline_core::Vec2) -> Self {
        Self {
            hit,
            origin_x: at.x,
            last: at,
        }
    }

    fn track(&mut self, pos: mixline_core::Vec2) {
        self.last = pos;
    }

    /// Where the gesture finishes if the release is never seen in the window.
    fn release_point(&self) -> mixline_core::Vec2 {
        self.last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerPhase {
    Move,
    Up,
}

// ── Canvas ─────────────────────────────────────────────────────

/// The timeline widget.
pub struct TimelineCanvas {
    config: EngineConfig,
    store: Arc<dyn StateContainer<ViewState>>,
    viewport: ViewportSync,
    edits: EditSession,
    regions: RegionSelector,
    gesture: DragGesture,
    hit_tester: HitTester,
    press: Option<Press>,
    captured: Option<PointerId>,
    cache: TileCache,
    disposal: DisposalQueue,
    textures: HashMap<u64, TextureHandle>,
    clock: Arc<PlayheadClock>,
    layout: Arc<Mutex<TrackLayout>>,
    playhead: Arc<Mutex<PlayheadTransform>>,
    clock_subscription: SubscriptionId,
    last_view_scroll: f64,
    minimap: MinimapView,
}

impl TimelineCanvas {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn StateContainer<ViewState>>,
        clock: Arc<PlayheadClock>,
    ) -> Self {
        let disposal = DisposalQueue::new();
        let layout = Arc::new(Mutex::new(TrackLayout::default()));
        let playhead = Arc::new(Mutex::new(PlayheadTransform::default()));
        let clock_subscription = clock.bind_transform(Arc::clone(&layout), Arc::clone(&playhead));
        Self {
            viewport: ViewportSync::new(Arc::clone(&store), &config),
            edits: EditSession::new(&config),
            regions: RegionSelector::new(Arc::clone(&store), &config),
            gesture: DragGesture::new(config.drag_threshold),
            hit_tester: HitTester::default(),
            press: None,
            captured: None,
            cache: TileCache::new(&config).with_disposer(disposal.clone()),
            disposal,
            textures: HashMap::new(),
            clock,
            layout,
            playhead,
            clock_subscription,
            last_view_scroll: 0.0,
            minimap: MinimapView::default(),
            config,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn StateContainer<ViewState>> {
        &self.store
    }

    pub fn edits(&self) -> &EditSession {
        &self.edits
    }

    /// Commit everything still pending, e.g. on shutdown.
    pub fn flush(&mut self, updater: &mut dyn TrackUpdater) -> Vec<CommitResult> {
        self.edits.flush(updater)
    }

    /// Drop cached waveform tiles of a track whose peaks changed.
    pub fn invalidate_track(&mut self, track_id: TrackId) {
        self.cache.invalidate(track_id);
    }

    /// Draw the timeline and handle its input.
    pub fn show(&mut self, ui: &mut egui::Ui, mut input: TimelineInput<'_>) -> Vec<TimelineAction> {
        let mut actions = Vec::new();
        for id in self.disposal.drain() {
            self.textures.remove(&id);
        }

        for result in self.edits.poll(input.now, input.updater) {
            actions.push(match result {
                CommitResult::Committed { track_id, .. } => TimelineAction::Committed { track_id },
                CommitResult::Rejected {
                    track_id, error, ..
                } => TimelineAction::CommitRejected {
                    track_id,
                    reason: error.to_string(),
                },
            });
        }

        let state = self.store.get();
        let pps = state.pixels_per_second(&self.config);
        let tracks = self.edits.effective_tracks(input.tracks);
        let layout = TrackLayout::compute(&tracks, pps, self.config.default_crossfade_seconds);
        *self.layout.lock() = layout.clone();

        let position = self.clock.position();
        let transform = PlayheadTransform::from_position(&layout, &position);
        *self.playhead.lock() = transform;
        if transform.visible {
            self.viewport
                .follow_playhead(transform.x, &position, layout.total_width());
        }

        ui.vertical(|ui| {
            self.draw_toolbar(ui, &tracks, &mut input, &mut actions);
            let state = self.store.get();
            self.minimap
                .show(ui, &layout, &tracks, input.peaks, &state, &mut self.viewport);
            self.draw_body(ui, &tracks, &layout, &mut input, &mut actions);
        });

        if let Some(deadline) = self.edits.next_deadline() {
            ui.ctx()
                .request_repaint_after(deadline.saturating_duration_since(input.now));
        }
        actions
    }

    // ── Toolbar ────────────────────────────────────────────────

    fn draw_toolbar(
        &mut self,
        ui: &mut egui::Ui,
        tracks: &[Track],
        input: &mut TimelineInput<'_>,
        actions: &mut Vec<TimelineAction>,
    ) {
        let state = self.store.get();
        let default_crossfade = self.config.default_crossfade_seconds;
        let total_at =
            |pps: f64| TrackLayout::compute(tracks, pps, default_crossfade).total_width();

        ui.horizontal(|ui| {
            if ui.button("−").on_hover_text("Zoom out").clicked() {
                self.viewport.zoom_out(&total_at);
            }
            ui.label(
                egui::RichText::new(format!("{:.0}%", state.zoom_level * 100.0))
                    .size(Theme::FONT_XS)
                    .color(Theme::t2()),
            );
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.viewport.zoom_in(&total_at);
            }
            ui.separator();

            if ui
                .selectable_label(state.snap_mode == SnapMode::Beat, "Beat snap")
                .clicked()
            {
                self.store
                    .update(&mut |s: &mut ViewState| s.snap_mode = s.snap_mode.toggled());
            }
            if ui
                .selectable_label(state.frequency_colors, "Frequency colors")
                .clicked()
            {
                self.store
                    .update(&mut |s: &mut ViewState| s.frequency_colors = !s.frequency_colors);
            }
            ui.separator();

            let has_selection = state.selection.is_some();
            if ui
                .add_enabled(has_selection, egui::Button::new("Trim to selection"))
                .clicked()
            {
                let selected = find(tracks, state.selection.map(|sel| sel.track_id));
                if let Some((track_id, update)) =
                    selected.and_then(|track| self.regions.trim_to_selection(track))
                {
                    self.edits.propose(track_id, update, input.now);
                    self.regions.clear();
                    actions.push(TimelineAction::SelectionChanged(None));
                }
            }
            if ui
                .add_enabled(has_selection, egui::Button::new("Play selection"))
                .clicked()
            {
                self.regions.play_selection(input.transport);
            }
            if ui
                .add_enabled(has_selection, egui::Button::new("Clear"))
                .clicked()
            {
                self.regions.clear();
                actions.push(TimelineAction::SelectionChanged(None));
            }
        });
    }

    // ── Body ───────────────────────────────────────────────────

    fn draw_body(
        &mut self,
        ui: &mut egui::Ui,
        tracks: &[Track],
        layout: &TrackLayout,
        input: &mut TimelineInput<'_>,
        actions: &mut Vec<TimelineAction>,
    ) {
        let state = self.store.get();
        let content = Vec2::new(
            layout.total_width().max(1.0) as f32,
            RULER_HEIGHT + self.hit_tester.lane_height as f32,
        );
        let target = self.viewport.programmatic_target();
        let mut area = egui::ScrollArea::horizontal()
            .id_salt("mixline-timeline")
            .auto_shrink([false, true])
            .drag_to_scroll(false);
        if let Some(t) = target {
            area = area.horizontal_scroll_offset(t as f32);
        }

        let output = area.show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(content, Sense::click_and_drag());
            let visible = ui.clip_rect().intersect(response.rect);
            self.paint(ui.ctx(), &painter, response.rect, visible, tracks, layout, input.peaks, &state);
            self.interact(ui, &response, tracks, layout, &state, input, actions);
        });

        self.viewport
            .set_viewport_width(output.inner_rect.width() as f64);
        let offset = output.state.offset.x as f64;
        if target.is_some() || (offset - self.last_view_scroll).abs() > 0.5 {
            let playing = self.clock.position().playing;
            self.viewport.on_view_scroll(offset, playing);
        }
        self.last_view_scroll = offset;

        let zoom_delta = ui.input(|i| i.zoom_delta()) as f64;
        if zoom_delta != 1.0 {
            if let Some(hover) = ui.input(|i| i.pointer.hover_pos()) {
                if output.inner_rect.contains(hover) {
                    let default_crossfade = self.config.default_crossfade_seconds;
                    let total_at = |pps: f64| {
                        TrackLayout::compute(tracks, pps, default_crossfade).total_width()
                    };
                    let cursor = (hover.x - output.inner_rect.left()) as f64;
                    self.viewport
                        .zoom_around(state.zoom_level * zoom_delta, cursor, &total_at);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn interact(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        tracks: &[Track],
        layout: &TrackLayout,
        state: &ViewState,
        input: &mut TimelineInput<'_>,
        actions: &mut Vec<TimelineAction>,
    ) {
        let origin = response.rect.min;
        let to_timeline = |p: Pos2| {
            mixline_core::Vec2::new((p.x - origin.x) as f64, (p.y - origin.y - RULER_HEIGHT) as f64)
        };
        let hit_tester = self.hit_tester;
        let hit_at = |p: Pos2| {
            hit_tester.hit_test(layout, tracks, state.selection.as_ref(), to_timeline(p))
        };

        if self.press.is_none() {
            if let Some(hover) = response.hover_pos() {
                match hit_at(hover).role {
                    ElementRole::TrimHandle(_)
                    | ElementRole::CrossfadeEdge
                    | ElementRole::SelectionEdge(_) => {
                        ui.ctx().set_cursor_icon(CursorIcon::ResizeHorizontal)
                    }
                    ElementRole::CueMarker(_) => ui.ctx().set_cursor_icon(CursorIcon::Grab),
                    _ => {}
                }
            }
        }

        let (pressed, released, pointer) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });

        if let Some(pos) = pointer {
            let tpos = to_timeline(pos);
            if pressed && self.press.is_none() && response.hovered() {
                let hit = hit_at(pos);
                if let (Some(track_id), Some(time)) = (hit.track_id, hit.time) {
                    self.regions.press(hit.role, track_id, time, tpos.x);
                }
                self.press = Some(Press::new(hit, tpos));
                let mut host = EguiPointerHost {
                    ctx: ui.ctx(),
                    captured: &mut self.captured,
                };
                self.gesture.pointer_down(POINTER, tpos, &mut host);
            } else if let Some(press) = self.press.as_mut() {
                press.track(tpos);
                let phase = if released {
                    PointerPhase::Up
                } else {
                    PointerPhase::Move
                };
                self.dispatch(ui.ctx(), phase, tpos, tracks, layout, state, input.now, actions);
            }
        }
        if released && self.press.is_some() && self.gesture.is_pressed() {
            // Released outside the window: finish where the pointer was last seen.
            let at = self.press.map(|p| p.release_point()).unwrap_or_default();
            self.dispatch(ui.ctx(), PointerPhase::Up, at, tracks, layout, state, input.now, actions);
        }
        if !self.gesture.is_pressed() {
            self.press = None;
        }

        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let hit = hit_at(pos);
                if let (ElementRole::TrackBody, Some(track), Some(time)) =
                    (hit.role, find(tracks, hit.track_id), hit.time)
                {
                    let label = format!("Cue {}", track.cue_points.len() + 1);
                    let update = track.propose_cue_point(
                        CuePoint::new(time, label, CueKind::Marker),
                        self.config.min_trim_gap,
                    );
                    self.edits.propose(track.id, update, input.now);
                }
            }
        }

        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let hit = hit_at(pos);
                let update = find(tracks, hit.track_id).and_then(|track| match hit.role {
                    ElementRole::CueMarker(id) => track.propose_cue_removal(id),
                    ElementRole::CrossfadeEdge => Some(TrackUpdate {
                        crossfade_curve: Some(track.crossfade_curve.next()),
                        ..Default::default()
                    }),
                    _ => None,
                });
                if let (Some(track_id), Some(update)) = (hit.track_id, update) {
                    self.edits.propose(track_id, update, input.now);
                }
            }
        }

        // In/out points at the playhead.
        let (set_in, set_out) = ui.input(|i| (i.key_pressed(egui::Key::I), i.key_pressed(egui::Key::O)));
        if set_in || set_out {
            let position = self.clock.position();
            if let Some(track) = find(tracks, position.track_id) {
                let (kind, label) = if set_in {
                    (CueKind::TrimStart, "In")
                } else {
                    (CueKind::TrimEnd, "Out")
                };
                let update = track.propose_cue_point(
                    CuePoint::new(position.time, label, kind),
                    self.config.min_trim_gap,
                );
                self.edits.propose(track.id, update, input.now);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &mut self,
        ctx: &egui::Context,
        phase: PointerPhase,
        pos: mixline_core::Vec2,
        tracks: &[Track],
        layout: &TrackLayout,
        state: &ViewState,
        now: Instant,
        actions: &mut Vec<TimelineAction>,
    ) {
        let Some(press) = self.press else {
            return;
        };
        let index = press
            .hit
            .track_id
            .and_then(|id| tracks.iter().position(|t| t.id == id));
        let track = index.map(|i| &tracks[i]);
        let next = index.and_then(|i| tracks.get(i + 1));
        let pps = layout.pixels_per_second();
        let snap = state.snap_mode;
        let target = match press.hit.role {
            ElementRole::TrimHandle(TrimEdge::Start) => Some(EditTarget::TrimStart),
            ElementRole::TrimHandle(TrimEdge::End) => Some(EditTarget::TrimEnd),
            ElementRole::CueMarker(id) => Some(EditTarget::Cue(id)),
            ElementRole::CrossfadeEdge => Some(EditTarget::Crossfade),
            _ => None,
        };

        let mut outcome = BodyOutcome::None;
        let mut host = EguiPointerHost {
            ctx,
            captured: &mut self.captured,
        };
        {
            let mut handler: Box<dyn DragHandler + '_> = match (press.hit.role, target, track) {
                (_, Some(target), Some(track)) => Box::new(EditDrag {
                    session: &mut self.edits,
                    track,
                    next,
                    target,
                    pixels_per_second: pps,
                    snap,
                    now,
                }),
                (ElementRole::SelectionEdge(edge), _, Some(track)) => Box::new(SelectionEdgeDrag {
                    regions: &mut self.regions,
                    track,
                    edge,
                    pixels_per_second: pps,
                    snap,
                    outcome: &mut outcome,
                }),
                (ElementRole::TrackBody, _, Some(track)) => Box::new(BodyDrag {
                    regions: &mut self.regions,
                    track,
                    layout,
                    origin_x: press.origin_x,
                    outcome: &mut outcome,
                }),
                _ => Box::new(NoopDrag),
            };
            match phase {
                PointerPhase::Move => {
                    self.gesture
                        .pointer_move(POINTER, pos, &mut host, handler.as_mut())
                }
                PointerPhase::Up => {
                    let result = self
                        .gesture
                        .pointer_up(POINTER, pos, &mut host, handler.as_mut());
                    debug!(?result, role = ?press.hit.role, "Pointer released");
                }
            }
        }

        match outcome {
            BodyOutcome::Clicked => {
                if let (Some(track_id), Some(time)) = (press.hit.track_id, press.hit.time) {
                    actions.push(TimelineAction::Seek { track_id, time });
                }
            }
            BodyOutcome::Released(selection) => {
                actions.push(TimelineAction::SelectionChanged(selection));
            }
            BodyOutcome::None => {}
        }
    }

    // ── Painting ───────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn paint(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        rect: Rect,
        visible: Rect,
        tracks: &[Track],
        layout: &TrackLayout,
        peaks: &HashMap<TrackId, PeakSet>,
        state: &ViewState,
    ) {
        painter.rect_filled(visible, 0.0, Theme::bg());
        let ruler = Rect::from_min_max(rect.min, Pos2::new(rect.right(), rect.top() + RULER_HEIGHT));
        draw_ruler(painter, ruler, visible, layout.pixels_per_second());

        let lane_top = rect.top() + RULER_HEIGHT;
        let lane_height = self.hit_tester.lane_height as f32;
        let cue_strip = self.hit_tester.cue_strip_height as f32;
        let xfade_strip = self.hit_tester.crossfade_strip_height as f32;
        let pps = layout.pixels_per_second();

        for (i, (pos, track)) in layout.positions().iter().zip(tracks).enumerate() {
            let track_rect = Rect::from_min_size(
                Pos2::new(rect.left() + pos.left as f32, lane_top),
                Vec2::new(pos.width as f32, lane_height),
            );
            if !track_rect.intersects(visible) {
                continue;
            }
            let clipped = painter.with_clip_rect(track_rect.intersect(visible));
            clipped.rect_filled(track_rect, Rounding::same(Theme::RADIUS), Theme::track_bg(i));

            // Waveform
            if let Some(track_peaks) = peaks.get(&track.id) {
                let wave_rect = Rect::from_min_max(
                    Pos2::new(track_rect.left(), track_rect.top() + cue_strip),
                    Pos2::new(track_rect.right(), track_rect.bottom() - xfade_strip),
                );
                self.paint_waveform(ctx, &clipped, rect, wave_rect, visible, pos.left, track, track_peaks, pps, state);
            }

            // Beat grid
            if state.snap_mode == SnapMode::Beat {
                if let Some(grid) = track.beat_grid().filter(|g| g.interval() * pps >= MIN_GRID_SPACING) {
                    for t in grid.beats_in(track.trim_start, track.effective_trim_end()) {
                        if let Some(x) = layout.time_to_x(track.id, t) {
                            let x = rect.left() + x as f32;
                            clipped.line_segment(
                                [Pos2::new(x, track_rect.top() + cue_strip), Pos2::new(x, track_rect.bottom())],
                                Stroke::new(Theme::STROKE_SUBTLE, Theme::white_10()),
                            );
                        }
                    }
                }
            }

            // Crossfade
            if pos.crossfade_width > 0.0 {
                let xf = Rect::from_min_max(
                    Pos2::new(rect.left() + pos.crossfade_left() as f32, track_rect.top()),
                    track_rect.max,
                );
                painter.rect_filled(xf, 0.0, Theme::with_alpha(Theme::accent(), 24));
                let samples = sample_curve(track.crossfade_curve, 32);
                let curve = |values: &[f32]| -> Vec<Pos2> {
                    let n = values.len().saturating_sub(1).max(1) as f32;
                    values
                        .iter()
                        .enumerate()
                        .map(|(k, v)| {
                            Pos2::new(
                                xf.left() + xf.width() * k as f32 / n,
                                xf.bottom() - xfade_strip - v * (xf.height() - cue_strip - xfade_strip),
                            )
                        })
                        .collect()
                };
                painter.add(Shape::line(curve(&samples.fade_out), Stroke::new(1.0, Theme::amber())));
                painter.add(Shape::line(curve(&samples.fade_in), Stroke::new(1.0, Theme::green())));
                painter.rect_filled(
                    Rect::from_min_max(Pos2::new(xf.left() - 2.0, xf.bottom() - xfade_strip), Pos2::new(xf.left() + 2.0, xf.bottom())),
                    1.0,
                    Theme::accent(),
                );
                painter.text(
                    Pos2::new(xf.center().x, xf.bottom() - xfade_strip / 2.0),
                    egui::Align2::CENTER_CENTER,
                    track.crossfade_curve.label(),
                    egui::FontId::proportional(Theme::FONT_XS),
                    Theme::t2(),
                );
            }

            // Cue markers
            for cue in &track.cue_points {
                let Some(x) = layout.time_to_x(track.id, cue.timestamp) else {
                    continue;
                };
                let x = rect.left() + x as f32;
                let color = if cue.kind.is_trim() { Theme::green() } else { Theme::amber() };
                let r = self.hit_tester.cue_radius as f32;
                painter.add(Shape::convex_polygon(
                    vec![
                        Pos2::new(x - r, track_rect.top()),
                        Pos2::new(x + r, track_rect.top()),
                        Pos2::new(x, track_rect.top() + cue_strip * 0.8),
                    ],
                    color,
                    Stroke::NONE,
                ));
                clipped.line_segment(
                    [Pos2::new(x, track_rect.top() + cue_strip), Pos2::new(x, track_rect.bottom())],
                    Stroke::new(1.0, Theme::with_alpha(color, 120)),
                );
            }

            // Trim handles
            let handle = self.hit_tester.handle_width as f32;
            for hx in [track_rect.left(), track_rect.right() - handle] {
                clipped.rect_filled(
                    Rect::from_min_size(Pos2::new(hx, track_rect.top() + cue_strip), Vec2::new(handle, lane_height - cue_strip - xfade_strip)),
                    1.0,
                    Theme::white_25(),
                );
            }

            clipped.text(
                Pos2::new(track_rect.left() + handle + Theme::SPACE_XS, track_rect.top() + cue_strip + Theme::SPACE_XS),
                egui::Align2::LEFT_TOP,
                &track.name,
                egui::FontId::proportional(Theme::FONT_SM),
                Theme::t1(),
            );
        }

        // Selection
        if let Some(sel) = self.regions.pending().or(state.selection) {
            if let (Some(x0), Some(x1)) = (
                layout.time_to_x(sel.track_id, sel.start),
                layout.time_to_x(sel.track_id, sel.end),
            ) {
                let sel_rect = Rect::from_min_max(
                    Pos2::new(rect.left() + x0 as f32, lane_top),
                    Pos2::new(rect.left() + x1 as f32, lane_top + lane_height),
                );
                painter.rect_filled(sel_rect, 0.0, Theme::with_alpha(Theme::accent(), 40));
                painter.rect_stroke(sel_rect, 0.0, Stroke::new(Theme::STROKE_EMPHASIS, Theme::accent()));
            }
        }

        // Playhead
        let playhead = *self.playhead.lock();
        if playhead.visible {
            let x = rect.left() + playhead.x as f32;
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, lane_top + lane_height)],
                Stroke::new(Theme::PLAYHEAD_WIDTH, Theme::red()),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_waveform(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        content: Rect,
        wave_rect: Rect,
        visible: Rect,
        track_left: f64,
        track: &Track,
        peaks: &PeakSet,
        pps: f64,
        state: &ViewState,
    ) {
        // Tiles cover the whole source; trimming only moves and clips them.
        let full_left = track_left - track.trim_start * pps;
        let full_width = track.duration * pps;
        let vis_start = (visible.left() - content.left()) as f64;
        let vis_end = (visible.right() - content.left()) as f64;
        let density = ctx.pixels_per_point();
        let range = self.cache.visible_tile_range(
            vis_start,
            vis_end - vis_start,
            full_left,
            full_width,
            density,
        );
        if range.is_empty() {
            return;
        }
        let request = TileRequest {
            track_id: track.id,
            peaks,
            total_width: full_width,
            height: wave_rect.height() as f64,
            color: mixline_core::Color::WAVEFORM,
            frequency_colors: state.frequency_colors,
            density,
        };
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        for tile in self.cache.get_tiles_in(&request, range) {
            let texture = self
                .textures
                .entry(tile.bitmap.id())
                .or_insert_with(|| upload(ctx, &tile.bitmap));
            let tile_rect = Rect::from_min_size(
                Pos2::new(content.left() + (full_left + tile.x_offset) as f32, wave_rect.top()),
                Vec2::new(tile.width as f32, wave_rect.height()),
            );
            painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
        }
    }
}

impl Drop for TimelineCanvas {
    fn drop(&mut self) {
        self.clock.unsubscribe(self.clock_subscription);
        if self.edits.next_deadline().is_some() {
            warn!("Timeline dropped with uncommitted edits");
        }
    }
}

fn find(tracks: &[Track], id: Option<TrackId>) -> Option<&Track> {
    let id = id?;
    tracks.iter().find(|t| t.id == id)
}

fn upload(ctx: &egui::Context, bitmap: &TileBitmap) -> TextureHandle {
    let image = egui::ColorImage::from_rgba_unmultiplied(
        [bitmap.width() as usize, bitmap.height() as usize],
        bitmap.as_bytes(),
    );
    ctx.load_texture(format!("mixline-tile-{}", bitmap.id()), image, TextureOptions::LINEAR)
}

/// Pick a ruler step so labels are at least ~80 px apart.
fn ruler_step(pixels_per_second: f64) -> f64 {
    const STEPS: [f64; 10] = [1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];
    STEPS
        .iter()
        .copied()
        .find(|s| s * pixels_per_second >= 80.0)
        .unwrap_or(1200.0)
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn draw_ruler(painter: &egui::Painter, ruler: Rect, visible: Rect, pixels_per_second: f64) {
    painter.rect_filled(ruler.intersect(visible), 0.0, Theme::bg2());
    if pixels_per_second <= 0.0 {
        return;
    }
    let step = ruler_step(pixels_per_second);
    let first = (((visible.left() - ruler.left()) as f64 / pixels_per_second) / step).floor() as i64;
    let last = (((visible.right() - ruler.left()) as f64 / pixels_per_second) / step).ceil() as i64;
    for k in first.max(0)..=last {
        let t = k as f64 * step;
        let x = ruler.left() + (t * pixels_per_second) as f32;
        painter.line_segment(
            [Pos2::new(x, ruler.bottom() - 6.0), Pos2::new(x, ruler.bottom())],
            Stroke::new(Theme::STROKE_SUBTLE, Theme::t3()),
        );
        painter.text(
            Pos2::new(x + 3.0, ruler.top() + 2.0),
            egui::Align2::LEFT_TOP,
            format_time(t),
            egui::FontId::proportional(Theme::FONT_XS),
            Theme::t3(),
        );
    }
}
