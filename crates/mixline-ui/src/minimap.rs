//! Minimap strip above the timeline.

use crate::theme::Theme;
use egui::{Color32, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions, Vec2};
use mixline_core::{Color, PeakSet, Track, TrackId};
use mixline_render::Minimap;
use mixline_timeline::{TrackLayout, ViewState, ViewportSync};
use std::collections::HashMap;

const MINIMAP_HEIGHT: f32 = 28.0;

/// Overview of the whole timeline with a draggable viewport rectangle.
#[derive(Default)]
pub struct MinimapView {
    minimap: Option<Minimap>,
    texture: Option<TextureHandle>,
    /// Layout and width the cached overview was built for.
    built_for: Option<(TrackLayout, u32)>,
}

impl MinimapView {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        layout: &TrackLayout,
        tracks: &[Track],
        peaks: &HashMap<TrackId, PeakSet>,
        state: &ViewState,
        viewport: &mut ViewportSync,
    ) -> egui::Response {
        let width = ui.available_width().max(1.0);
        let (response, painter) =
            ui.allocate_painter(Vec2::new(width, MINIMAP_HEIGHT), Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, Theme::RADIUS, Theme::bg2());

        let width_px = width.round() as u32;
        let stale = self
            .built_for
            .as_ref()
            .map_or(true, |(l, w)| l != layout || *w != width_px);
        if stale {
            let minimap =
                Minimap::build(layout, tracks, width as f64, MINIMAP_HEIGHT as f64, |id| {
                    peaks.get(&id)
                });
            let bitmap = minimap.render(Color::WAVEFORM);
            self.texture = (bitmap.width() > 0 && bitmap.height() > 0).then(|| {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [bitmap.width() as usize, bitmap.height() as usize],
                    bitmap.as_bytes(),
                );
                ui.ctx()
                    .load_texture("mixline-minimap", image, TextureOptions::LINEAR)
            });
            self.minimap = Some(minimap);
            self.built_for = Some((layout.clone(), width_px));
        }

        if let Some(texture) = &self.texture {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }

        let Some(minimap) = &self.minimap else {
            return response;
        };
        let view = minimap.viewport_rect(state.scroll_position, state.viewport_width);
        let view_rect = Rect::from_min_size(
            Pos2::new(rect.left() + view.x as f32, rect.top()),
            Vec2::new(view.width as f32, rect.height()),
        );
        painter.rect_filled(view_rect, 2.0, Theme::white_04());
        painter.rect_stroke(view_rect, 2.0, Stroke::new(Theme::STROKE_EMPHASIS, Theme::accent()));

        if response.clicked() || response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                let x = (pos.x - rect.left()) as f64;
                let scroll = minimap.scroll_for_x(x, state.viewport_width);
                viewport.scroll_to(scroll, layout.total_width());
            }
        }
        response
    }
}
