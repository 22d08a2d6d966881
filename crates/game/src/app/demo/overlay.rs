//! Statistics panel and the dirty-block debug outlines.

use tilegfx::{
    BitmapFont, FillRectMode, FontSize, Gfx, LineStyle, PerformanceElement, PerformanceRegistry,
    PixelColour, Rect, TextColour, TextStyle, ZoomLevel,
};

pub(crate) const PANEL_WIDTH: i32 = 240;
const PANEL_PADDING: i32 = 8;
const DRAW_AVERAGE_POINTS: usize = 32;
const MAX_PICKED_LINES: usize = 6;

const GENERATION_COLOURS: [PixelColour; 6] = [
    PixelColour::RED,
    PixelColour::YELLOW,
    PixelColour::GREEN,
    PixelColour::LIGHT_BLUE,
    PixelColour::PURPLE,
    PixelColour::ORANGE,
];

/// Figures shown in the panel, sampled every few ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PanelStats {
    pub(crate) fps: f64,
    pub(crate) tps: f64,
    pub(crate) draw_ms: f64,
    pub(crate) vehicle_ms: f64,
    pub(crate) vehicles: usize,
    pub(crate) crashed: usize,
    pub(crate) zoom: ZoomLevel,
    pub(crate) generation: u32,
    pub(crate) picked: Vec<String>,
}

impl PanelStats {
    pub(crate) fn sample_perf(&mut self, perf: &PerformanceRegistry) {
        self.fps = perf.rate(PerformanceElement::Video);
        self.tps = perf.rate(PerformanceElement::GameLoop);
        self.draw_ms = perf.average_duration_ms(PerformanceElement::Drawing, DRAW_AVERAGE_POINTS);
        self.vehicle_ms = perf.average_duration_ms(PerformanceElement::GlVehicles, DRAW_AVERAGE_POINTS);
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("FPS {:.1}", self.fps),
            format!("TPS {:.1}", self.tps),
            format!("DRAW {:.2} MS", self.draw_ms),
            format!("VEHICLES {:.2} MS", self.vehicle_ms),
            format!("CARS {} ({} CRASHED)", self.vehicles, self.crashed),
            format!("ZOOM {:?}", self.zoom).to_uppercase(),
            format!("FLUSH {}", self.generation),
        ];
        if !self.picked.is_empty() {
            lines.push("PICKED:".to_string());
            lines.extend(self.picked.iter().take(MAX_PICKED_LINES).cloned());
            if self.picked.len() > MAX_PICKED_LINES {
                lines.push(format!("+{} MORE", self.picked.len() - MAX_PICKED_LINES));
            }
        }
        lines
    }
}

/// Panel rectangle for a screen, right and bottom exclusive.
pub(crate) fn panel_rect(screen_width: i32, screen_height: i32) -> Rect {
    Rect::new((screen_width - PANEL_WIDTH).max(0), 0, screen_width, screen_height)
}

pub(crate) fn paint_panel(gfx: &mut Gfx<'_>, panel: Rect, lines: &[String]) {
    gfx.fill_rect(
        panel.left,
        panel.top,
        panel.right - 1,
        panel.bottom - 1,
        FillRectMode::Opaque(PixelColour::DARK_BLUE),
    );
    gfx.draw_rect_outline(
        Rect::new(panel.left, panel.top, panel.right - 1, panel.bottom - 1),
        LineStyle::solid(PixelColour::LIGHT_BLUE),
    );

    let line_height = BitmapFont::line_height(FontSize::Normal) + 2;
    let left = panel.left + PANEL_PADDING;
    let right = panel.right - PANEL_PADDING;
    let mut top = panel.top + PANEL_PADDING;
    for line in lines {
        if top + line_height > panel.bottom {
            break;
        }
        gfx.draw_string(left, right, top, line, TextStyle::new(TextColour::WHITE));
        top += line_height;
    }
}

/// Colour of the outline drawn around a repainted rectangle; it changes
/// with every flush so consecutive repaints are told apart.
pub(crate) fn generation_colour(generation: u32) -> PixelColour {
    GENERATION_COLOURS[generation as usize % GENERATION_COLOURS.len()]
}

pub(crate) fn paint_dirty_outline(gfx: &mut Gfx<'_>, rect: Rect, generation: u32) {
    gfx.draw_rect_outline(
        Rect::new(rect.left, rect.top, rect.right - 1, rect.bottom - 1),
        LineStyle::solid(generation_colour(generation)),
    );
}
