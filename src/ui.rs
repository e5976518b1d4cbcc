use crate::app::App;
use listing_map::braille::BrailleCanvas;
use listing_map::palette::{tick_label, LegendAxis, Rgb};
use listing_map::render::Tooltip;
use listing_map::Scene;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

/// Opacity of the fills over the (assumed white) page
const FILL_OPACITY: f64 = 0.7;
const LEGEND_CAPTION: &str = " Listings ";
const LEGEND_MAX_CELLS: u16 = 48;

/// Screen regions, shared by drawing and by the app's mouse mapping
pub struct UiLayout {
    pub legend: Rect,
    pub map: Rect,
    pub map_inner: Rect,
    pub scale: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> UiLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Legend bar + tick labels
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Scale bar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    UiLayout {
        legend: chunks[0],
        map: chunks[1],
        map_inner: map_block().inner(chunks[1]),
        scale: chunks[2],
        status: chunks[3],
    }
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Listings per neighbourhood ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let ui = layout(frame.area());

    frame.render_widget(map_block(), ui.map);
    frame.render_widget(
        MapWidget {
            app,
            cursor: app.mouse_pos,
        },
        ui.map_inner,
    );

    if let Some(scene) = app.scene.as_deref() {
        frame.render_widget(
            LegendWidget {
                scene,
                exponent: app.config.palette.legend_exponent,
            },
            ui.legend,
        );
        render_scale_bar(frame, scene, ui.scale);
    }

    if let (Some(tooltip), Some((col, row))) = (app.tooltip.as_ref(), app.mouse_pos) {
        render_tooltip(frame, tooltip, col, row, ui.map);
    }

    render_status_bar(frame, app, ui.status);
}

/// Fill colour blended over white, as the SVG export shows it
fn fill_color(rgb: Rgb) -> Color {
    let blend = |c: u8| (c as f64 * FILL_OPACITY + 255.0 * (1.0 - FILL_OPACITY)).round() as u8;
    Color::Rgb(blend(rgb.r), blend(rgb.g), blend(rgb.b))
}

fn outline_color(fill: Option<Rgb>) -> Color {
    match fill {
        Some(fill) if fill.luminance() < 0.5 => Color::Gray,
        _ => Color::DarkGray,
    }
}

/// Filled cells with braille outlines overlaid
struct MapWidget<'a> {
    app: &'a App,
    cursor: Option<(u16, u16)>,
}

impl MapWidget<'_> {
    /// Overlay a braille canvas layer with a specific color
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for col in 0..area.width {
                if let Some(ch) = canvas.glyph(col as usize, row as usize) {
                    buf[(area.x + col, area.y + row)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for col in 0..area.width {
                if let Some(fill) = self.app.cell_fill(col, row) {
                    buf[(area.x + col, area.y + row)].set_bg(fill_color(fill));
                }
            }
        }

        // Outlines stay readable over both ends of the ramp
        for row in 0..area.height {
            for col in 0..area.width {
                if let Some(ch) = self.app.outlines.glyph(col as usize, row as usize) {
                    let color = outline_color(self.app.cell_fill(col, row));
                    buf[(area.x + col, area.y + row)].set_char(ch).set_fg(color);
                }
            }
        }
        self.render_layer(&self.app.highlight, Color::Yellow, area, buf);

        if let Some((x, y)) = self.cursor {
            if x >= area.x && y >= area.y && x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

/// Threshold buckets laid out on the power axis, with count labels below
struct LegendWidget<'a> {
    scene: &'a Scene,
    exponent: f64,
}

impl Widget for LegendWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let caption_len = LEGEND_CAPTION.chars().count() as u16;
        buf.set_string(area.x, area.y, LEGEND_CAPTION, Style::default().fg(Color::Gray));

        let bar_x = area.x + caption_len;
        let cells = area.width.saturating_sub(caption_len + 2).min(LEGEND_MAX_CELLS);
        if cells == 0 {
            return;
        }

        let palette = &self.scene.palette;
        let axis = LegendAxis::for_palette(palette, self.exponent, cells as f64);

        for bucket in palette.legend_buckets() {
            let x0 = axis.apply(bucket.low).round().max(0.0) as u16;
            let x1 = (axis.apply(bucket.high).round() as u16).min(cells);
            for x in x0..x1 {
                buf[(bar_x + x, area.y)].set_char(' ').set_bg(fill_color(bucket.color));
            }
        }

        if area.height < 2 {
            return;
        }
        let label_y = area.y + 1;
        let mut next_free = 0u16;
        for (x, value) in axis.ticks(palette) {
            let x = x.round().max(0.0) as u16;
            let label = tick_label(value);
            let len = label.chars().count() as u16;
            if x < next_free || x + len > cells + 2 {
                continue;
            }
            buf.set_string(bar_x + x, label_y, &label, Style::default().fg(Color::DarkGray));
            next_free = x + len + 1;
        }
    }
}

/// Scale bar: one cell per two canvas pixels
fn render_scale_bar(frame: &mut Frame, scene: &Scene, area: Rect) {
    let cells = (scene.scale.length_px / 2.0).round().max(1.0) as usize;
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled("━".repeat(cells), Style::default().fg(Color::White)),
        Span::styled(
            format!(" {} km", scene.reference_distance_km),
            Style::default().fg(Color::Gray),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Popup next to the mouse, kept inside the map block
fn render_tooltip(frame: &mut Frame, tooltip: &Tooltip, col: u16, row: u16, bounds: Rect) {
    let content_width = tooltip
        .lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(tooltip.title.chars().count() + 2))
        .max()
        .unwrap_or(0) as u16;
    let width = (content_width + 2).min(bounds.width);
    let height = (tooltip.lines.len() as u16 + 2).min(bounds.height);

    let right = bounds.x + bounds.width;
    let bottom = bounds.y + bounds.height;
    let mut x = col.saturating_add(2);
    if x + width > right {
        x = col.saturating_sub(width + 1).max(bounds.x);
    }
    let mut y = row.saturating_add(1);
    if y + height > bottom {
        y = bottom.saturating_sub(height).max(bounds.y);
    }
    let popup = Rect::new(x, y, width, height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            format!(" {} ", tooltip.title),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    let lines: Vec<Line> = tooltip.lines.iter().map(|l| Line::from(l.as_str())).collect();

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Features: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.feature_count().to_string(), Style::default().fg(Color::Yellow)),
    ];

    if let Some(scene) = app.scene.as_ref() {
        spans.push(Span::styled(" | Listings: ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format!("{}", scene.total_listings),
            Style::default().fg(Color::Yellow),
        ));
    }

    if let Some(name) = app.hovered_feature().and_then(|f| f.feature.name.as_deref()) {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(name.to_string(), Style::default().fg(Color::Cyan)));
    }

    if let Some(err) = app.error.as_deref() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(err.to_string(), Style::default().fg(Color::Red)));
    }

    spans.push(Span::styled(" | r:reload q:quit", Style::default().fg(Color::DarkGray)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_reserves_rows() {
        let ui = layout(Rect::new(0, 0, 80, 30));
        assert_eq!(ui.legend.height, 2);
        assert_eq!(ui.scale.height, 1);
        assert_eq!(ui.status.height, 1);
        assert_eq!(ui.map_inner, Rect::new(1, 3, 78, 24));
    }

    #[test]
    fn test_fill_color_blends_toward_white() {
        assert_eq!(fill_color(Rgb::new(255, 255, 255)), Color::Rgb(255, 255, 255));
        assert_eq!(fill_color(Rgb::new(0, 0, 0)), Color::Rgb(77, 77, 77));
    }

    #[test]
    fn test_outline_color_follows_fill() {
        assert_eq!(outline_color(Some(Rgb::new(0x08, 0x30, 0x6b))), Color::Gray);
        assert_eq!(outline_color(Some(Rgb::new(0xf7, 0xfb, 0xff))), Color::DarkGray);
        assert_eq!(outline_color(None), Color::DarkGray);
    }
}
