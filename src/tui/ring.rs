use ratatui::{
    layout::Rect,
    style::Color,
    widgets::canvas::{Canvas, Points},
    widgets::{Block, Borders},
    Frame,
};

const RING_RADIUS: f64 = 40.0;
const TRACK_COLOR: (u8, u8, u8) = (70, 70, 70);
const ARC_COLOR: (u8, u8, u8) = (80, 200, 255);
const LABEL_COLOR: (u8, u8, u8) = (255, 255, 255);

/// Scale an RGB color toward black. Terminals have no alpha, so opacity is
/// rendered as brightness.
pub fn shade(rgb: (u8, u8, u8), opacity: f32) -> Color {
    let o = opacity.clamp(0.0, 1.0);
    let scale = |c: u8| (c as f32 * o).round() as u8;
    Color::Rgb(scale(rgb.0), scale(rgb.1), scale(rgb.2))
}

/// Points on a circle of `radius`, one per degree, clockwise from 12 o'clock
/// for `degrees` degrees.
pub fn arc_points(degrees: u16, radius: f64) -> Vec<(f64, f64)> {
    (0..degrees.min(360))
        .map(|d| {
            let theta = (90.0 - d as f64).to_radians();
            (radius * theta.cos(), radius * theta.sin())
        })
        .collect()
}

/// Progress ring with the percentage label in the middle.
pub fn draw_ring(area: Rect, f: &mut Frame, angle: u16, label: &str, opacity: f32) {
    let track = arc_points(360, RING_RADIUS);
    let arc: Vec<(f64, f64)> = [RING_RADIUS, RING_RADIUS - 1.5, RING_RADIUS - 3.0]
        .iter()
        .flat_map(|r| arc_points(angle, *r))
        .collect();
    let label = label.to_string();
    let label_x = -(label.chars().count() as f64) * 1.2;

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .x_bounds([-50.0, 50.0])
        .y_bounds([-50.0, 50.0])
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &track,
                color: shade(TRACK_COLOR, opacity),
            });
            ctx.draw(&Points {
                coords: &arc,
                color: shade(ARC_COLOR, opacity),
            });
            ctx.print(
                label_x,
                0.0,
                ratatui::text::Span::styled(
                    label.clone(),
                    ratatui::style::Style::default().fg(shade(LABEL_COLOR, opacity)),
                ),
            );
        });
    f.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_starts_at_the_top_and_runs_clockwise() {
        let pts = arc_points(91, 10.0);
        assert_eq!(pts.len(), 91);
        assert!((pts[0].0).abs() < 1e-9 && (pts[0].1 - 10.0).abs() < 1e-9);
        // 90 degrees clockwise from the top is 3 o'clock.
        assert!((pts[90].0 - 10.0).abs() < 1e-9 && pts[90].1.abs() < 1e-9);
    }

    #[test]
    fn arc_is_capped_at_a_full_turn() {
        assert_eq!(arc_points(400, 1.0).len(), 360);
        assert!(arc_points(0, 1.0).is_empty());
    }

    #[test]
    fn shade_scales_toward_black() {
        assert_eq!(shade((200, 100, 50), 1.0), Color::Rgb(200, 100, 50));
        assert_eq!(shade((200, 100, 50), 0.5), Color::Rgb(100, 50, 25));
        assert_eq!(shade((200, 100, 50), -1.0), Color::Rgb(0, 0, 0));
    }
}
