use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn keybind(key: &str, pad: usize, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:pad$}{what}", "")),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (aborts a running task)"),
        ]),
        keybind("r", 11, "Add phonetic keys"),
        keybind("Enter", 7, "Add phonetic keys"),
        keybind("c", 11, "Clear phonetic keys"),
        keybind("x", 11, "Hold to clear phonetic keys"),
        keybind("tab", 9, "Switch tabs"),
        keybind("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Clear prompt:"),
        keybind("y", 11, "Clear"),
        keybind("n", 11, "Cancel"),
        Line::from(""),
        Line::from("Settings:"),
        Line::from("  phonetic --set-animation false       Never show the ambient loop"),
        Line::from("  phonetic --set-force-animation true  Show it even over other audio"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
