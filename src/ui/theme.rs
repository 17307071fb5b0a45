use ratatui::style::Color;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub is_dark: bool,
    pub background: Color,
    pub foreground: Color,
    pub title: Color,
    pub selected_bg: Color,
    pub selected_fg: Color,
    pub today: Color,
    pub weekday_header: Color,
    pub inactive_day: Color,
    pub status_bar: Color,
    pub help_title: Color,
    pub help_section: Color,
    pub command_mode: Color,
    pub error: Color,
    pub success: Color,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            is_dark: false,
            background: Color::Rgb(250, 250, 249),
            foreground: Color::Rgb(41, 37, 36),
            title: Color::Rgb(59, 130, 246),
            selected_bg: Color::Rgb(191, 219, 254),
            selected_fg: Color::Rgb(30, 41, 59),
            today: Color::Rgb(22, 163, 74),
            weekday_header: Color::Rgb(120, 113, 108),
            inactive_day: Color::Rgb(168, 162, 158),
            status_bar: Color::Rgb(68, 64, 60),
            help_title: Color::Rgb(59, 130, 246),
            help_section: Color::Rgb(217, 119, 6),
            command_mode: Color::Rgb(41, 37, 36),
            error: Color::Rgb(220, 38, 38),
            success: Color::Rgb(22, 163, 74),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            is_dark: true,
            background: Color::Rgb(24, 24, 27),
            foreground: Color::Rgb(228, 228, 231),
            title: Color::Rgb(147, 197, 253),
            selected_bg: Color::Rgb(55, 65, 81),
            selected_fg: Color::Rgb(243, 244, 246),
            today: Color::Rgb(134, 239, 172),
            weekday_header: Color::Rgb(253, 224, 71),
            inactive_day: Color::Rgb(82, 82, 91),
            status_bar: Color::Rgb(212, 212, 216),
            help_title: Color::Rgb(147, 197, 253),
            help_section: Color::Rgb(253, 224, 71),
            command_mode: Color::Rgb(228, 228, 231),
            error: Color::Rgb(248, 113, 113),
            success: Color::Rgb(134, 239, 172),
        }
    }

    pub fn for_dark_mode(dark: bool) -> Self {
        if dark { Self::dark() } else { Self::light() }
    }

    pub fn get_by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "dark" | "night" => Self::dark(),
            _ => Self::light(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

/// Converts `#RRGGBB` into a terminal colour; anything else renders as gray.
pub fn parse_hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::Gray;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}
