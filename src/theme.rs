use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub accent_fg: Color,
  pub muted: Color,
  pub border: Color,
  pub card_bg: Color,
  pub chip_bg: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub liked: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "midnight",
    bg: Color::Rgb(8, 17, 34),
    fg: Color::Rgb(230, 238, 248),
    accent: Color::Rgb(6, 182, 212),
    accent_fg: Color::Rgb(4, 16, 36),
    muted: Color::Rgb(148, 163, 184),
    border: Color::Rgb(40, 52, 74),
    card_bg: Color::Rgb(12, 22, 40),
    chip_bg: Color::Rgb(24, 34, 54),
    highlight_fg: Color::Rgb(230, 238, 248),
    highlight_bg: Color::Rgb(20, 44, 70),
    liked: Color::Rgb(250, 204, 21),
    status: Color::Rgb(94, 234, 212),
    error: Color::Rgb(248, 113, 113),
    key_fg: Color::Rgb(4, 16, 36),
    key_bg: Color::Rgb(148, 163, 184),
  },
  Theme {
    name: "paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(38, 38, 38),
    accent: Color::Rgb(220, 38, 38),
    accent_fg: Color::Rgb(255, 255, 255),
    muted: Color::Rgb(115, 115, 115),
    border: Color::Rgb(212, 208, 198),
    card_bg: Color::Rgb(255, 255, 255),
    chip_bg: Color::Rgb(229, 229, 229),
    highlight_fg: Color::Rgb(23, 23, 23),
    highlight_bg: Color::Rgb(254, 226, 226),
    liked: Color::Rgb(217, 119, 6),
    status: Color::Rgb(21, 128, 61),
    error: Color::Rgb(185, 28, 28),
    key_fg: Color::Rgb(255, 255, 255),
    key_bg: Color::Rgb(82, 82, 82),
  },
  Theme {
    name: "mono",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Cyan,
    accent_fg: Color::Black,
    muted: Color::DarkGray,
    border: Color::Gray,
    card_bg: Color::Reset,
    chip_bg: Color::Reset,
    highlight_fg: Color::Black,
    highlight_bg: Color::White,
    liked: Color::Yellow,
    status: Color::Green,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Index of the theme called `name`, if any.
pub fn theme_index(name: &str) -> Option<usize> {
  THEMES.iter().position(|t| t.name == name)
}
