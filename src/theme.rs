use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Terminal,
    Mocha,
    Nord,
}

pub const THEME_ORDER: [Theme; 3] = [Theme::Terminal, Theme::Mocha, Theme::Nord];

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Theme::Terminal => "Terminal",
            Theme::Mocha => "Mocha",
            Theme::Nord => "Nord",
        }
    }

    pub fn next(self) -> Theme {
        let idx = THEME_ORDER.iter().position(|t| *t == self).unwrap_or(0);
        THEME_ORDER[(idx + 1) % THEME_ORDER.len()]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub accent_primary: Color,
    pub accent_secondary: Color,
    pub border_inactive: Color,
    pub selection_bg: Color,
    pub dir_color: Color,
    pub muted: Color,
    pub menu_bg: Color,
    pub error_fg: Color,
    pub staged_fg: Color,
    pub modified_fg: Color,
    pub untracked_fg: Color,
    pub diff_add_bg: Color,
    pub diff_del_bg: Color,
    pub diff_hunk_bg: Color,
    pub diff_add_fg: Color,
    pub diff_del_fg: Color,
    pub diff_gutter_fg: Color,
}

fn tint(base: Color, overlay: Color, alpha: f32) -> Color {
    let (Color::Rgb(br, bg, bb), Color::Rgb(or, og, ob)) = (base, overlay) else {
        return base;
    };
    let mix = |b: u8, o: u8| -> u8 {
        let b = b as f32;
        let v = b + (o as f32 - b) * alpha;
        v.round().clamp(0.0, 255.0) as u8
    };
    Color::Rgb(mix(br, or), mix(bg, og), mix(bb, ob))
}

pub fn palette(theme: Theme) -> Palette {
    let diff_alpha = 0.20;
    let hunk_alpha = 0.12;

    match theme {
        Theme::Terminal => {
            let bg = Color::Rgb(22, 22, 22);
            let accent_primary = Color::Rgb(97, 175, 239);
            let add = Color::Rgb(86, 182, 194);
            let del = Color::Rgb(224, 108, 117);
            Palette {
                bg,
                fg: Color::Rgb(212, 212, 212),
                accent_primary,
                accent_secondary: Color::Rgb(229, 192, 123),
                border_inactive: Color::Rgb(68, 68, 68),
                selection_bg: Color::Rgb(55, 55, 55),
                dir_color: accent_primary,
                muted: Color::Rgb(92, 99, 112),
                menu_bg: Color::Rgb(38, 38, 38),
                error_fg: del,
                staged_fg: Color::Rgb(152, 195, 121),
                modified_fg: Color::Rgb(229, 192, 123),
                untracked_fg: Color::Rgb(198, 120, 221),
                diff_add_bg: tint(bg, add, diff_alpha),
                diff_del_bg: tint(bg, del, diff_alpha),
                diff_hunk_bg: tint(bg, accent_primary, hunk_alpha),
                diff_add_fg: add,
                diff_del_fg: del,
                diff_gutter_fg: Color::Rgb(92, 99, 112),
            }
        }
        Theme::Mocha => {
            let bg = Color::Rgb(30, 30, 46);
            let accent_primary = Color::Rgb(203, 166, 247);
            // Catppuccin teal and red.
            let add = Color::Rgb(148, 226, 213);
            let del = Color::Rgb(243, 139, 168);
            Palette {
                bg,
                fg: Color::Rgb(248, 248, 255),
                accent_primary,
                accent_secondary: Color::Rgb(250, 179, 135),
                border_inactive: Color::Rgb(120, 124, 150),
                selection_bg: Color::Rgb(78, 82, 110),
                dir_color: Color::Rgb(137, 180, 250),
                muted: Color::Rgb(147, 153, 178),
                menu_bg: Color::Rgb(58, 60, 82),
                error_fg: del,
                staged_fg: Color::Rgb(166, 227, 161),
                modified_fg: Color::Rgb(250, 179, 135),
                untracked_fg: Color::Rgb(137, 180, 250),
                diff_add_bg: tint(bg, add, diff_alpha),
                diff_del_bg: tint(bg, del, diff_alpha),
                diff_hunk_bg: tint(bg, accent_primary, hunk_alpha),
                diff_add_fg: add,
                diff_del_fg: del,
                diff_gutter_fg: Color::Rgb(108, 112, 134),
            }
        }
        Theme::Nord => {
            let bg = Color::Rgb(46, 52, 64);
            let accent_primary = Color::Rgb(136, 192, 208);
            let del = Color::Rgb(191, 97, 106);
            Palette {
                bg,
                fg: Color::Rgb(216, 222, 233),
                accent_primary,
                accent_secondary: Color::Rgb(235, 203, 139),
                border_inactive: Color::Rgb(76, 86, 106),
                selection_bg: Color::Rgb(67, 76, 94),
                dir_color: Color::Rgb(129, 161, 193),
                muted: Color::Rgb(76, 86, 106),
                menu_bg: Color::Rgb(59, 66, 82),
                error_fg: del,
                staged_fg: Color::Rgb(163, 190, 140),
                modified_fg: Color::Rgb(235, 203, 139),
                untracked_fg: Color::Rgb(180, 142, 173),
                diff_add_bg: tint(bg, accent_primary, diff_alpha),
                diff_del_bg: tint(bg, del, diff_alpha),
                diff_hunk_bg: tint(bg, accent_primary, hunk_alpha),
                diff_add_fg: accent_primary,
                diff_del_fg: del,
                diff_gutter_fg: Color::Rgb(76, 86, 106),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tint_mixes_rgb_only() {
        let c = tint(Color::Rgb(0, 0, 0), Color::Rgb(200, 100, 50), 0.5);
        assert_eq!(c, Color::Rgb(100, 50, 25));
        assert_eq!(tint(Color::Reset, Color::Rgb(1, 1, 1), 0.5), Color::Reset);
    }

    #[test]
    fn next_cycles_through_all_themes() {
        let mut t = Theme::Terminal;
        for _ in 0..THEME_ORDER.len() {
            t = t.next();
        }
        assert_eq!(t, Theme::Terminal);
    }
}
