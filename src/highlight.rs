use ratatui::style::Color;
use std::path::Path;
use std::sync::OnceLock;
use syntect::{
    easy::HighlightLines,
    highlighting::{Theme, ThemeSet},
    parsing::SyntaxSet,
};

/// Lines past this are left plain.
const MAX_HIGHLIGHT_LINES: usize = 5_000;

const THEME_NAME: &str = "base16-eighties.dark";

/// One source line as `(foreground, text)` fragments.
pub type StyledLine = Vec<(Color, String)>;

fn syntax_set() -> &'static SyntaxSet {
    static SET: OnceLock<SyntaxSet> = OnceLock::new();
    SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> Option<&'static Theme> {
    static THEMES: OnceLock<ThemeSet> = OnceLock::new();
    THEMES.get_or_init(ThemeSet::load_defaults).themes.get(THEME_NAME)
}

/// Highlights `text` using the syntax matching `path`'s extension.
/// `None` when the extension is unknown.
pub fn highlight_content(text: &str, path: &Path) -> Option<Vec<StyledLine>> {
    let ext = path.extension()?.to_str()?;
    let syntax = syntax_set().find_syntax_by_extension(ext)?;
    let mut hl = HighlightLines::new(syntax, theme()?);

    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if i >= MAX_HIGHLIGHT_LINES {
            out.push(vec![(Color::Reset, line.to_string())]);
            continue;
        }
        // The newline-aware syntax set wants the terminator back.
        let with_nl = format!("{line}\n");
        let ranges = hl.highlight_line(&with_nl, syntax_set()).unwrap_or_default();
        let styled: StyledLine = ranges
            .into_iter()
            .map(|(style, frag)| {
                let c = style.foreground;
                (Color::Rgb(c.r, c.g, c.b), frag.trim_end_matches('\n').to_string())
            })
            .filter(|(_, frag)| !frag.is_empty())
            .collect();
        out.push(styled);
    }
    Some(out)
}

/// Fragments covering chars `start..start + len` of `line`.
pub fn slice_line(line: &StyledLine, start: usize, len: usize) -> StyledLine {
    let end = start + len;
    let mut out = Vec::new();
    let mut pos = 0usize;
    for (color, frag) in line {
        let n = frag.chars().count();
        let (lo, hi) = (pos.max(start), (pos + n).min(end));
        if lo < hi {
            let piece: String = frag.chars().skip(lo - pos).take(hi - lo).collect();
            out.push((*color, piece));
        }
        pos += n;
        if pos >= end {
            break;
        }
    }
    out
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn luminance(color: Color) -> Option<f32> {
    let Color::Rgb(r, g, b) = color else {
        return None;
    };
    Some(0.2126 * srgb_to_linear(r) + 0.7152 * srgb_to_linear(g) + 0.0722 * srgb_to_linear(b))
}

/// Nudges `fg` toward white or black until it reads on `bg`.
pub fn ensure_contrast(fg: Color, bg: Color) -> Color {
    let (Color::Rgb(fr, fgg, fb), Some(lf), Some(lb)) = (fg, luminance(fg), luminance(bg)) else {
        return fg;
    };
    let (hi, lo) = if lf >= lb { (lf, lb) } else { (lb, lf) };
    let contrast = (hi + 0.05) / (lo + 0.05);

    let target = 4.5;
    if contrast >= target {
        return fg;
    }
    let toward = if lb < 0.5 { 255.0 } else { 0.0 };
    let alpha = ((target - contrast) / target).clamp(0.0, 1.0);
    let mix = |a: u8| (a as f32 + (toward - a as f32) * alpha).round().clamp(0.0, 255.0) as u8;
    Color::Rgb(mix(fr), mix(fgg), mix(fb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extension_is_highlighted_line_for_line() {
        let text = "fn main() {\n    let x = 1;\n}\n";
        let lines = highlight_content(text, Path::new("src/main.rs")).unwrap();
        assert_eq!(lines.len(), 3);
        let first: String = lines[0].iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(first, "fn main() {");
    }

    #[test]
    fn unknown_extension_is_none() {
        assert!(highlight_content("x", Path::new("notes.zzz-unknown")).is_none());
        assert!(highlight_content("x", Path::new("Makefile-no-ext")).is_none());
    }

    #[test]
    fn slicing_crosses_fragments() {
        let line: StyledLine = vec![(Color::Red, "abc".to_string()), (Color::Blue, "defg".to_string())];
        let cut = slice_line(&line, 2, 3);
        assert_eq!(
            cut,
            vec![(Color::Red, "c".to_string()), (Color::Blue, "de".to_string())]
        );
        assert!(slice_line(&line, 10, 3).is_empty());
    }

    #[test]
    fn low_contrast_is_lifted() {
        let bg = Color::Rgb(20, 20, 20);
        let fixed = ensure_contrast(Color::Rgb(30, 30, 30), bg);
        assert_ne!(fixed, Color::Rgb(30, 30, 30));
        assert_eq!(ensure_contrast(Color::Rgb(250, 250, 250), bg), Color::Rgb(250, 250, 250));
    }
}
