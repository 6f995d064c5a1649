use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::ir::Column;

/// Text and box metrics in canvas units.
pub struct TextMetrics {
    pub char_width: f64,
    pub padding_x: f64,
    pub max_table_width: f64,
    pub header_height: f64,
    pub row_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 0.6,
            padding_x: 4.0,
            max_table_width: 28.0,
            header_height: 3.5,
            row_height: 2.2,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    /// Box size of a table: width follows its longest label up to the cap,
    /// height is one header plus one row per column.
    pub fn table_size(&self, name: &str, columns: &[Column]) -> (f64, f64) {
        let longest = columns
            .iter()
            .map(|c| UnicodeWidthStr::width(c.label().as_str()))
            .fold(UnicodeWidthStr::width(name), usize::max);

        let width = (longest as f64 * self.char_width + self.padding_x).min(self.max_table_width);
        let height = columns.len() as f64 * self.row_height + self.header_height;

        (width, height)
    }

    /// Truncate `text` with an ellipsis so it fits in `available` units.
    pub fn fit_label<'a>(&self, text: &'a str, available: f64) -> Cow<'a, str> {
        self.fit_label_scaled(text, available, 1.0)
    }

    /// [`fit_label`](Self::fit_label) for text drawn `scale` times the row
    /// font size.
    pub fn fit_label_scaled<'a>(&self, text: &'a str, available: f64, scale: f64) -> Cow<'a, str> {
        let char_width = self.char_width * scale;
        if UnicodeWidthStr::width(text) as f64 * char_width <= available {
            return Cow::Borrowed(text);
        }

        let budget = (available / char_width).floor() as usize;
        if budget == 0 {
            return Cow::Borrowed("");
        }

        let mut out = String::new();
        let mut used = 0;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > budget - 1 {
                break;
            }
            out.push(ch);
            used += w;
        }
        out.push('…');
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, typ: &str) -> Column {
        Column {
            name: name.to_string(),
            typ: typ.to_string(),
            is_pk: false,
            is_fk: false,
        }
    }

    #[test]
    fn test_ascii_width() {
        let m = TextMetrics::default();
        assert!((m.text_width("User") - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_unicode_width() {
        let m = TextMetrics::default();
        // 全角文字は幅2
        assert!((m.text_width("ユーザー") - 8.0 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_size_no_columns() {
        let m = TextMetrics::default();
        let (w, h) = m.table_size("tags", &[]);
        assert!((w - (4.0 * 0.6 + 4.0)).abs() < 1e-9);
        assert_eq!(h, 3.5);
    }

    #[test]
    fn test_size_uses_longest_label() {
        let m = TextMetrics::default();
        // "created_at: timestamp" is 21 columns wide
        let columns = vec![col("id", "int"), col("created_at", "timestamp")];
        let (w, h) = m.table_size("users", &columns);
        assert!((w - (21.0 * 0.6 + 4.0)).abs() < 1e-9);
        assert!((h - (2.0 * 2.2 + 3.5)).abs() < 1e-9);
    }

    #[test]
    fn test_width_is_capped() {
        let m = TextMetrics::default();
        let columns = vec![col("a_really_long_column_name_for_testing", "character varying(255)")];
        let (w, _) = m.table_size("t", &columns);
        assert_eq!(w, 28.0);
    }

    #[test]
    fn test_fit_label() {
        let m = TextMetrics::default();
        assert_eq!(m.fit_label("id: int", 10.0), "id: int");

        let fitted = m.fit_label("description: text", 6.0);
        assert!(fitted.ends_with('…'));
        assert!(m.text_width(&fitted) <= 6.0 + 1e-9);
        assert_eq!(m.fit_label("abc", 0.1), "");
    }

    #[test]
    fn test_fit_label_scaled() {
        let m = TextMetrics::default();
        // 10 columns: 6.0 at row size, 6.9 at 1.15x
        assert_eq!(m.fit_label("abcdefghij", 6.5), "abcdefghij");
        let fitted = m.fit_label_scaled("abcdefghij", 6.5, 1.15);
        assert!(fitted.ends_with('…'));
        assert!(UnicodeWidthStr::width(fitted.as_ref()) as f64 * 0.6 * 1.15 <= 6.5);
    }
}
