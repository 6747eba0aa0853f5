use chrono::{DateTime, Utc};
use comfy_table::presets::ASCII_FULL_CONDENSED;
use comfy_table::{Cell, Color, Table};

/// A table with the given header row, plain when colours are off.
pub fn table(headers: &[&str], colors: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL_CONDENSED);
    if !colors {
        table.force_no_tty();
    }
    table.set_header(headers.iter().map(|h| {
        let cell = Cell::new(h);
        if colors {
            cell.fg(Color::Cyan)
        } else {
            cell
        }
    }));
    table
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// `YYYY-MM-DD HH:MM`, or empty for a missing timestamp.
pub fn timestamp(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rows_render_without_styling() {
        let mut t = table(&["ID", "Draft"], false);
        t.add_row(vec!["1", yes_no(false)]);
        let rendered = t.to_string();
        assert!(rendered.contains("| ID | Draft |"));
        assert!(rendered.contains("| 1  | no    |"));
        assert!(!rendered.contains('\u{1b}'));
    }

    #[test]
    fn test_timestamp_format() {
        let dt = Utc.with_ymd_and_hms(2014, 1, 5, 10, 0, 0).unwrap();
        assert_eq!(timestamp(Some(&dt)), "2014-01-05 10:00");
        assert_eq!(timestamp(None), "");
    }
}
