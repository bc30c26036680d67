use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::{CalendarConfig, Config};
use crate::view::{Geometry, LayoutItem, ViewKind, ViewRange};

/// Terminal renderer for the layout instructions the core emits. This
/// is the "external rendering collaborator" of the design: it paints
/// whatever geometry it is handed and owns no calendar logic.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Title line plus the view buttons the host declared, with the
    /// active view marked. Labels come from the config's button-label
    /// table, falling back to the button name.
    #[tracing::instrument(skip_all)]
    pub fn print_header(
        &mut self,
        title: &str,
        ccfg: &CalendarConfig,
        current: Option<ViewKind>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", self.paint(title, "1"))?;

        let mut buttons = Vec::with_capacity(ccfg.header_buttons.len());
        for name in &ccfg.header_buttons {
            let label = ccfg
                .button_labels
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.clone());
            let active = current.map(ViewKind::name) == Some(name.as_str());
            if active {
                buttons.push(format!("({})", self.paint(&label, "7")));
            } else {
                buttons.push(format!("[{label}]"));
            }
        }
        writeln!(out, "{}", buttons.join(" "))?;

        Ok(())
    }

    pub fn print_range(&mut self, range: &ViewRange) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "{} .. {} ({})",
            range.start,
            range.end,
            range.granularity.name()
        )?;
        Ok(())
    }

    /// One row per layout item. Clipped segments are flagged with a
    /// `~` so truncated spans are visible at a glance.
    #[tracing::instrument(skip(self, items))]
    pub fn print_layout(&mut self, items: &[LayoutItem]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if items.is_empty() {
            writeln!(out, "no events in range")?;
            return Ok(());
        }

        let headers = vec![
            "Id".to_string(),
            "Title".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Lane".to_string(),
            "Conc".to_string(),
            "Geometry".to_string(),
        ];

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let id = self.paint(&item.event.event.id.to_string(), "33");
            let clip_mark = if item.event.is_clipped() { "~" } else { "" };

            rows.push(vec![
                id,
                item.event.event.title.clone(),
                format!("{}{}", item.event.start, clip_mark),
                format!("{}{}", item.event.end, clip_mark),
                item.lane.lane.to_string(),
                item.lane.concurrency.to_string(),
                describe_geometry(&item.geometry),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn describe_geometry(geometry: &Geometry) -> String {
    match *geometry {
        Geometry::TimeSlot {
            day_column,
            top,
            height,
            width_fraction,
            inset_fraction,
            from_right,
            gutter_px,
        } => {
            let height = height
                .map(|h| format!("{h:.0}px"))
                .unwrap_or_else(|| "open".to_string());
            let side = if from_right { "right" } else { "left" };
            let gutter = if gutter_px > 0.0 {
                format!(" gutter {gutter_px:.0}px")
            } else {
                String::new()
            };
            format!(
                "col {day_column} top {top:.0}px h {height} w {width_fraction:.2} inset {inset_fraction:.2} from {side}{gutter}"
            )
        }
        Geometry::MonthBar {
            week_row,
            start_col,
            span_cols,
            top,
        } => format!(
            "row {week_row} cols {start_col}+{span_cols} top {top:.0}px"
        ),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
