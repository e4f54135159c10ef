//! Status table rendering.
//!
//! Faulted rows print before healthy rows by default so a long listing leads
//! with what needs attention; `--tabsep` switches to a machine-readable
//! tab-separated form with no header and no color.

use std::time::Duration;

use colored::Colorize;

use watchdog_client::StatusRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOptions {
    pub noheader: bool,
    pub nocolor: bool,
    pub tabsep: bool,
    pub nobadfirst: bool,
}

/// Render rows to stdout.
pub fn render_status(rows: &[StatusRow], opts: StatusOptions) {
    print!("{}", format_status(rows, opts));
}

/// Format rows per the options. Separated from printing for tests.
pub fn format_status(rows: &[StatusRow], opts: StatusOptions) -> String {
    let color = !opts.nocolor && !opts.tabsep;
    let noheader = opts.noheader || opts.tabsep;

    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
    let line = |status: &str, name: &str, expires: &str, cumd: &str, reason: &str| {
        if opts.tabsep {
            format!("{status}\t{name}\t{expires}\t{cumd}\t{reason}\n")
        } else {
            format!("{status:>5} {name:<name_width$} {expires:<32} {cumd:<8} {reason}\n")
        }
    };

    let mut out = String::new();
    if !noheader {
        out.push_str(&line("STATE", "NAME", "EXPIRE", "CUMD", "REASON"));
    }
    let mut render_row = |row: &StatusRow| {
        let cumd = format_downtime(row.cum_downtime);
        let text = line(
            &row.status,
            &row.name,
            &row.expires,
            &cumd,
            row.reason.trim(),
        );
        if color {
            let painted = if row.is_good() {
                text.trim_end_matches('\n').green().bold()
            } else {
                text.trim_end_matches('\n').red().bold()
            };
            out.push_str(&format!("{painted}\n"));
        } else {
            out.push_str(&text);
        }
    };

    if opts.nobadfirst {
        rows.iter().for_each(&mut render_row);
    } else {
        rows.iter().filter(|r| !r.is_good()).for_each(&mut render_row);
        rows.iter().filter(|r| r.is_good()).for_each(&mut render_row);
    }
    out
}

/// Whole-second duration rendering, `1h2m3s` style. `-` when the service
/// did not report downtime.
fn format_downtime(downtime: Option<Duration>) -> String {
    let Some(downtime) = downtime else {
        return "-".to_string();
    };
    let secs = downtime.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}
