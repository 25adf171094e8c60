use std::io::IsTerminal;

use owo_colors::OwoColorize;

use crate::cache::{CacheStatus, WeekOutcome, WeekSource};
use crate::pricing::{Composition, LineExplanation, LineOutput};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// American odds with an explicit sign ("+174", "-174")
pub fn format_moneyline(odds: i32) -> String {
    if odds > 0 {
        format!("+{}", odds)
    } else {
        odds.to_string()
    }
}

/// Spread as a betting line from the favorite's side: "KC -4.7", or "PK"
/// when it rounds to zero.
pub fn format_spread_line(line: &LineOutput) -> String {
    let rounded = (line.model_spread_home * 10.0).round() / 10.0;
    if rounded == 0.0 {
        "PK".to_string()
    } else if rounded > 0.0 {
        format!("{} -{:.1}", line.home, rounded)
    } else {
        format!("{} -{:.1}", line.away, -rounded)
    }
}

/// Format a probability as a percentage with one decimal ("63.5%")
pub fn format_prob(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

fn matchup_label(line: &LineOutput) -> String {
    let sep = if line.neutral { "vs" } else { "@" };
    format!("{} {} {}", line.away, sep, line.home)
}

/// Format priced games as an aligned table, one game per row.
pub fn format_lines_table(lines: &[LineOutput], use_colors: bool) -> String {
    if lines.is_empty() {
        return "No games to price.".to_string();
    }

    let matchup_width = lines
        .iter()
        .map(|l| matchup_label(l).chars().count())
        .max()
        .unwrap_or(0)
        .max("Matchup".len());
    let line_width = lines
        .iter()
        .map(|l| format_spread_line(l).chars().count())
        .max()
        .unwrap_or(0)
        .max("Line".len());

    let header = format!(
        "{:>4}  {:<10}  {:<mw$}  {:<lw$}  {:>6}  {:>11}  {:>13}  {:>6}",
        "Wk",
        "Date",
        "Matchup",
        "Line",
        "Total",
        "Team totals",
        "Win% (A/H)",
        "ML H",
        mw = matchup_width,
        lw = line_width,
    );

    let rows = lines.iter().map(|l| {
        let matchup = format!("{:<mw$}", matchup_label(l), mw = matchup_width);
        let spread = format!("{:<lw$}", format_spread_line(l), lw = line_width);
        let team_totals = format!("{:.1}/{:.1}", l.away_team_total, l.home_team_total);
        let probs = format!(
            "{}/{}",
            format_prob(l.away_win_prob),
            format_prob(l.home_win_prob)
        );
        let ml = format!("{:>6}", format_moneyline(l.ml_home));
        let ml = if !use_colors {
            ml
        } else if l.ml_home < 0 {
            ml.green().to_string()
        } else {
            ml.red().to_string()
        };

        if use_colors {
            format!(
                "{:>4}  {:<10}  {}  {}  {:>6.1}  {:>11}  {:>13}  {}",
                l.week.dimmed(),
                l.date,
                matchup.bold(),
                spread.cyan(),
                l.model_total,
                team_totals,
                probs,
                ml
            )
        } else {
            format!(
                "{:>4}  {:<10}  {}  {}  {:>6.1}  {:>11}  {:>13}  {}",
                l.week, l.date, matchup, spread, l.model_total, team_totals, probs, ml
            )
        }
    });

    let header = if use_colors {
        header.bold().to_string()
    } else {
        header
    };
    std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_composition(label: &str, comp: &Composition, use_colors: bool) -> Vec<String> {
    let mut out = vec![format!("  {}: base {:.2}", label, comp.base)];
    for f in &comp.factors {
        let name = if use_colors {
            f.name.yellow().to_string()
        } else {
            f.name.clone()
        };
        out.push(format!(
            "    {:<16} {:+.2}  ({:.2} -> {:.2})",
            name, f.delta, f.before, f.after
        ));
    }
    if comp.raw != comp.value {
        out.push(format!("    clamped {:.2} -> {:.2}", comp.raw, comp.value));
    }
    out.push(format!("    = {:.2}", comp.value));
    out
}

/// Multi-line factor breakdown for one game (for --explain)
pub fn format_explanation(expl: &LineExplanation, use_colors: bool) -> String {
    let l = &expl.line;
    let title = format!("Week {} {}  {}", l.week, l.date, matchup_label(l));
    let mut out = vec![if use_colors {
        title.bold().to_string()
    } else {
        title
    }];
    out.extend(format_composition("Spread", &expl.spread, use_colors));
    out.extend(format_composition("Total", &expl.total, use_colors));
    out.push(format!(
        "  Win prob {} {} / {} {}  ML {} {} / {} {}",
        l.home,
        format_prob(l.home_win_prob),
        l.away,
        format_prob(l.away_win_prob),
        l.home,
        format_moneyline(l.ml_home),
        l.away,
        format_moneyline(l.ml_away)
    ));
    out.join("\n")
}

/// Compress a sorted week list into ranges ("1-5, 7, 9-10")
pub fn format_week_ranges(weeks: &[u32]) -> String {
    let mut parts = Vec::new();
    let mut iter = weeks.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{}-{}", start, end));
        }
    }
    parts.join(", ")
}

/// One line per cached season with the weeks present.
pub fn format_cache_status(status: &CacheStatus, use_colors: bool) -> String {
    let root = status.root.display().to_string();
    let mut out = vec![format!(
        "Cache: {}",
        if use_colors { root.underline().to_string() } else { root }
    )];
    if status.seasons.is_empty() {
        out.push("  (empty)".to_string());
    }
    for (season, weeks) in &status.seasons {
        let games = status.rows.get(season).copied().unwrap_or(0);
        let season = if use_colors {
            season.bold().to_string()
        } else {
            season.to_string()
        };
        out.push(format!(
            "  {}: {} week(s), {} games [{}]",
            season,
            weeks.len(),
            games,
            format_week_ranges(weeks)
        ));
    }
    out.join("\n")
}

/// One line per week touched by a cache command, then a summary.
pub fn format_week_outcomes(outcomes: &[WeekOutcome]) -> String {
    if outcomes.is_empty() {
        return "Nothing to do.".to_string();
    }
    let mut out: Vec<String> = outcomes
        .iter()
        .map(|o| {
            let how = match o.source {
                WeekSource::Cached => "cached ",
                WeekSource::Fetched => "fetched",
            };
            format!("  {} wk{:<2}  {}  {:>3} games", o.season, o.week, how, o.rows)
        })
        .collect();
    let fetched = outcomes
        .iter()
        .filter(|o| o.source == WeekSource::Fetched)
        .count();
    out.push(format!(
        "{} week(s): {} fetched, {} already cached",
        outcomes.len(),
        fetched,
        outcomes.len() - fetched
    ));
    out.join("\n")
}
