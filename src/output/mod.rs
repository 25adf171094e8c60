pub mod formatter;

pub use formatter::{
    format_cache_status, format_explanation, format_lines_table, format_moneyline, format_prob,
    format_spread_line, format_week_outcomes, should_use_colors,
};
