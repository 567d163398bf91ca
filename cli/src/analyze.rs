use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, Color, Table};
use crackaudit_core::WordlistStats;
use human_repr::HumanCount;

use crate::Analyze;

pub fn analyze(args: Analyze) -> Result<()> {
    let stats = WordlistStats::analyze_path(&args.wordlist)
        .with_context(|| format!("Unable to analyze {}", args.wordlist.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let percent = |count: u64| {
        if stats.total_words == 0 {
            0.
        } else {
            count as f64 / stats.total_words as f64 * 100.
        }
    };

    let mut display_table = Table::new();
    display_table.load_preset(UTF8_BORDERS_ONLY);
    display_table.set_header(vec!["Statistic", "Value"]);

    display_table.add_row(vec![
        Cell::new("Words"),
        Cell::new(stats.total_words.human_count_bare()).fg(Color::Green),
    ]);
    display_table.add_row(vec![
        Cell::new("Average length"),
        Cell::new(format!("{:.2}", stats.average_length)),
    ]);

    let distribution = &stats.char_distribution;
    for (name, count) in [
        ("Lowercase characters", distribution.lowercase),
        ("Uppercase characters", distribution.uppercase),
        ("Digits", distribution.digits),
        ("Special characters", distribution.special),
    ] {
        display_table.add_row(vec![Cell::new(name), Cell::new(count)]);
    }

    let patterns = &stats.patterns;
    for (name, count) in [
        ("Ends with a number", patterns.ends_with_number),
        ("Starts with an uppercase letter", patterns.starts_with_upper),
        ("Contains a year", patterns.contains_year),
        ("All lowercase", patterns.all_lowercase),
    ] {
        display_table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{count} ({:.1}%)", percent(count))),
        ]);
    }

    println!("{display_table}");

    Ok(())
}
