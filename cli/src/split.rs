use anyhow::Result;
use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, Color, Table};
use crackaudit_core::{split_keyspace, Mask};
use human_repr::HumanCount;

use crate::Split;

pub fn split(args: Split) -> Result<()> {
    let units = split_keyspace(
        &args.charset,
        args.min_length,
        args.max_length,
        args.workers as usize,
    )?;
    let charset = Mask::parse(&args.charset).flatten()?;

    let mut display_table = Table::new();
    display_table.load_preset(UTF8_BORDERS_ONLY);
    display_table.set_header(vec!["Unit", "Length", "First characters", "Candidates"]);

    let mut total: u64 = 0;
    for unit in &units {
        let candidates = unit.keyspace(&charset)?.len();
        total += candidates;

        display_table.add_row(vec![
            Cell::new(unit.id),
            Cell::new(unit.length),
            Cell::new(unit.first_chars.iter().collect::<String>()).fg(Color::Green),
            Cell::new(candidates.human_count_bare()),
        ]);
    }

    println!("{display_table}");
    println!(
        "{} units, {} candidates in total",
        units.len(),
        total.human_count_bare()
    );

    Ok(())
}
