//! FILENAME: app/src/main.rs
//! Interactive terminal demo: generated marketing-attribution data pushed
//! through the row-model pipeline (filter, group, aggregate, expand,
//! paginate), with a REPL for the view controls.

mod mockdata;
mod render;

use std::error::Error;
use std::io::{self, BufRead, Write};

use clap::Parser;
use log::info;

use records::{FieldValue, Record};
use rowmodel_engine::{
    AggregateSpec, ColumnDef, ColumnRegistry, ConfigError, RecordPredicate, Table, TableState,
    DEFAULT_PAGE_SIZE,
};

use render::RenderColumn;

const PAGE_SIZE_PALETTE: &[usize] = &[10, 20, 30, 40, 50, 100, 200, 500];

#[derive(Parser, Debug)]
#[command(
    name = "rowmodel-demo",
    about = "Grouped-table demo over generated marketing attribution data",
    version
)]
struct Args {
    /// Number of records to generate.
    #[arg(long, default_value_t = mockdata::DEFAULT_RECORD_COUNT)]
    records: usize,

    /// Generator seed; the same seed always yields the same dataset.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Initial page size.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Comma-separated initial grouping columns ("none" for a flat table).
    #[arg(long, default_value = "link_source_name")]
    group_by: String,

    /// Print the first page as JSON and exit (for scripted runs).
    #[arg(long)]
    json: bool,
}

/// The demo's column set: one column per generated field, plus the two
/// derived aggregate columns (purchased yes/no and amount sum).
fn demo_registry() -> Result<ColumnRegistry, ConfigError> {
    ColumnRegistry::new(vec![
        ColumnDef::new("username"),
        ColumnDef::new("user_email"),
        ColumnDef::new("user_subscription_date"),
        ColumnDef::new("link_name"),
        ColumnDef::new("link_url"),
        ColumnDef::new("link_source_name"),
        ColumnDef::new("link_medium_name"),
        ColumnDef::new("link_campaign_name"),
        ColumnDef::new("link_content_name"),
        ColumnDef::new("product_name"),
        ColumnDef::new("request_date"),
        ColumnDef::new("purchase_date"),
        // Purchased yes/no: reads the nullable purchase date, groups on its
        // boolean coercion, counts truthy leaves per group.
        ColumnDef::new("is_purchase")
            .with_field("purchase_date")
            .with_grouping_value(|r: &Record| {
                FieldValue::Boolean(r.field("purchase_date").is_truthy())
            })
            .with_aggregation(AggregateSpec::TruthyCount),
        // Amount sum: absent amounts group under 0 and contribute nothing
        // to the sum.
        ColumnDef::new("sum_amount")
            .with_field("amount")
            .with_grouping_value(|r: &Record| {
                FieldValue::Number(r.field("amount").as_number().unwrap_or(0.0))
            })
            .with_aggregation(AggregateSpec::Sum),
    ])
}

/// The columns the terminal renderer shows (the registry knows more; a
/// terminal does not fit all of them).
fn render_columns() -> Vec<RenderColumn> {
    vec![
        RenderColumn::new("link_source_name", "SOURCE", 28),
        RenderColumn::new("link_medium_name", "MEDIUM", 22),
        RenderColumn::new("product_name", "PRODUCT", 26),
        RenderColumn::new("username", "USER", 16),
        RenderColumn::new("request_date", "REQUESTED", 10),
        RenderColumn::new("is_purchase", "PURCHASED", 9)
            .with_formatter(|v| if v.is_truthy() { "Yes" } else { "No" }.to_string()),
        RenderColumn::new("sum_amount", "AMOUNT", 8),
    ]
}

fn parse_grouping(text: &str) -> Vec<String> {
    if text.trim().eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut state = TableState::default();
    state.grouping = parse_grouping(&args.group_by);
    state.pagination.page_size = args.page_size;

    let mut table = Table::with_initial(demo_registry()?, state)?;

    info!("generating {} records (seed {})", args.records, args.seed);
    table.set_records(mockdata::generate(args.records, args.seed));

    let columns = render_columns();

    if args.json {
        let page = table.visible_page();
        let grouping = table.state().grouping.clone();
        let dump = render::page_dump(&page, table.registry(), &columns, &grouping);
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!(
        "{} records | grouped by {} | type 'help' for commands",
        table.record_count(),
        describe_grouping(&table.state().grouping)
    );
    show(&mut table, &columns);
    repl(&mut table, &columns)
}

fn describe_grouping(grouping: &[String]) -> String {
    if grouping.is_empty() {
        "nothing (flat)".to_string()
    } else {
        grouping.join(" > ")
    }
}

fn show(table: &mut Table, columns: &[RenderColumn]) {
    let page = table.visible_page();
    print!("{}", render::render_page(&page, table.registry(), columns));
}

// ============================================================================
// REPL
// ============================================================================

fn repl(table: &mut Table, columns: &[RenderColumn]) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        let command = parts[0];
        let rest = &parts[1..];

        match command {
            "show" => show(table, columns),
            "next" => {
                let current = table.visible_page().page_index;
                table.set_page_index(current + 1);
                show(table, columns);
            }
            "prev" => {
                let current = table.visible_page().page_index;
                table.set_page_index(current.saturating_sub(1));
                show(table, columns);
            }
            "first" => {
                table.set_page_index(0);
                show(table, columns);
            }
            "last" => {
                let count = table.visible_page().page_count;
                table.set_page_index(count.saturating_sub(1));
                show(table, columns);
            }
            "page" => match rest.first().map(|s| s.parse::<usize>()) {
                Some(Ok(n)) if n > 0 => {
                    table.set_page_index(n - 1);
                    show(table, columns);
                }
                _ => println!("usage: page <number> (1-based)"),
            },
            "size" => match rest.first().map(|s| s.parse::<usize>()) {
                Some(Ok(n)) => match table.set_page_size(n) {
                    Ok(()) => show(table, columns),
                    Err(e) => println!("{}", e),
                },
                _ => println!("usage: size <rows>, e.g. one of {:?}", PAGE_SIZE_PALETTE),
            },
            "group" => {
                if rest.is_empty() {
                    println!("grouped by {}", describe_grouping(&table.state().grouping));
                } else {
                    match table.set_grouping(parse_grouping(&rest.join(","))) {
                        Ok(()) => show(table, columns),
                        Err(e) => println!("{}", e),
                    }
                }
            }
            "toggle" => match rest.first().map(|s| s.parse::<usize>()) {
                Some(Ok(n)) if n > 0 => toggle_row(table, columns, n),
                _ => println!("usage: toggle <row number on this page>"),
            },
            "filter" => apply_filter(table, columns, rest),
            "stats" => println!("{}", render::render_stats(&table.stats())),
            "help" => print_help(),
            "quit" | "exit" => return Ok(()),
            other => println!("unknown command '{}', try 'help'", other),
        }
    }
}

fn toggle_row(table: &mut Table, columns: &[RenderColumn], row_number: usize) {
    let page = table.visible_page();
    let target = page
        .rows
        .get(row_number - 1)
        .and_then(|row| row.as_group())
        .map(|group| group.node_id.clone());
    match target {
        Some(node_id) => {
            table.toggle_group(&node_id);
            show(table, columns);
        }
        None => println!("row {} is not a group row on this page", row_number),
    }
}

fn apply_filter(table: &mut Table, columns: &[RenderColumn], rest: &[&str]) {
    match rest.first().copied() {
        Some("none") => {
            table.set_filter(None);
            show(table, columns);
        }
        Some("purchased") => {
            table.set_filter(Some(RecordPredicate::new(|r: &Record| {
                r.field("purchase_date").is_truthy()
            })));
            show(table, columns);
        }
        Some("source") if rest.len() > 1 => {
            let needle = rest[1..].join(" ").to_lowercase();
            table.set_filter(Some(RecordPredicate::new(move |r: &Record| {
                r.field("link_source_name")
                    .as_text()
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })));
            show(table, columns);
        }
        Some("min-amount") if rest.len() > 1 => match rest[1].parse::<f64>() {
            Ok(min) => {
                table.set_filter(Some(RecordPredicate::new(move |r: &Record| {
                    r.field("amount").as_number().map(|a| a >= min).unwrap_or(false)
                })));
                show(table, columns);
            }
            Err(_) => println!("usage: filter min-amount <number>"),
        },
        _ => println!(
            "usage: filter purchased | filter source <text> | filter min-amount <n> | filter none"
        ),
    }
}

fn print_help() {
    println!(
        "commands:\n\
         \x20 show                      render the current page\n\
         \x20 next / prev / first / last page navigation\n\
         \x20 page <n>                  go to page n (1-based)\n\
         \x20 size <rows>               set page size, e.g. {:?}\n\
         \x20 group <col,col,...>       set grouping (group none = flat)\n\
         \x20 group                     print current grouping\n\
         \x20 toggle <row>              expand/collapse the group on that row\n\
         \x20 filter purchased          keep records with a purchase\n\
         \x20 filter source <text>      keep records whose source contains text\n\
         \x20 filter min-amount <n>     keep records with amount >= n\n\
         \x20 filter none               clear the filter\n\
         \x20 stats                     pipeline counters\n\
         \x20 quit",
        PAGE_SIZE_PALETTE
    );
}
