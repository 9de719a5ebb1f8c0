//! Instruction brief for the SQL translator.
//!
//! The brief is rebuilt for every request from the current snapshot's latest
//! period, so an unqualified question always resolves to the newest data.

use crate::cache::Snapshot;
use crate::config::DEFAULT_TABLE;

/// Columns of the single queryable table with their semantic types.
pub const COLUMNS: &[(&str, &str)] = &[
    ("id", "int"),
    ("country", "text"),
    ("region", "text"),
    ("lpi_score", "float"),
    ("year", "int"),
];

/// Build the brief for the default table with no explicit year list.
pub fn build_instructions(latest_period: i64) -> String {
    render(DEFAULT_TABLE, latest_period, &[])
}

/// Build the brief for a snapshot, listing the periods it actually contains.
/// `table` is the name the translator is told to query.
pub fn build_instructions_for(snapshot: &Snapshot, table: &str) -> String {
    render(table, snapshot.latest_period, &snapshot.periods())
}

fn render(table: &str, latest: i64, periods: &[i64]) -> String {
    let years = if periods.is_empty() {
        format!("e.g. {latest}")
    } else {
        periods.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
    };

    let columns = COLUMNS
        .iter()
        .map(|(name, ty)| {
            if *name == "year" {
                format!("- {name} ({ty}) (Available years: {years})")
            } else {
                format!("- {name} ({ty})")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a SQL expert.
The table name is '{table}' with columns:
{columns}

Given a natural language question, generate a valid SQL query to answer it.
Return ONLY the SQL query. Do not include markdown formatting like ```sql.
Do not include explanations.

IMPORTANT: DATE/TIME LOGIC
1. IF the user specified a year (e.g. \"in 2018\"), ADD `WHERE year = 2018` using that year.
2. IF the user did NOT specify a year, YOU MUST DEFAULT TO THE LATEST DATA ({latest}).
   - Use `WHERE year = {latest}` automatically.
   - This prevents duplicate country entries from appearing in the results.
   - Example: \"Top 5 countries\" -> SELECT country, lpi_score FROM {table} WHERE year = {latest} ORDER BY lpi_score DESC LIMIT 5

Query conventions:
- Use standard SQL syntax compatible with SQLite.
- Query only the table '{table}'.
- For case-insensitive text matching use ilike(column, '%text%'), e.g. ilike(region, '%asia%').
- \"Asia\" should match '%Asia%'.
- \"average\" implies AVG().
- \"logistics performance\" refers to 'lpi_score'.
"
    )
}
