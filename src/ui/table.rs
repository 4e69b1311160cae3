use tabled::{builder::Builder, settings::Style, Table as TabledTable, Tabled};
use crate::table::Table;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Two-column metric/value table
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        TabledTable::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Render a result set, showing at most `max_rows` rows
pub fn render_table(table: &Table, max_rows: Option<usize>) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());

    let shown = max_rows.unwrap_or(usize::MAX).min(table.row_count());
    for row in &table.rows()[..shown] {
        builder.push_record(row.iter().map(|v| v.to_string()));
    }

    let mut rendered = builder.build().with(Style::rounded()).to_string();
    if shown < table.row_count() {
        rendered.push_str(&format!("\n… {} more rows", table.row_count() - shown));
    }
    rendered
}
