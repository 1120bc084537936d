//! Terminal output helpers

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use catalog_access::pagination::PageResult;

/// Print any serialisable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a page as JSON followed by a one-line summary on stderr
pub fn print_page<T: Serialize>(page: &PageResult<T>) -> Result<()> {
    print_json(page)?;
    eprintln!("{}", page_summary(page).dimmed());
    Ok(())
}

fn page_summary<T>(page: &PageResult<T>) -> String {
    format!(
        "page {} of {} ({} shown, {} total)",
        page.page_index + 1,
        page.total_pages.max(1),
        page.len(),
        page.total_elements
    )
}

/// Print a success line
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}
