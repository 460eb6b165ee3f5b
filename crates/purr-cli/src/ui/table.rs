//! Table renderers for listings and statistics.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use purr_core::InstalledPackage;
use purr_schema::{PackageStats, PackageSummary, RepositoryStatistics};

/// How many entries `stats` shows per ranking.
pub const TOP_ENTRIES: usize = 5;

fn base() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn table(header: &[&str]) -> Table {
    let mut table = base();
    table.set_header(header.iter().map(Cell::new));
    table
}

fn count(n: u64) -> Cell {
    Cell::new(group_thousands(n)).set_alignment(CellAlignment::Right)
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn installed(packages: &[InstalledPackage]) -> Table {
    let mut t = table(&["PACKAGE", "VERSION", "DESCRIPTION"]);
    for pkg in packages {
        let (version, description) = match &pkg.record {
            Some(record) => (
                record.version().unwrap_or("latest").to_string(),
                record.description.clone(),
            ),
            None => ("?".to_string(), "incomplete install (no furconfig.json)".to_string()),
        };
        t.add_row(vec![Cell::new(&pkg.name), Cell::new(version), Cell::new(description)]);
    }
    t
}

pub fn summaries(packages: &[PackageSummary]) -> Table {
    let mut t = table(&["PACKAGE", "VERSION", "DESCRIPTION"]);
    for pkg in packages {
        t.add_row(vec![
            Cell::new(&pkg.name),
            Cell::new(&pkg.version),
            Cell::new(&pkg.description),
        ]);
    }
    t
}

pub fn overview(stats: &RepositoryStatistics) -> Table {
    let mut t = base();
    t.add_row(vec![Cell::new("Total Packages"), count(stats.total_packages)]);
    t.add_row(vec![Cell::new("Active Packages"), count(stats.active_packages)]);
    t.add_row(vec![Cell::new("Total Downloads"), count(stats.total_downloads)]);
    t.add_row(vec![Cell::new("Total Views"), count(stats.total_views)]);
    t
}

pub fn most_downloaded(packages: &[PackageStats]) -> Table {
    let mut t = table(&["PACKAGE", "DOWNLOADS"]);
    for pkg in packages.iter().take(TOP_ENTRIES) {
        t.add_row(vec![Cell::new(&pkg.name), count(pkg.downloads)]);
    }
    t
}

pub fn recently_added(packages: &[PackageStats]) -> Table {
    let mut t = table(&["PACKAGE", "VERSION", "ADDED"]);
    for pkg in packages.iter().take(TOP_ENTRIES) {
        let added = pkg
            .added_date
            .as_deref()
            .map(purr_schema::format_timestamp)
            .unwrap_or_default();
        t.add_row(vec![Cell::new(&pkg.name), Cell::new(&pkg.version), Cell::new(added)]);
    }
    t
}
