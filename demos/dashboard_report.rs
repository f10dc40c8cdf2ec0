use financial_view_builder::report::TabularReport;
use financial_view_builder::utils::format_thousands;
use financial_view_builder::{sample_budget, DashboardConfig, DashboardSession};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("📊 Financial Dashboard Report");
    println!("═══════════════════════════════════════════════════════════════\n");

    let config = DashboardConfig {
        budget: Some(sample_budget()),
        ..DashboardConfig::default()
    };
    let mut session = DashboardSession::new(config)?;

    // Optional path to a CSV or spreadsheet; without one the sample is shown.
    if let Some(path) = std::env::args().nth(1) {
        let bytes = std::fs::read(&path)?;
        let filename = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());

        let outcome = session.load_upload(&bytes, &filename);
        if outcome.accepted {
            println!("✅ {}\n", outcome.status);
        } else {
            println!("⚠️  {}\n", outcome.status);
        }
    } else {
        println!("ℹ️  {}\n", session.status());
    }

    let dashboard = session.dashboard()?;

    println!("Business unit revenue:");
    for point in &dashboard.unit_revenue.points {
        println!(
            "   {:<8} {:>12} {:>12} {:>12}  consolidated {:>12}",
            point.label,
            format_thousands(point.business_1, 0),
            format_thousands(point.business_2, 0),
            format_thousands(point.business_3, 0),
            format_thousands(point.consolidated, 0),
        );
    }
    println!();

    println!("Cumulative revenue:");
    for point in &dashboard.cumulative_revenue.points {
        println!(
            "   {:<8} +{:>12} = {:>12}",
            point.label,
            format_thousands(point.revenue, 0),
            format_thousands(point.cumulative, 0)
        );
    }
    println!();

    for point in dashboard.expenses.points.iter().filter(|p| !p.foots) {
        println!(
            "⚠️  {}: expense components differ from Total Expenses by {}",
            point.label,
            format_thousands(point.difference, 0)
        );
    }

    print!("{}", dashboard.summary.to_markdown());
    print!("{}", dashboard.income_statement.to_markdown());
    print!("{}", dashboard.profit_and_loss.to_markdown());
    print!("{}", dashboard.balance_sheet.to_markdown());

    if dashboard.balance_sheet.balanced == Some(false) {
        println!("⚠️  Balance sheet does not balance");
    }

    Ok(())
}
