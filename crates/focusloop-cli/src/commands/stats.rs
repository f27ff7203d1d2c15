use clap::Subcommand;
use focusloop_core::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's progress
    Today,
    /// All-time progress
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = db.stats_today()?;

    match action {
        StatsAction::Today => {
            let today = serde_json::json!({
                "stretches": stats.today_stretches,
                "work_secs": stats.today_work_secs,
                "complete": stats.today_complete,
            });
            println!("{}", serde_json::to_string_pretty(&today)?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
