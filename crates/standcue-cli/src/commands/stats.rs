use clap::Args;
use serde_json::json;
use standcue_core::Database;

#[derive(Args)]
pub struct StatsArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
    /// Number of recent sessions to include
    #[arg(long, default_value_t = 5)]
    recent: usize,
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = db.stats()?;
    let recent = db.recent_sessions(args.recent)?;

    if args.json {
        let out = json!({ "stats": stats, "recent": recent });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Today:    {} sessions, {} prompts",
        stats.today_sessions, stats.today_prompts
    );
    println!(
        "All time: {} sessions ({} completed), {} prompts, {} min",
        stats.total_sessions, stats.completed_sessions, stats.total_prompts, stats.total_minutes
    );
    for session in &recent {
        println!(
            "  {}  {:<9} {:>3} prompts  {}",
            session.ended_at.format("%Y-%m-%d %H:%M"),
            session.profile,
            session.prompts_acknowledged,
            if session.completed { "completed" } else { "stopped" }
        );
    }
    Ok(())
}
