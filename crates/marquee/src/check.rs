//! One-shot schedule evaluation for operators and telemetry collaborators.

use std::path::Path;

use chrono::Local;
use miette::Result;

use marquee_schedule::{Schedule, validate};

pub fn run(schedule_path: &Path) -> Result<()> {
    let document = crate::daemon::read_document(schedule_path)?;

    if !validate(&document) {
        println!("invalid schedule data");
        return Ok(());
    }

    let schedule = Schedule::from_document(&document)
        .map_err(|e| miette::miette!("failed to parse schedule: {}", e))?;
    let now = Local::now().naive_local();

    println!(
        "schedule:       {}",
        schedule.name.as_deref().unwrap_or("<unnamed>")
    );
    println!("always open:    {}", schedule.is_always_open());
    println!("would play now: {}", schedule.would_play_now(now));

    let playable = schedule.currently_playable(now);
    println!("eligible items: {}", playable.len());
    for item in &playable {
        println!("  {} -> {}", item.name, item.object_reference);
    }

    if !schedule.is_always_open() {
        let delay = schedule.next_recheck_delay(now);
        println!("next re-check:  {}s", delay.num_seconds());
    }

    Ok(())
}
