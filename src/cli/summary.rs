use std::path::PathBuf;

use ansi_term::Colour;
use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use clap::Parser;
use now::DateTimeNow;

use crate::{
    store::{
        document::{AppDocument, FocusKind, Mode, PlantKind},
        json_store::{DocumentStore, JsonDocumentStore},
    },
    utils::dir::create_application_default_path,
};

#[derive(Debug, Parser)]
pub struct SummaryCommand {
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "List every planting in the garden, not just the totals")]
    garden: bool,
}

/// Command to process `summary`. Prints a snapshot of the document without
/// going through the daemon. Reads take a shared lock, so this is safe to run
/// while the daemon is up.
pub async fn process_summary_command(
    SummaryCommand { dir, garden }: SummaryCommand,
) -> Result<()> {
    let dir = dir.map_or_else(create_application_default_path, Ok)?;
    let store = JsonDocumentStore::new(dir)?;
    let document = store.load().await;

    let day_start = Local::now().beginning_of_day().with_timezone(&Utc);
    let counts = DayCounts::collect(&document, day_start, day_start + Duration::days(1));

    println!(
        "{} {}",
        label("Signed in"),
        match &document.user {
            Some(user) => user.name.as_deref().unwrap_or(&user.email).to_string(),
            None => "nobody".to_string(),
        }
    );
    println!("{} {}", label("Mode"), mode_name(document.current_mode));
    println!(
        "{} {}",
        label("Focus points"),
        Colour::Yellow.bold().paint(document.focus_points.balance().to_string())
    );
    println!(
        "{} {}",
        label("Daily goal"),
        match (&document.daily_goal, document.daily_goal_completed) {
            (Some(goal), true) => format!("{goal} {}", Colour::Green.paint("(done)")),
            (Some(goal), false) => goal.clone(),
            (None, _) => "none set".to_string(),
        }
    );
    println!(
        "{} {} of {} done",
        label("Tasks"),
        counts.tasks_done,
        document.tasks.len()
    );
    println!(
        "{} {} eaten, {} skipped",
        label("Meals today"),
        counts.meals_eaten,
        counts.meals_skipped
    );
    println!("{} {} today", label("Check-ins"), counts.checkins_today);
    println!("{} {} today", label("Focus sessions"), counts.sessions_today);
    println!(
        "{} {} seeds, {} trees",
        label("Garden"),
        document.zen_garden.seeds.len(),
        document.zen_garden.planted_trees.len()
    );

    if garden {
        for planting in document
            .zen_garden
            .planted_trees
            .iter()
            .chain(document.zen_garden.seeds.iter())
        {
            println!(
                "\t{}\tat ({}, {})\tsize {:.0}\tplanted {}",
                plant_name(planting.kind),
                planting.x,
                planting.y,
                planting.size,
                planting.planted_at.with_timezone(&Local).format("%x")
            );
        }
    }

    Ok(())
}

fn label(text: &str) -> String {
    Colour::Cyan.bold().paint(format!("{text:<16}")).to_string()
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Selection => "selection",
        Mode::Work => "work",
        Mode::Chill => "chill",
    }
}

fn plant_name(kind: PlantKind) -> &'static str {
    match kind {
        PlantKind::Flower => "flower",
        PlantKind::Tree => "tree",
        PlantKind::Sprout => "sprout",
    }
}

#[derive(Debug, PartialEq, Eq)]
struct DayCounts {
    tasks_done: usize,
    meals_eaten: usize,
    meals_skipped: usize,
    checkins_today: usize,
    sessions_today: usize,
}

impl DayCounts {
    fn collect(document: &AppDocument, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let meals = document.meals_between(from, to);
        let meals_eaten = meals.iter().filter(|v| v.ate).count();
        let today = |created_at: DateTime<Utc>| created_at >= from && created_at < to;

        Self {
            tasks_done: document.tasks.iter().filter(|v| v.completed).count(),
            meals_eaten,
            meals_skipped: meals.len() - meals_eaten,
            checkins_today: document
                .sentiment_entries
                .iter()
                .filter(|v| today(v.created_at))
                .count(),
            sessions_today: document
                .focus_tracking
                .iter()
                .filter(|v| v.kind == FocusKind::Session && today(v.created_at))
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::document::{FocusEvent, FoodEntry, SentimentEntry, Task};

    #[test]
    fn counts_split_todays_activity_from_the_rest() {
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let to = from + Duration::days(1);
        let inside = from + Duration::hours(9);
        let before = from - Duration::hours(1);

        let mut document = AppDocument::default();
        document.add_task(Task {
            id: 1,
            text: "stretch".into(),
            completed: true,
            created_at: before,
        });
        document.add_task(Task {
            id: 2,
            text: "water".into(),
            completed: false,
            created_at: inside,
        });
        document.add_food(FoodEntry {
            id: 3,
            meal: "breakfast".into(),
            time: "09:00".into(),
            ate: true,
            created_at: inside,
        });
        document.add_food(FoodEntry {
            id: 4,
            meal: "lunch".into(),
            time: "13:00".into(),
            ate: false,
            created_at: inside,
        });
        document.add_food(FoodEntry {
            id: 5,
            meal: "dinner".into(),
            time: "19:00".into(),
            ate: true,
            created_at: before,
        });
        document.add_sentiment(SentimentEntry {
            id: 6,
            mood: Some("calm".into()),
            color: None,
            answers: vec![],
            created_at: inside,
        });
        document.add_focus_event(FocusEvent {
            id: 7,
            kind: FocusKind::Session,
            created_at: inside,
        });
        document.add_focus_event(FocusEvent {
            id: 8,
            kind: FocusKind::Distraction,
            created_at: inside,
        });

        assert_eq!(
            DayCounts::collect(&document, from, to),
            DayCounts {
                tasks_done: 1,
                meals_eaten: 1,
                meals_skipped: 1,
                checkins_today: 1,
                sessions_today: 1,
            }
        );
    }
}
