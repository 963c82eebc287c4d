use chrono::DateTime;
use chrono::Utc;

use serde::Deserialize;
use serde::Serialize;

use crate::economy::ledger::FocusLedger;
use crate::utils::percentage::Percent;

/// The struct stored on disk, one JSON object per installation. Every piece of
/// user state lives here so that a single write always lands the whole picture
/// at once; there is no second place for parts of it to drift out of sync with.
///
/// Field names follow the wire format of earlier releases (camelCase), so an
/// existing data file keeps loading.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AppDocument {
    pub user: Option<UserProfile>,
    pub current_mode: Mode,
    pub tasks: Vec<Task>,
    pub notes: Vec<Note>,
    pub reminders: Vec<Reminder>,
    pub daily_goal: Option<String>,
    pub daily_goal_completed: bool,
    pub sentiment_entries: Vec<SentimentEntry>,
    pub food_entries: Vec<FoodEntry>,
    pub focus_points: FocusLedger,
    pub focus_tracking: Vec<FocusEvent>,
    pub comfort_vault: Vec<ComfortItem>,
    pub zen_garden: ZenGarden,
    pub settings: Settings,
    /// Local date of the last daily rollover. Absent in files written by
    /// earlier releases, which never rolled anything over.
    pub last_reset: Option<chrono::NaiveDate>,
}

impl AppDocument {
    pub fn add_task(&mut self, task: Task) -> &Task {
        self.tasks.push(task);
        self.tasks.last().unwrap()
    }

    /// Flips `completed` on the matching task. `None` means no task carries
    /// this id.
    pub fn toggle_task(&mut self, id: i64) -> Option<&Task> {
        let task = self.tasks.iter_mut().find(|v| v.id == id)?;
        task.completed = !task.completed;
        Some(task)
    }

    pub fn remove_task(&mut self, id: i64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|v| v.id != id);
        self.tasks.len() != before
    }

    pub fn add_note(&mut self, note: Note) -> &Note {
        self.notes.push(note);
        self.notes.last().unwrap()
    }

    pub fn remove_note(&mut self, id: i64) -> bool {
        let before = self.notes.len();
        self.notes.retain(|v| v.id != id);
        self.notes.len() != before
    }

    pub fn add_reminder(&mut self, reminder: Reminder) -> &Reminder {
        self.reminders.push(reminder);
        self.reminders.last().unwrap()
    }

    pub fn remove_reminder(&mut self, id: i64) -> bool {
        let before = self.reminders.len();
        self.reminders.retain(|v| v.id != id);
        self.reminders.len() != before
    }

    /// Newest entry first, the order the journal is shown in.
    pub fn add_sentiment(&mut self, entry: SentimentEntry) -> &SentimentEntry {
        self.sentiment_entries.insert(0, entry);
        &self.sentiment_entries[0]
    }

    pub fn add_food(&mut self, entry: FoodEntry) -> &FoodEntry {
        self.food_entries.insert(0, entry);
        &self.food_entries[0]
    }

    pub fn add_comfort(&mut self, item: ComfortItem) -> &ComfortItem {
        self.comfort_vault.insert(0, item);
        &self.comfort_vault[0]
    }

    pub fn add_focus_event(&mut self, event: FocusEvent) -> &FocusEvent {
        self.focus_tracking.push(event);
        self.focus_tracking.last().unwrap()
    }

    /// Meals recorded inside `[from, to)`. Callers pass day bounds to get the
    /// "today" view.
    pub fn meals_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<FoodEntry> {
        self.food_entries
            .iter()
            .filter(|v| v.created_at >= from && v.created_at < to)
            .cloned()
            .collect()
    }

    /// Largest id anywhere in the document, for seeding [IdGenerator] after a
    /// load.
    pub fn max_id(&self) -> i64 {
        self.tasks
            .iter()
            .map(|v| v.id)
            .chain(self.notes.iter().map(|v| v.id))
            .chain(self.reminders.iter().map(|v| v.id))
            .chain(self.sentiment_entries.iter().map(|v| v.id))
            .chain(self.food_entries.iter().map(|v| v.id))
            .chain(self.comfort_vault.iter().map(|v| v.id))
            .chain(self.focus_tracking.iter().map(|v| v.id))
            .chain(self.zen_garden.seeds.iter().map(|v| v.id))
            .chain(self.zen_garden.planted_trees.iter().map(|v| v.id))
            .max()
            .unwrap_or(0)
    }
}

/// Which screen the app is on. `destress` is the name an earlier web build
/// used for the chill screen and still parses.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Selection,
    Work,
    #[serde(alias = "destress")]
    Chill,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// One mood check-in. `mood` and `color` are whatever the check-in screen
/// offered; `answers` holds the free-text prompts.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SentimentEntry {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// `time` is the user-entered clock string, not parsed. The earliest desktop
/// build wrote only `{id, meal, time}`: such entries load as eaten and dated
/// at the epoch, so they never count toward "today".
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    pub id: i64,
    pub meal: String,
    #[serde(default)]
    pub time: String,
    #[serde(default = "ate_default")]
    pub ate: bool,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

/// Older documents wrote the content under `text` with no kind; both still
/// load.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ComfortItem {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: ComfortKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(alias = "text")]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComfortKind {
    Image,
    #[default]
    Text,
    Quote,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FocusEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: FocusKind,
    pub created_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum FocusKind {
    Session,
    Distraction,
}

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ZenGarden {
    pub seeds: Vec<Planting>,
    pub planted_trees: Vec<Planting>,
}

/// A planting is written once and never mutated afterwards; the only way one
/// disappears is a full-state reset. Seeds planted before sizes and kinds
/// were rolled load as the smallest sprout.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Planting {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: PlantKind,
    pub x: Percent,
    pub y: Percent,
    #[serde(default = "smallest_seed")]
    pub size: f64,
    pub planted_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlantKind {
    Flower,
    Tree,
    #[default]
    Sprout,
}

// Fallbacks for fields older documents never wrote
fn ate_default() -> bool {
    true
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

fn smallest_seed() -> f64 {
    30.0
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub color_mode: ColorMode,
    pub audio_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            color_mode: ColorMode::Pink,
            audio_enabled: true,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Pink,
    Ocean,
    Forest,
}

/// Hands out document-unique ids derived from the creation time in
/// milliseconds, like earlier releases did with `Date.now()`. Two creations in
/// the same millisecond bump forward by one instead of colliding.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator::default()
    }

    /// Seeds the generator past every id already in the document, so a reload
    /// never reissues one.
    pub fn observe(&mut self, document: &AppDocument) {
        self.last = self.last.max(document.max_id());
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        self.last = if candidate > self.last {
            candidate
        } else {
            self.last + 1
        };
        self.last
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn stamp(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn task(id: i64, text: &str) -> Task {
        Task {
            id,
            text: text.into(),
            completed: false,
            created_at: stamp(0),
        }
    }

    #[test]
    fn toggling_flips_and_reports_missing_tasks() {
        let mut document = AppDocument::default();
        document.add_task(task(1, "water the plants"));

        assert!(document.toggle_task(1).unwrap().completed);
        assert!(!document.toggle_task(1).unwrap().completed);
        assert!(document.toggle_task(999).is_none());
    }

    #[test]
    fn removing_an_absent_id_changes_nothing() {
        let mut document = AppDocument::default();
        document.add_task(task(1, "a"));
        document.add_task(task(2, "b"));

        assert!(!document.remove_task(3));
        assert_eq!(document.tasks.len(), 2);
        assert!(document.remove_task(1));
        assert_eq!(document.tasks.len(), 1);
    }

    #[test]
    fn notes_and_reminders_follow_the_task_contract() {
        let mut document = AppDocument::default();
        document.add_note(Note {
            id: 1,
            text: "breathe".into(),
            created_at: stamp(0),
        });
        document.add_reminder(Reminder {
            id: 2,
            text: "water at noon".into(),
            created_at: stamp(1),
        });

        assert!(!document.remove_note(2));
        assert!(document.remove_note(1));
        assert!(document.remove_reminder(2));
        assert!(document.notes.is_empty());
        assert!(document.reminders.is_empty());
    }

    #[test]
    fn journal_entries_go_newest_first() {
        let mut document = AppDocument::default();
        for (id, mood) in [(1, "sad"), (2, "great")] {
            document.add_sentiment(SentimentEntry {
                id,
                mood: Some(mood.into()),
                color: None,
                answers: vec![],
                created_at: stamp(id),
            });
        }

        assert_eq!(document.sentiment_entries[0].id, 2);
        assert_eq!(document.sentiment_entries[1].id, 1);
    }

    #[test]
    fn meals_filter_by_day_bounds() {
        let mut document = AppDocument::default();
        for (id, seconds) in [(1, 0), (2, 3600), (3, 90_000)] {
            document.add_food(FoodEntry {
                id,
                meal: "toast".into(),
                time: "08:30".into(),
                ate: true,
                created_at: stamp(seconds),
            });
        }

        let today = document.meals_between(stamp(0), stamp(86_400));
        assert_eq!(today.iter().map(|v| v.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn id_generator_never_repeats_within_a_millisecond() {
        let mut ids = IdGenerator::new();
        let now = stamp(0);
        let first = ids.next_id(now);
        let second = ids.next_id(now);
        let third = ids.next_id(now);

        assert_eq!(first, now.timestamp_millis());
        assert_eq!(second, first + 1);
        assert_eq!(third, second + 1);
    }

    #[test]
    fn id_generator_seeds_past_loaded_ids() {
        let mut document = AppDocument::default();
        document.add_task(task(5_000_000_000_000, "future"));

        let mut ids = IdGenerator::new();
        ids.observe(&document);

        assert_eq!(ids.next_id(stamp(0)), 5_000_000_000_001);
    }

    #[test]
    fn wire_names_stay_camel_case() {
        let json = serde_json::to_string(&AppDocument::default()).unwrap();

        for name in [
            "currentMode",
            "dailyGoalCompleted",
            "sentimentEntries",
            "focusPoints",
            "comfortVault",
            "zenGarden",
            "plantedTrees",
        ] {
            assert!(json.contains(name), "missing {name} in {json}");
        }
    }

    #[test]
    fn legacy_documents_still_load() {
        let document: AppDocument = serde_json::from_str(
            r#"{
                "currentMode": "destress",
                "tasks": [{"id": 1, "text": "stretch", "createdAt": "2024-03-01T10:00:00Z"}],
                "focusPoints": 25,
                "comfortVault": [{
                    "id": 2,
                    "type": "quote",
                    "content": "one day at a time",
                    "createdAt": "2024-03-01T10:00:00Z"
                }],
                "zenGarden": {
                    "seeds": [{
                        "id": 3,
                        "type": "flower",
                        "x": 40,
                        "y": 60,
                        "size": 38.2,
                        "plantedAt": "2024-03-01T10:05:00Z"
                    }],
                    "plantedTrees": []
                },
                "unknownFutureField": {"ignored": true}
            }"#,
        )
        .unwrap();

        assert_eq!(document.current_mode, Mode::Chill);
        assert_eq!(document.focus_points.balance(), 25);
        assert!(!document.tasks[0].completed);
        assert_eq!(document.comfort_vault[0].kind, ComfortKind::Quote);
        assert_eq!(document.zen_garden.seeds[0].kind, PlantKind::Flower);
        assert!(document.last_reset.is_none());
        assert_eq!(document.settings, Settings::default());

        // kinds keep their historical wire name
        let json = serde_json::to_string(&document).unwrap();
        assert!(json.contains(r#""type":"flower""#));
    }

    #[test]
    fn first_desktop_build_documents_load_without_loss() {
        // Entry shapes exactly as that build's producers wrote them: comfort
        // items under `text` with no kind, meals without `ate` or `createdAt`,
        // seeds without a size
        let document: AppDocument = serde_json::from_str(
            r#"{
                "currentMode": "work",
                "focusPoints": 25,
                "comfortVault": [{
                    "id": 1,
                    "text": "grandma's garden",
                    "createdAt": "2023-11-14T09:00:00.000Z"
                }],
                "foodEntries": [{
                    "id": 2,
                    "meal": "soup",
                    "time": "2023-11-14T12:30:00.000Z"
                }],
                "zenGarden": {
                    "seeds": [
                        {
                            "id": 3,
                            "type": "tree",
                            "x": 42.5,
                            "y": 61,
                            "plantedAt": "2023-11-14T13:00:00.000Z",
                            "growth": 0
                        },
                        {
                            "id": 4,
                            "x": 15,
                            "y": 30,
                            "plantedAt": "2023-11-15T13:00:00.000Z",
                            "growth": 0
                        }
                    ],
                    "plantedTrees": []
                }
            }"#,
        )
        .unwrap();

        assert_eq!(document.focus_points.balance(), 25);

        let comfort = &document.comfort_vault[0];
        assert_eq!(comfort.kind, ComfortKind::Text);
        assert_eq!(comfort.content, "grandma's garden");

        let meal = &document.food_entries[0];
        assert!(meal.ate);
        assert_eq!(meal.created_at, DateTime::UNIX_EPOCH);

        assert_eq!(document.zen_garden.seeds[0].kind, PlantKind::Tree);
        assert_eq!(document.zen_garden.seeds[0].size, 30.0);
        assert_eq!(document.zen_garden.seeds[1].kind, PlantKind::Sprout);
    }
}
