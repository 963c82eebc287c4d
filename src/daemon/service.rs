use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use now::DateTimeNow;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    economy::{
        garden::{self, GardenError, PlantRequest},
        ledger::InsufficientFunds,
        rules::{Activity, RewardTable},
    },
    oracle::MoodState,
    store::{
        document::{
            AppDocument, ComfortItem, ComfortKind, FocusEvent, FocusKind, FoodEntry, IdGenerator,
            Mode, Planting, SentimentEntry, Task, UserProfile,
        },
        json_store::DocumentStore,
    },
    utils::clock::Clock,
};

/// The one place application state is read or changed. The service owns the
/// document outright and works through requests strictly one at a time, so
/// every earn-then-spend sequence is a single uninterrupted step and two
/// callers can never overwrite each other's writes.
pub struct AppService<S> {
    store: S,
    document: AppDocument,
    ids: IdGenerator,
    rewards: RewardTable,
    daily_reset: bool,
    mood: watch::Receiver<MoodState>,
    receiver: mpsc::Receiver<BridgeRequest>,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
    rng: StdRng,
}

/// Clonable far end of the service channel. Every UI transport and test goes
/// through one of these.
#[derive(Clone)]
pub struct BridgeHandle {
    sender: mpsc::Sender<BridgeRequest>,
}

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
enum BridgeRequest {
    LoadDocument { reply: Reply<AppDocument> },
    SaveDocument { document: Box<AppDocument>, reply: Reply<bool> },
    Balance { reply: Reply<u64> },
    Credit { amount: u64, reply: Reply<u64> },
    AdjustPoints { change: i64, reply: Reply<Result<u64, InsufficientFunds>> },
    Plant { request: PlantRequest, reply: Reply<Result<PlantOutcome, GardenError>> },
    Login { email: String, name: Option<String>, reply: Reply<UserProfile> },
    Logout { reply: Reply<()> },
    CharacterState { reply: Reply<MoodState> },
    Status { reply: Reply<StatusReport> },
    SetMode { mode: Mode, reply: Reply<Mode> },
    Tasks { reply: Reply<Vec<Task>> },
    AddTask { text: String, reply: Reply<Result<Task, ServiceError>> },
    ToggleTask { id: i64, reply: Reply<Result<ToggleOutcome, ServiceError>> },
    DeleteTask { id: i64, reply: Reply<bool> },
    AddSentiment { draft: SentimentDraft, reply: Reply<EarnOutcome> },
    AddFood { draft: FoodDraft, reply: Reply<EarnOutcome> },
    AddComfort { draft: ComfortDraft, reply: Reply<EarnOutcome> },
    SetGoal { goal: Option<String>, completed: Option<bool>, reply: Reply<u64> },
    LogFocus { kind: FocusKind, reply: Reply<u64> },
    MealsToday { reply: Reply<Vec<FoodEntry>> },
}

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum ServiceError {
    #[error("Task text required")]
    EmptyText,
    #[error("Task not found")]
    TaskNotFound { id: i64 },
}

/// What a successful planting reports back over the bridge.
#[derive(PartialEq, Debug, Clone)]
pub struct PlantOutcome {
    pub planting: Planting,
    pub balance: u64,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ToggleOutcome {
    pub task: Task,
    pub balance: u64,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct EarnOutcome {
    pub points_earned: u64,
    pub balance: u64,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize)]
pub struct StatusReport {
    pub character_state: MoodState,
    pub focus_points: u64,
    pub current_mode: Mode,
}

/// A check-in as it arrives over the bridge, before an id is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentDraft {
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FoodDraft {
    #[serde(default)]
    pub meal: String,
    #[serde(default)]
    pub time: String,
    #[serde(default = "ate_default")]
    pub ate: bool,
}

fn ate_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComfortDraft {
    #[serde(rename = "type")]
    pub kind: ComfortKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl<S: DocumentStore> AppService<S> {
    /// Builds the service around whatever the store currently holds. The read
    /// happens here, once; afterwards the in-memory document is authoritative.
    pub async fn load(
        store: S,
        rewards: RewardTable,
        daily_reset: bool,
        mood: watch::Receiver<MoodState>,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
        rng: StdRng,
    ) -> (Self, BridgeHandle) {
        let document = store.load().await;
        let mut ids = IdGenerator::new();
        ids.observe(&document);

        let (sender, receiver) = mpsc::channel(16);
        let service = Self {
            store,
            document,
            ids,
            rewards,
            daily_reset,
            mood,
            receiver,
            shutdown,
            time_provider,
            rng,
        };
        (service, BridgeHandle { sender })
    }

    /// Executes the service event loop.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                request = self.receiver.recv() => {
                    let Some(request) = request else { break };
                    debug!("Handling {request:?}");
                    self.handle(request).await;
                }
            }
        }

        // One last write so nothing rides on the per-request flushes alone
        self.flush().await;
        self.receiver.close();
        Ok(())
    }

    async fn handle(&mut self, request: BridgeRequest) {
        if self.rollover_if_needed() {
            self.flush().await;
        }

        match request {
            BridgeRequest::LoadDocument { reply } => {
                let _ = reply.send(self.document.clone());
            }
            BridgeRequest::SaveDocument { document, reply } => {
                self.document = *document;
                self.ids.observe(&self.document);
                let saved = self.flush().await;
                let _ = reply.send(saved);
            }
            BridgeRequest::Balance { reply } => {
                let _ = reply.send(self.document.focus_points.balance());
            }
            BridgeRequest::Credit { amount, reply } => {
                let balance = self.document.focus_points.credit(amount);
                self.flush().await;
                let _ = reply.send(balance);
            }
            BridgeRequest::AdjustPoints { change, reply } => {
                let outcome = self.adjust_points(change);
                if outcome.is_ok() {
                    self.flush().await;
                }
                let _ = reply.send(outcome);
            }
            BridgeRequest::Plant { request, reply } => {
                let now = self.now_utc();
                let outcome = garden::plant(
                    &mut self.document,
                    request,
                    now,
                    &mut self.ids,
                    &mut self.rng,
                )
                .map(|planting| PlantOutcome {
                    planting,
                    balance: self.document.focus_points.balance(),
                });
                if outcome.is_ok() {
                    self.flush().await;
                }
                let _ = reply.send(outcome);
            }
            BridgeRequest::Login { email, name, reply } => {
                let profile = self.login(email, name);
                self.flush().await;
                let _ = reply.send(profile);
            }
            BridgeRequest::Logout { reply } => {
                self.document.user = None;
                self.flush().await;
                let _ = reply.send(());
            }
            BridgeRequest::CharacterState { reply } => {
                let _ = reply.send(*self.mood.borrow());
            }
            BridgeRequest::Status { reply } => {
                let _ = reply.send(StatusReport {
                    character_state: *self.mood.borrow(),
                    focus_points: self.document.focus_points.balance(),
                    current_mode: self.document.current_mode,
                });
            }
            BridgeRequest::SetMode { mode, reply } => {
                self.document.current_mode = mode;
                self.flush().await;
                let _ = reply.send(mode);
            }
            BridgeRequest::Tasks { reply } => {
                let _ = reply.send(self.document.tasks.clone());
            }
            BridgeRequest::AddTask { text, reply } => {
                let outcome = self.add_task(text);
                if outcome.is_ok() {
                    self.flush().await;
                }
                let _ = reply.send(outcome);
            }
            BridgeRequest::ToggleTask { id, reply } => {
                let outcome = self.toggle_task(id);
                if outcome.is_ok() {
                    self.flush().await;
                }
                let _ = reply.send(outcome);
            }
            BridgeRequest::DeleteTask { id, reply } => {
                let removed = self.document.remove_task(id);
                if removed {
                    self.flush().await;
                }
                let _ = reply.send(removed);
            }
            BridgeRequest::AddSentiment { draft, reply } => {
                let outcome = self.add_sentiment(draft);
                self.flush().await;
                let _ = reply.send(outcome);
            }
            BridgeRequest::AddFood { draft, reply } => {
                let outcome = self.add_food(draft);
                self.flush().await;
                let _ = reply.send(outcome);
            }
            BridgeRequest::AddComfort { draft, reply } => {
                let outcome = self.add_comfort(draft);
                self.flush().await;
                let _ = reply.send(outcome);
            }
            BridgeRequest::SetGoal { goal, completed, reply } => {
                let balance = self.set_goal(goal, completed);
                self.flush().await;
                let _ = reply.send(balance);
            }
            BridgeRequest::LogFocus { kind, reply } => {
                let balance = self.log_focus(kind);
                self.flush().await;
                let _ = reply.send(balance);
            }
            BridgeRequest::MealsToday { reply } => {
                let _ = reply.send(self.meals_today());
            }
        }
    }

    /// On the first request of a new local day the goal resets. Everything
    /// else carries over.
    fn rollover_if_needed(&mut self) -> bool {
        if !self.daily_reset {
            return false;
        }
        let today = self.time_provider.time().date_naive();
        if self.document.last_reset == Some(today) {
            return false;
        }

        self.document.daily_goal = None;
        self.document.daily_goal_completed = false;
        self.document.last_reset = Some(today);
        info!("Rolled the daily goal over to {today}");
        true
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.time_provider.time().with_timezone(&Utc)
    }

    fn adjust_points(&mut self, change: i64) -> Result<u64, InsufficientFunds> {
        if change >= 0 {
            Ok(self.document.focus_points.credit(change as u64))
        } else {
            self.document.focus_points.debit(change.unsigned_abs())
        }
    }

    /// No verification happens here: the "account" is a local profile stamped
    /// from the clock, nothing more.
    fn login(&mut self, email: String, name: Option<String>) -> UserProfile {
        let now = self.now_utc();
        let name =
            name.unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_owned());
        let profile = UserProfile {
            id: format!("user_{}", now.timestamp_millis()),
            email,
            name: Some(name),
            created_at: now,
        };
        self.document.user = Some(profile.clone());
        profile
    }

    fn add_task(&mut self, text: String) -> Result<Task, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::EmptyText);
        }

        let now = self.now_utc();
        let task = Task {
            id: self.ids.next_id(now),
            text: text.to_owned(),
            completed: false,
            created_at: now,
        };
        Ok(self.document.add_task(task).clone())
    }

    fn toggle_task(&mut self, id: i64) -> Result<ToggleOutcome, ServiceError> {
        let task = self
            .document
            .toggle_task(id)
            .ok_or(ServiceError::TaskNotFound { id })?
            .clone();

        // Finishing a task earns; unchecking takes nothing back
        if task.completed {
            self.document
                .focus_points
                .credit(self.rewards.reward_for(Activity::TaskCompleted));
        }
        Ok(ToggleOutcome {
            task,
            balance: self.document.focus_points.balance(),
        })
    }

    fn add_sentiment(&mut self, draft: SentimentDraft) -> EarnOutcome {
        let now = self.now_utc();
        let entry = SentimentEntry {
            id: self.ids.next_id(now),
            mood: draft.mood,
            color: draft.color,
            answers: draft.answers,
            created_at: now,
        };
        self.document.add_sentiment(entry);
        self.earn(Activity::SentimentLogged)
    }

    fn add_food(&mut self, draft: FoodDraft) -> EarnOutcome {
        let now = self.now_utc();
        let entry = FoodEntry {
            id: self.ids.next_id(now),
            meal: draft.meal,
            time: draft.time,
            ate: draft.ate,
            created_at: now,
        };
        self.document.add_food(entry);
        self.earn(Activity::MealLogged)
    }

    fn add_comfort(&mut self, draft: ComfortDraft) -> EarnOutcome {
        let now = self.now_utc();
        let item = ComfortItem {
            id: self.ids.next_id(now),
            kind: draft.kind,
            title: draft.title,
            content: draft.content,
            created_at: now,
        };
        self.document.add_comfort(item);
        self.earn(Activity::ComfortAdded)
    }

    fn earn(&mut self, activity: Activity) -> EarnOutcome {
        let points_earned = self.rewards.reward_for(activity);
        EarnOutcome {
            points_earned,
            balance: self.document.focus_points.credit(points_earned),
        }
    }

    fn set_goal(&mut self, goal: Option<String>, completed: Option<bool>) -> u64 {
        if let Some(text) = goal {
            self.document.daily_goal = Some(text);
        }
        if let Some(flag) = completed {
            // Only the not-done -> done edge pays out; setting it back to
            // false re-arms the goal
            if flag && !self.document.daily_goal_completed {
                self.document
                    .focus_points
                    .credit(self.rewards.reward_for(Activity::DailyGoalCompleted));
            }
            self.document.daily_goal_completed = flag;
        }
        self.document.focus_points.balance()
    }

    fn log_focus(&mut self, kind: FocusKind) -> u64 {
        let now = self.now_utc();
        let event = FocusEvent {
            id: self.ids.next_id(now),
            kind,
            created_at: now,
        };
        self.document.add_focus_event(event);

        if kind == FocusKind::Session {
            self.document
                .focus_points
                .credit(self.rewards.reward_for(Activity::FocusSession));
        }
        self.document.focus_points.balance()
    }

    fn meals_today(&self) -> Vec<FoodEntry> {
        let from = self.time_provider.time().beginning_of_day();
        let to = from + chrono::Duration::days(1);
        self.document
            .meals_between(from.with_timezone(&Utc), to.with_timezone(&Utc))
    }

    async fn flush(&mut self) -> bool {
        match self.store.save(&self.document).await {
            Ok(_) => true,
            Err(e) => {
                error!("Couldn't save the document: {e:?}");
                false
            }
        }
    }
}

impl BridgeHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> BridgeRequest,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| anyhow!("the state service is gone"))?;
        Ok(response.await?)
    }

    pub async fn load_document(&self) -> Result<AppDocument> {
        self.request(|reply| BridgeRequest::LoadDocument { reply }).await
    }

    /// Full replace. `Ok(false)` means the document was accepted but the disk
    /// write failed.
    pub async fn save_document(&self, document: AppDocument) -> Result<bool> {
        self.request(|reply| BridgeRequest::SaveDocument {
            document: Box::new(document),
            reply,
        })
        .await
    }

    pub async fn balance(&self) -> Result<u64> {
        self.request(|reply| BridgeRequest::Balance { reply }).await
    }

    pub async fn credit(&self, amount: u64) -> Result<u64> {
        self.request(|reply| BridgeRequest::Credit { amount, reply }).await
    }

    pub async fn adjust_points(&self, change: i64) -> Result<Result<u64, InsufficientFunds>> {
        self.request(|reply| BridgeRequest::AdjustPoints { change, reply }).await
    }

    pub async fn plant(&self, request: PlantRequest) -> Result<Result<PlantOutcome, GardenError>> {
        self.request(|reply| BridgeRequest::Plant { request, reply }).await
    }

    pub async fn login(&self, email: String, name: Option<String>) -> Result<UserProfile> {
        self.request(|reply| BridgeRequest::Login { email, name, reply }).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.request(|reply| BridgeRequest::Logout { reply }).await
    }

    pub async fn character_state(&self) -> Result<MoodState> {
        self.request(|reply| BridgeRequest::CharacterState { reply }).await
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.request(|reply| BridgeRequest::Status { reply }).await
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<Mode> {
        self.request(|reply| BridgeRequest::SetMode { mode, reply }).await
    }

    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.request(|reply| BridgeRequest::Tasks { reply }).await
    }

    pub async fn add_task(&self, text: String) -> Result<Result<Task, ServiceError>> {
        self.request(|reply| BridgeRequest::AddTask { text, reply }).await
    }

    pub async fn toggle_task(&self, id: i64) -> Result<Result<ToggleOutcome, ServiceError>> {
        self.request(|reply| BridgeRequest::ToggleTask { id, reply }).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<bool> {
        self.request(|reply| BridgeRequest::DeleteTask { id, reply }).await
    }

    pub async fn add_sentiment(&self, draft: SentimentDraft) -> Result<EarnOutcome> {
        self.request(|reply| BridgeRequest::AddSentiment { draft, reply }).await
    }

    pub async fn add_food(&self, draft: FoodDraft) -> Result<EarnOutcome> {
        self.request(|reply| BridgeRequest::AddFood { draft, reply }).await
    }

    pub async fn add_comfort(&self, draft: ComfortDraft) -> Result<EarnOutcome> {
        self.request(|reply| BridgeRequest::AddComfort { draft, reply }).await
    }

    pub async fn set_goal(&self, goal: Option<String>, completed: Option<bool>) -> Result<u64> {
        self.request(|reply| BridgeRequest::SetGoal { goal, completed, reply }).await
    }

    pub async fn log_focus(&self, kind: FocusKind) -> Result<u64> {
        self.request(|reply| BridgeRequest::LogFocus { kind, reply }).await
    }

    pub async fn meals_today(&self) -> Result<Vec<FoodEntry>> {
        self.request(|reply| BridgeRequest::MealsToday { reply }).await
    }
}
