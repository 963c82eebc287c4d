/// Everything a user can do that earns focus points.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Activity {
    DailyGoalCompleted,
    FocusSession,
    TaskCompleted,
    SentimentLogged,
    MealLogged,
    ComfortAdded,
}

pub const DEFAULT_TASK_REWARD: u64 = 10;

/// How much each activity pays out. The amounts are fixed except the task
/// reward, which the operator can change or zero out entirely.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct RewardTable {
    task_reward: u64,
}

impl Default for RewardTable {
    fn default() -> Self {
        RewardTable {
            task_reward: DEFAULT_TASK_REWARD,
        }
    }
}

impl RewardTable {
    pub fn new(task_reward: u64) -> Self {
        RewardTable { task_reward }
    }

    pub fn reward_for(&self, activity: Activity) -> u64 {
        match activity {
            Activity::DailyGoalCompleted => 50,
            Activity::FocusSession => 10,
            Activity::TaskCompleted => self.task_reward,
            Activity::SentimentLogged => 15,
            Activity::MealLogged => 5,
            Activity::ComfortAdded => 5,
        }
    }
}
