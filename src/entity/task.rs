use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub application: String,
    pub comment: String,
    pub trigger: String,
    pub user: String,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl ScheduledTask {
    pub fn same_task(&self, other: &ScheduledTask) -> bool {
        self.application == other.application
            && self.comment == other.comment
            && self.trigger == other.trigger
            && self.user == other.user
            && self.computer == other.computer
    }
}
