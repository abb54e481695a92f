use super::TimeOfDay;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the whole generator, loadable from `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Canonical 2-hour lab window start times
    #[serde(default = "default_lab_starts")]
    pub lab_start_times: Vec<TimeOfDay>,
    /// Lunch row written into every timetable's `breaks` list
    #[serde(default = "default_lunch")]
    pub lunch_break: (TimeOfDay, TimeOfDay),
    #[serde(default)]
    pub refiner: RefinerConfig,
}

fn default_lab_starts() -> Vec<TimeOfDay> {
    vec![
        TimeOfDay::from_hm(8, 0),
        TimeOfDay::from_hm(10, 0),
        TimeOfDay::from_hm(12, 0),
        TimeOfDay::from_hm(14, 0),
        TimeOfDay::from_hm(15, 0),
    ]
}

fn default_lunch() -> (TimeOfDay, TimeOfDay) {
    (TimeOfDay::from_hm(13, 0), TimeOfDay::from_hm(14, 0))
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lab_start_times: default_lab_starts(),
            lunch_break: default_lunch(),
            refiner: RefinerConfig::default(),
        }
    }
}

/// Which local-search driver repairs residual conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefinerKind {
    Evolutionary,
    Swarm,
}

/// Parameters shared by both refiner drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinerConfig {
    #[serde(default = "default_kind")]
    pub kind: RefinerKind,
    #[serde(default = "default_population")]
    pub population: usize,
    #[serde(default = "default_generations")]
    pub generations: u32,
    #[serde(default = "default_tournament")]
    pub tournament_size: usize,
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// Per-child mutation probability in the evolutionary driver
    #[serde(default = "default_mutation")]
    pub mutation_probability: f64,
    /// Stop after this many generations without improvement
    #[serde(default = "default_stagnation")]
    pub stagnation_limit: u32,
    /// Swarm: abandon a food source after this many fruitless trials
    #[serde(default = "default_trial_limit")]
    pub trial_limit: u32,
    /// Wall-clock budget; the best-so-far is returned on expiry
    #[serde(default = "default_budget")]
    pub time_budget_ms: u64,
}

fn default_kind() -> RefinerKind {
    RefinerKind::Evolutionary
}
fn default_population() -> usize {
    20
}
fn default_generations() -> u32 {
    200
}
fn default_tournament() -> usize {
    3
}
fn default_elitism() -> usize {
    2
}
fn default_mutation() -> f64 {
    0.8
}
fn default_stagnation() -> u32 {
    30
}
fn default_trial_limit() -> u32 {
    10
}
fn default_budget() -> u64 {
    10_000
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            population: default_population(),
            generations: default_generations(),
            tournament_size: default_tournament(),
            elitism: default_elitism(),
            mutation_probability: default_mutation(),
            stagnation_limit: default_stagnation(),
            trial_limit: default_trial_limit(),
            time_budget_ms: default_budget(),
        }
    }
}
