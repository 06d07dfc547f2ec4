//! Command-line surface (spec.md §4.15, §10.4): a thin shell over
//! `cleo-engine`. Each variant below maps to exactly one engine call.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use cleo_config::{LifecycleMode, OutputFormat};
use cleo_core::{Priority, Size, TaskStatus, TaskType};
use cleo_gate::{GateVerdict, LifecycleStage, StageState};

#[derive(Debug, Parser)]
#[command(name = "cleo", version, about = "Single-user, multi-agent task-management engine")]
pub struct Cli {
    /// Emit structured JSON logs instead of compact human-readable lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Increase log verbosity (`cleo=debug,info`).
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Override the rendered result format for this invocation.
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormatArg>,

    /// Override the lock-acquisition timeout, in seconds.
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Override the lifecycle gate enforcement mode for this invocation.
    #[arg(long, global = true, value_enum)]
    pub lifecycle_mode: Option<LifecycleModeArg>,

    /// Require a closing note on `session end` for this invocation.
    #[arg(long, global = true)]
    pub require_session_notes: bool,

    /// Path to a config file to use instead of the discovered home config.
    #[arg(long, global = true)]
    pub config_path: Option<Utf8PathBuf>,

    /// Identity attributed to whatever this invocation writes.
    #[arg(long, global = true, env = "CLEO_ACTOR", default_value = "agent:cli")]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LifecycleModeArg {
    Strict,
    Advisory,
    Off,
}

impl From<LifecycleModeArg> for LifecycleMode {
    fn from(value: LifecycleModeArg) -> Self {
        match value {
            LifecycleModeArg::Strict => LifecycleMode::Strict,
            LifecycleModeArg::Advisory => LifecycleMode::Advisory,
            LifecycleModeArg::Off => LifecycleMode::Off,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create, transition, inspect, or remove individual tasks.
    #[command(subcommand)]
    Task(TaskCommands),
    /// Add or inspect dependency edges between tasks.
    #[command(subcommand)]
    Deps(DepsCommands),
    /// Start or end a work session bound to a task or selector scope.
    #[command(subcommand)]
    Session(SessionCommands),
    /// Advance an epic through its ten-stage lifecycle pipeline.
    #[command(subcommand)]
    Lifecycle(LifecycleCommands),
    /// Inspect or define the project's name and ordered phase set.
    #[command(subcommand)]
    Project(ProjectCommands),
    /// List tasks matching a filter.
    List(ListArgs),
    /// Fuzzy-search tasks by title.
    Find(FindArgs),
    /// Summarize the active store by status, priority, and phase.
    Stats,
    /// Rank unblocked, high-value tasks by unlock count and priority.
    Leverage,
    /// Longest chain of non-terminal tasks in the dependency graph.
    CriticalPath,
    /// Partition pending tasks into level sets by longest-path depth.
    WavePlan,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommands {
    /// Create a new task.
    ///
    /// EXAMPLES:
    ///   cleo task create --title "Ship v2" --priority high
    ///   cleo task create --title "Write migration" --parent T003 --depends T001,T002
    Create(TaskCreateArgs),
    /// Show one task and its dependency relationships.
    Show { id: String },
    /// Transition a task's status. `--reason` supplies `blockedBy` when
    /// `to=blocked` or `cancellationReason` when `to=cancelled`; omitting it
    /// for either fails with a validation error.
    Transition {
        id: String,
        #[arg(value_enum)]
        to: TaskStatusArg,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Reverse a `cancelled -> pending` transition, restoring from the
    /// archive first if the task was archived after cancellation.
    Uncancel { id: String },
    /// Edit scalar/list fields on an existing task. `validatedBy`/`testedBy`
    /// are stamped with the caller's own identity via `--validated`/
    /// `--tested`, never supplied directly.
    Update(TaskUpdateArgs),
    /// Preview what a `delete` would affect without mutating anything.
    DeletePreview {
        id: String,
        #[arg(long)]
        cascade: bool,
    },
    /// Hard-delete a task (and its descendants under `--cascade`). Refuses
    /// completed tasks; use `archive` for those. Requires `--force`.
    Delete {
        id: String,
        #[arg(long)]
        cascade: bool,
        #[arg(long)]
        force: bool,
    },
    /// Move a task (and descendants under `--cascade`) into the cold archive.
    Archive {
        id: String,
        #[arg(long)]
        cascade: bool,
        #[arg(long, default_value = "archived")]
        reason: String,
    },
    /// Restore one or more archived task ids back into the active store.
    Restore {
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct TaskCreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub parent: Option<String>,
    #[arg(long, value_enum)]
    pub task_type: Option<TaskTypeArg>,
    #[arg(long, value_enum, default_value = "medium")]
    pub priority: PriorityArg,
    #[arg(long, value_enum)]
    pub size: Option<SizeArg>,
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub depends: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct TaskUpdateArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
    #[arg(long, value_enum)]
    pub size: Option<SizeArg>,
    #[arg(long)]
    pub clear_size: bool,
    #[arg(long)]
    pub phase: Option<String>,
    #[arg(long)]
    pub clear_phase: bool,
    #[arg(long, value_delimiter = ',')]
    pub add_labels: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub set_labels: Vec<String>,
    #[arg(long)]
    pub clear_labels: bool,
    #[arg(long)]
    pub note: Option<String>,
    /// Stamp `validatedBy` with the caller's own identity.
    #[arg(long)]
    pub validated: bool,
    /// Stamp `testedBy` with the caller's own identity.
    #[arg(long)]
    pub tested: bool,
    #[arg(long)]
    pub mark_implemented: bool,
    #[arg(long)]
    pub mark_documented: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TaskTypeArg {
    Epic,
    Task,
    Subtask,
}

impl From<TaskTypeArg> for TaskType {
    fn from(value: TaskTypeArg) -> Self {
        match value {
            TaskTypeArg::Epic => TaskType::Epic,
            TaskTypeArg::Task => TaskType::Task,
            TaskTypeArg::Subtask => TaskType::Subtask,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PriorityArg {
    Critical,
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Critical => Priority::Critical,
            PriorityArg::High => Priority::High,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SizeArg {
    Small,
    Medium,
    Large,
}

impl From<SizeArg> for Size {
    fn from(value: SizeArg) -> Self {
        match value {
            SizeArg::Small => Size::Small,
            SizeArg::Medium => Size::Medium,
            SizeArg::Large => Size::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TaskStatusArg {
    Pending,
    Active,
    Blocked,
    Done,
    Cancelled,
    Archived,
}

impl From<TaskStatusArg> for TaskStatus {
    fn from(value: TaskStatusArg) -> Self {
        match value {
            TaskStatusArg::Pending => TaskStatus::Pending,
            TaskStatusArg::Active => TaskStatus::Active,
            TaskStatusArg::Blocked => TaskStatus::Blocked,
            TaskStatusArg::Done => TaskStatus::Done,
            TaskStatusArg::Cancelled => TaskStatus::Cancelled,
            TaskStatusArg::Archived => TaskStatus::Archived,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum DepsCommands {
    /// Add a dependency edge `from -> to`, rejecting cycles.
    Add { from: String, to: String },
    /// Show a task's dependency relationships.
    View { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    /// Start a new session bound to a scope selector (e.g. `task:T001`).
    Start {
        id: String,
        scope: String,
        #[arg(long)]
        multi_session: bool,
    },
    /// End a session, attaching a closing note.
    End {
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum LifecycleCommands {
    /// Move a stage into `in_progress` for the given epic.
    StartStage {
        epic_id: String,
        #[arg(value_enum)]
        stage: LifecycleStageArg,
    },
    /// Attach a gate condition's outcome to a stage's record.
    RecordGate {
        epic_id: String,
        #[arg(value_enum)]
        stage: LifecycleStageArg,
        name: String,
        #[arg(value_enum)]
        result: GateVerdictArg,
        #[arg(long)]
        details: Option<String>,
    },
    /// Append an evidence item to a stage's record.
    AddEvidence {
        epic_id: String,
        #[arg(value_enum)]
        stage: LifecycleStageArg,
        description: String,
        #[arg(long)]
        reference: Option<String>,
    },
    /// Complete a stage, gated through its prerequisite and attribution checks.
    CompleteStage {
        epic_id: String,
        #[arg(value_enum)]
        stage: LifecycleStageArg,
    },
    /// Mark a stage as skipped, satisfying downstream prerequisites.
    SkipStage {
        epic_id: String,
        #[arg(value_enum)]
        stage: LifecycleStageArg,
        reason: String,
    },
    /// Force a stage directly into a target state, bypassing every gate.
    ForceTransition {
        epic_id: String,
        #[arg(value_enum)]
        stage: LifecycleStageArg,
        #[arg(value_enum)]
        to: StageStateArg,
        reason: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    /// Show the project's name, phase set, and current phase.
    Show,
    /// Replace the project's name and ordered phase set. `--phase` may be
    /// repeated; each entry is `order:name`, e.g. `0:design`.
    SetPhases {
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "phase", required = true)]
        phases: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LifecycleStageArg {
    Research,
    Consensus,
    ArchitectureDecision,
    Specification,
    Decomposition,
    Implementation,
    Validation,
    Testing,
    Release,
    Contribution,
}

impl From<LifecycleStageArg> for LifecycleStage {
    fn from(value: LifecycleStageArg) -> Self {
        match value {
            LifecycleStageArg::Research => LifecycleStage::Research,
            LifecycleStageArg::Consensus => LifecycleStage::Consensus,
            LifecycleStageArg::ArchitectureDecision => LifecycleStage::ArchitectureDecision,
            LifecycleStageArg::Specification => LifecycleStage::Specification,
            LifecycleStageArg::Decomposition => LifecycleStage::Decomposition,
            LifecycleStageArg::Implementation => LifecycleStage::Implementation,
            LifecycleStageArg::Validation => LifecycleStage::Validation,
            LifecycleStageArg::Testing => LifecycleStage::Testing,
            LifecycleStageArg::Release => LifecycleStage::Release,
            LifecycleStageArg::Contribution => LifecycleStage::Contribution,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StageStateArg {
    NotStarted,
    InProgress,
    Blocked,
    Completed,
    Skipped,
    Failed,
}

impl From<StageStateArg> for StageState {
    fn from(value: StageStateArg) -> Self {
        match value {
            StageStateArg::NotStarted => StageState::NotStarted,
            StageStateArg::InProgress => StageState::InProgress,
            StageStateArg::Blocked => StageState::Blocked,
            StageStateArg::Completed => StageState::Completed,
            StageStateArg::Skipped => StageState::Skipped,
            StageStateArg::Failed => StageState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum GateVerdictArg {
    Pass,
    Fail,
    Warn,
}

impl From<GateVerdictArg> for GateVerdict {
    fn from(value: GateVerdictArg) -> Self {
        match value {
            GateVerdictArg::Pass => GateVerdict::Pass,
            GateVerdictArg::Fail => GateVerdict::Fail,
            GateVerdictArg::Warn => GateVerdict::Warn,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    pub status: Option<TaskStatusArg>,
    #[arg(long)]
    pub parent: Option<String>,
    #[arg(long)]
    pub phase: Option<String>,
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

#[derive(Debug, clap::Args)]
pub struct FindArgs {
    pub needle: String,
}

/// A minimal `clap::Command` for introspection in tests, mirroring the
/// teacher's `build_cli()` helper.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
