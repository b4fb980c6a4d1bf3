use cadence_core::models::TodoPriority;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Cadence: a task manager with recurring templates
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task, optionally recurring
    Add(AddCommand),
    /// List tasks
    List(ListCommand),
    /// Show tasks day by day
    Calendar(CalendarCommand),
    /// Mark a task as completed
    Do(DoCommand),
    /// Mark a completed task as pending again
    Undo(UndoCommand),
    /// Edit a single task
    Edit(EditCommand),
    /// Delete a task
    Delete(DeleteCommand),
    /// Manage projects
    Project(ProjectCommand),
    /// Manage tags
    Tag(TagCommand),
    /// Manage recurring templates
    Recur(RecurrenceCommand),
    /// Show completion statistics
    Stats,
}

/// Recurrence options shared by `add` and `recur edit`
#[derive(Args, Debug, Clone, Default)]
pub struct RecurrenceArgs {
    /// How often the task repeats
    #[arg(long, value_enum)]
    pub every: Option<RecurrenceShortcut>,
    /// Repeat every N periods
    #[arg(long, requires = "every")]
    pub interval: Option<u32>,
    /// Days of week for weekly recurrence (mon,tue,wed,thu,fri,sat,sun)
    #[arg(long, requires = "every")]
    pub on: Option<String>,
    /// Day of month for monthly recurrence (1-31)
    #[arg(long, requires = "every")]
    pub day_of_month: Option<u8>,
    /// Last date an occurrence may fall on (e.g. '2025-12-31')
    #[arg(long, requires = "every")]
    pub until: Option<String>,
    /// Maximum number of generated instances
    #[arg(long, requires = "every")]
    pub count: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// The description of the task
    #[clap(short, long)]
    pub description: Option<String>,
    /// The due date of the task (e.g. 'tomorrow', '2025-08-20')
    #[clap(long)]
    pub due: Option<String>,
    /// Time of day (e.g. '09:30', '9:30 PM')
    #[clap(long)]
    pub at: Option<String>,
    /// The project of the task
    #[clap(short, long)]
    pub project: Option<String>,
    /// Tags to add to the task; missing tags are created
    #[clap(short, long)]
    pub tag: Vec<String>,
    /// The priority of the task (low, medium, high)
    #[clap(long)]
    pub priority: Option<TodoPriority>,
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Create the template without generating instances
    #[clap(long, requires = "every")]
    pub paused: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Only tasks in this project
    #[clap(short, long)]
    pub project: Option<String>,
    /// Only tasks with this tag
    #[clap(short, long)]
    pub tag: Option<String>,
    /// Only completed tasks
    #[clap(long, conflicts_with = "pending")]
    pub completed: bool,
    /// Only pending tasks
    #[clap(long)]
    pub pending: bool,
    /// Only tasks due today or overdue, plus undated ones
    #[clap(long)]
    pub today: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CalendarCommand {
    /// First day to show (defaults to today)
    #[clap(long)]
    pub from: Option<String>,
    /// Number of days to show
    #[clap(long, default_value = "7")]
    pub days: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct DoCommand {
    /// The ID of the task to mark as completed
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct UndoCommand {
    /// The ID of the task to reopen
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID of the task to edit
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, conflicts_with = "due")]
    pub due_clear: bool,

    #[arg(long)]
    pub at: Option<String>,
    #[arg(long, conflicts_with = "at")]
    pub at_clear: bool,

    #[arg(long)]
    pub priority: Option<TodoPriority>,

    #[arg(long)]
    pub project: Option<String>,
    #[arg(long, conflicts_with = "project")]
    pub project_clear: bool,

    /// Add tags to the task
    #[arg(long)]
    pub add_tag: Vec<String>,

    /// Remove tags from the task
    #[arg(long)]
    pub remove_tag: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the task to delete
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub command: ProjectSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectSubcommand {
    /// Add a new project
    Add(AddProjectCommand),
    /// List active projects
    List,
    /// Rename or restyle a project
    Edit(EditProjectCommand),
    /// Archive a project
    Archive(ArchiveProjectCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddProjectCommand {
    /// The name of the project
    pub name: String,

    #[arg(long, default_value = "#3b82f6")]
    pub color: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct EditProjectCommand {
    /// The current name of the project
    pub name: String,

    #[arg(long)]
    pub rename: Option<String>,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ArchiveProjectCommand {
    /// The name of the project to archive
    pub name: String,
}

#[derive(Parser, Debug, Clone)]
pub struct TagCommand {
    #[command(subcommand)]
    pub command: TagSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagSubcommand {
    /// Add a new tag
    Add(AddTagCommand),
    /// List tags
    List,
    /// Rename or recolor a tag
    Edit(EditTagCommand),
    /// Delete a tag and remove it from all tasks
    Delete(DeleteTagCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddTagCommand {
    pub name: String,

    #[arg(long, default_value = "#6b7280")]
    pub color: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditTagCommand {
    pub name: String,

    #[arg(long)]
    pub rename: Option<String>,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteTagCommand {
    pub name: String,
}

/// Human-friendly recurrence patterns
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceShortcut {
    /// Every day
    Daily,
    /// Every week (same day, or the days given with --on)
    Weekly,
    /// Every month (same date, or --day-of-month)
    Monthly,
    /// Every year (same date)
    Yearly,
    /// Monday to Friday
    Weekdays,
    /// Saturday and Sunday
    Weekends,
}

impl std::fmt::Display for RecurrenceShortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceShortcut::Daily => write!(f, "daily"),
            RecurrenceShortcut::Weekly => write!(f, "weekly"),
            RecurrenceShortcut::Monthly => write!(f, "monthly"),
            RecurrenceShortcut::Yearly => write!(f, "yearly"),
            RecurrenceShortcut::Weekdays => write!(f, "weekdays"),
            RecurrenceShortcut::Weekends => write!(f, "weekends"),
        }
    }
}

/// Recurring template commands
#[derive(Parser, Debug, Clone)]
pub struct RecurrenceCommand {
    #[command(subcommand)]
    pub command: RecurrenceSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecurrenceSubcommand {
    /// List recurring templates with instance statistics
    List,
    /// Show the generated instances of a template
    Instances(RecurrenceIdCommand),
    /// Edit a template and reconcile its instances
    Edit(RecurrenceEditCommand),
    /// Delete a template
    Delete(RecurrenceDeleteCommand),
    /// Stop generating new instances
    Pause(RecurrenceIdCommand),
    /// Resume a paused template
    Resume(RecurrenceIdCommand),
    /// Generate more instances after the latest one
    More(RecurrenceMoreCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct RecurrenceIdCommand {
    /// Template task ID
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurrenceEditCommand {
    /// Template task ID
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub at: Option<String>,

    #[arg(long)]
    pub priority: Option<TodoPriority>,

    #[arg(long)]
    pub project: Option<String>,
    #[arg(long, conflicts_with = "project")]
    pub project_clear: bool,

    /// Replace the template's tags
    #[arg(long)]
    pub tag: Vec<String>,

    /// New recurrence rule
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,

    /// Copy field changes onto future instances
    #[arg(long)]
    pub update_future: bool,

    /// Replace future instances when the rule changes
    #[arg(long)]
    pub regenerate: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurrenceDeleteCommand {
    /// Template task ID
    pub id: String,
    /// Delete past instances too instead of keeping them as standalone tasks
    #[clap(long)]
    pub all: bool,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurrenceMoreCommand {
    /// Template task ID
    pub id: String,
    /// Number of instances to generate
    #[clap(long, short)]
    pub count: Option<u32>,
}
