//! Data models for context optimization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Maximum number of recent files kept in the session context
pub const MAX_RECENT_FILES: usize = 10;
/// Maximum number of recent activities kept in the session context
pub const MAX_RECENT_ACTIVITIES: usize = 5;

/// Declared kind of a text unit; drives token multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Code,
    Markdown,
}

impl ContentKind {
    /// Infer the kind from a file extension. Unknown extensions are text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mdx") => ContentKind::Markdown,
            Some(
                "rs" | "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "py" | "go" | "java" | "kt"
                | "c" | "h" | "cc" | "cpp" | "hpp" | "cs" | "rb" | "php" | "swift" | "sh"
                | "sql" | "scala",
            ) => ContentKind::Code,
            _ => ContentKind::Text,
        }
    }
}

impl FromStr for ContentKind {
    type Err = std::convert::Infallible;

    /// Unknown labels fall back to `Text`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "code" => ContentKind::Code,
            "markdown" | "md" => ContentKind::Markdown,
            _ => ContentKind::Text,
        })
    }
}

/// Budget class assigned to a single optimization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Discovery,
    Activation,
    Execution,
    Review,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Discovery, Tier::Activation, Tier::Execution, Tier::Review];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Discovery => "discovery",
            Tier::Activation => "activation",
            Tier::Execution => "execution",
            Tier::Review => "review",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "discovery" => Ok(Tier::Discovery),
            "activation" => Ok(Tier::Activation),
            "execution" => Ok(Tier::Execution),
            "review" => Ok(Tier::Review),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Priority level for content sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    /// Fixed boost added to a source's relevance score during ranking
    pub fn boost(&self) -> f64 {
        match self {
            Priority::High => 20.0,
            Priority::Medium => 10.0,
            Priority::Low => 0.0,
        }
    }
}

/// Which memory collection a memory source refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Lessons,
    Decisions,
}

/// Origin of a content source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    Skill { name: String },
    Memory { collection: MemoryKind },
    Workflow { phase: String },
    Recent,
}

/// Ephemeral descriptor of a candidate content source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSource {
    #[serde(flatten)]
    pub kind: SourceKind,
    pub path: PathBuf,
    pub priority: Priority,
}

impl ContentSource {
    pub fn new(kind: SourceKind, path: impl Into<PathBuf>, priority: Priority) -> Self {
        Self {
            kind,
            path: path.into(),
            priority,
        }
    }

    /// Content kind used when estimating this source's tokens
    pub fn content_kind(&self) -> ContentKind {
        match &self.kind {
            SourceKind::Skill { .. } | SourceKind::Memory { .. } | SourceKind::Workflow { .. } => {
                ContentKind::Markdown
            }
            SourceKind::Recent => ContentKind::from_path(&self.path),
        }
    }
}

/// Relevance score with component breakdown
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelevanceScore {
    /// Intent/category keyword match (0-50)
    pub intent_match: f64,
    /// Recently touched file boost (0-30)
    pub recency: f64,
    /// Workflow phase relevance (0-40)
    pub phase: f64,
    /// Current-date mentions (0-20)
    pub freshness: f64,
    /// Links and file references (0-10)
    pub reference_density: f64,
    /// Sum of the components, capped at 100
    pub total: f64,
}

impl RelevanceScore {
    /// Maximum total score
    pub const MAX: f64 = 100.0;

    /// Sum the components into a capped total
    pub fn calculate_total(&mut self) {
        self.total = (self.intent_match
            + self.recency
            + self.phase
            + self.freshness
            + self.reference_density)
            .min(Self::MAX);
    }

    /// Create a new relevance score with calculated total
    pub fn new(
        intent_match: f64,
        recency: f64,
        phase: f64,
        freshness: f64,
        reference_density: f64,
    ) -> Self {
        let mut score = Self {
            intent_match,
            recency,
            phase,
            freshness,
            reference_density,
            total: 0.0,
        };
        score.calculate_total();
        score
    }
}

/// A candidate scored against an intent and session context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub content: String,
    /// Relevance score in [0, 100]
    pub score: f64,
    pub tokens: usize,
}

/// Process-local session state owned by the context manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub current_phase: Option<String>,
    /// Most recent first, at most [`MAX_RECENT_FILES`]
    pub recent_files: Vec<String>,
    /// At most [`MAX_RECENT_ACTIVITIES`]
    pub recent_activities: Vec<String>,
    pub error_context: Option<String>,
}

impl SessionContext {
    /// Shallow merge: provided fields replace existing ones; lists are capped
    pub fn merge(&mut self, updates: SessionContextUpdate) {
        if let Some(phase) = updates.current_phase {
            self.current_phase = phase;
        }
        if let Some(mut files) = updates.recent_files {
            files.truncate(MAX_RECENT_FILES);
            self.recent_files = files;
        }
        if let Some(mut activities) = updates.recent_activities {
            activities.truncate(MAX_RECENT_ACTIVITIES);
            self.recent_activities = activities;
        }
        if let Some(error) = updates.error_context {
            self.error_context = error;
        }
    }

    /// Position of `path` in the recent files list, if present
    pub fn recent_file_index(&self, path: &str) -> Option<usize> {
        self.recent_files.iter().position(|f| f == path)
    }
}

/// Partial session context update
///
/// Outer `None` leaves a field untouched; for nullable fields an inner
/// `None` clears it. In JSON, a missing key leaves the field alone and
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionContextUpdate {
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_phase: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_activities: Option<Vec<String>>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_context: Option<Option<String>>,
}

/// A key that is present always yields `Some`, so `null` maps to `Some(None)`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SessionContextUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: impl Into<String>) -> Self {
        self.current_phase = Some(Some(phase.into()));
        self
    }

    pub fn recent_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recent_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn recent_activities<I, S>(mut self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recent_activities = Some(activities.into_iter().map(Into::into).collect());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error_context = Some(Some(error.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error_context = Some(None);
        self
    }
}

impl From<SessionContext> for SessionContextUpdate {
    fn from(ctx: SessionContext) -> Self {
        Self {
            current_phase: Some(ctx.current_phase),
            recent_files: Some(ctx.recent_files),
            recent_activities: Some(ctx.recent_activities),
            error_context: Some(ctx.error_context),
        }
    }
}

/// Outcome of a budgeted load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub content: String,
    /// Tokens actually kept and charged to the budget
    pub tokens: usize,
    pub pruned: bool,
    pub tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tokens: Option<usize>,
    /// Kept tokens divided by original tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_ratio: Option<f64>,
}

/// Budget usage snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub used: usize,
    pub budget: usize,
    pub remaining: usize,
    /// Percentage of the budget used; may exceed 100
    pub utilization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Warning,
    Info,
}

/// Advisory note emitted after an optimization pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
    pub action: String,
}

impl Recommendation {
    pub fn warning(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: RecommendationKind::Warning,
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn info(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: RecommendationKind::Info,
            message: message.into(),
            action: action.into(),
        }
    }
}
