//! Adaptive loading of context sources for a skill and intent
//!
//! Discovers candidate sources, ranks them by relevance plus a priority
//! boost, then fills the tier budget greedily in rank order. Selection is
//! not globally optimal; it is predictable.

use super::manager::ContextManager;
use super::models::{
    ContentSource, LoadResult, MemoryKind, Priority, SessionContext, SourceKind, Tier,
};
use super::relevance::RelevanceScorer;
use crate::store::ContentStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const ERROR_KEYWORDS: &[&str] = &["error", "bug", "fail", "broken", "issue"];
const REVIEW_KEYWORDS: &[&str] = &["review", "audit", "check", "validate", "test"];
const IMPLEMENT_KEYWORDS: &[&str] = &["implement", "build", "create", "develop", "code"];
const ACTIVATE_KEYWORDS: &[&str] = &["activate", "use", "run", "execute"];

/// Where collaborator files live, relative to the store root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub root: PathBuf,
    pub lessons: PathBuf,
    pub decisions: PathBuf,
    pub skills_dir: PathBuf,
    pub skill_file: String,
    pub workflows_dir: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            lessons: PathBuf::from("memory/lessons-learned.md"),
            decisions: PathBuf::from("memory/decisions.md"),
            skills_dir: PathBuf::from("skills"),
            skill_file: "SKILL.md".to_string(),
            workflows_dir: PathBuf::from("workflows"),
        }
    }
}

impl SourcesConfig {
    /// `<skills_dir>/<skill>/<skill_file>`
    pub fn skill_path(&self, skill: &str) -> PathBuf {
        self.skills_dir.join(skill).join(&self.skill_file)
    }

    /// `<workflows_dir>/<phase>.md`
    pub fn workflow_path(&self, phase: &str) -> PathBuf {
        self.workflows_dir.join(format!("{}.md", phase))
    }
}

/// A readable source with its relevance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSource {
    pub source: ContentSource,
    pub content: String,
    pub score: f64,
    /// Score plus priority boost; the ranking key
    pub boosted_score: f64,
}

/// A source that was loaded into the context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSourceResult {
    pub source: ContentSource,
    pub score: f64,
    pub boosted_score: f64,
    pub load: LoadResult,
}

/// Adaptive loader
pub struct AdaptiveLoader {
    sources: SourcesConfig,
    store: Arc<dyn ContentStore>,
    scorer: RelevanceScorer,
}

impl AdaptiveLoader {
    pub fn new(sources: SourcesConfig, store: Arc<dyn ContentStore>, scorer: RelevanceScorer) -> Self {
        Self {
            sources,
            store,
            scorer,
        }
    }

    pub fn sources(&self) -> &SourcesConfig {
        &self.sources
    }

    /// Pick the tier for a request; first matching rule wins
    ///
    /// Error signals beat everything, and review wording is checked
    /// before implementation wording. Error and review keywords match
    /// anywhere in a word ("debugging", "retest"); implementation and
    /// activation keywords only at its start, since "use" and "code" are
    /// common inside unrelated words.
    pub fn determine_tier(&self, intent: &str, session: &SessionContext) -> Tier {
        let intent_lower = intent.to_lowercase();
        let words: Vec<&str> = intent_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let has_error_context = session
            .error_context
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());

        let tier = if has_error_context || contains_any(&words, ERROR_KEYWORDS) {
            Tier::Execution
        } else if contains_any(&words, REVIEW_KEYWORDS) {
            Tier::Review
        } else if starts_with_any(&words, IMPLEMENT_KEYWORDS) {
            Tier::Execution
        } else if starts_with_any(&words, ACTIVATE_KEYWORDS) {
            Tier::Activation
        } else {
            Tier::Discovery
        };

        debug!("Selected {} tier for intent {:?}", tier, intent);
        tier
    }

    /// Candidate sources for a request
    ///
    /// Memory files always; the skill file if a skill is named; the
    /// workflow file for the current phase; each recent file.
    pub fn identify_content_sources(
        &self,
        skill_name: Option<&str>,
        intent: &str,
        session: &SessionContext,
    ) -> Vec<ContentSource> {
        let mut sources = vec![
            ContentSource::new(
                SourceKind::Memory {
                    collection: MemoryKind::Lessons,
                },
                self.sources.lessons.clone(),
                Priority::High,
            ),
            ContentSource::new(
                SourceKind::Memory {
                    collection: MemoryKind::Decisions,
                },
                self.sources.decisions.clone(),
                Priority::High,
            ),
        ];

        if let Some(skill) = skill_name.filter(|s| !s.trim().is_empty()) {
            sources.push(ContentSource::new(
                SourceKind::Skill {
                    name: skill.to_string(),
                },
                self.sources.skill_path(skill),
                Priority::High,
            ));
        }

        if let Some(phase) = session.current_phase.as_deref().filter(|p| !p.trim().is_empty()) {
            sources.push(ContentSource::new(
                SourceKind::Workflow {
                    phase: phase.to_string(),
                },
                self.sources.workflow_path(phase),
                Priority::Medium,
            ));
        }

        sources.extend(
            session
                .recent_files
                .iter()
                .map(|file| ContentSource::new(SourceKind::Recent, file.as_str(), Priority::Medium)),
        );

        debug!(
            "Identified {} content sources for {:?}",
            sources.len(),
            intent
        );
        sources
    }

    /// Read, score and rank sources; unreadable sources are skipped
    pub fn score_and_rank_content(
        &self,
        sources: Vec<ContentSource>,
        intent: &str,
        session: &SessionContext,
    ) -> Vec<RankedSource> {
        let mut ranked: Vec<RankedSource> = sources
            .into_iter()
            .filter_map(|source| {
                let content = self.store.read_optional(&source.path)?;
                let score = self.scorer.score(&content, intent, session);
                let boosted_score = score + source.priority.boost();
                Some(RankedSource {
                    source,
                    content,
                    score,
                    boosted_score,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.boosted_score
                .partial_cmp(&a.boosted_score)
                .unwrap_or(Ordering::Equal)
        });

        ranked
    }

    /// Greedily load ranked sources until the tier or global budget runs out
    pub fn load_within_budget(
        &self,
        ranked: Vec<RankedSource>,
        tier: Tier,
        global_budget_remaining: usize,
        intent: &str,
        manager: &mut ContextManager,
    ) -> Vec<ScoredSourceResult> {
        let tier_limit = manager.tier_limit(tier);
        let mut consumed = 0usize;
        let mut loaded = Vec::new();

        for ranked_source in ranked {
            let available = global_budget_remaining
                .saturating_sub(consumed)
                .min(tier_limit.saturating_sub(consumed));
            if available == 0 {
                break;
            }

            let kind = ranked_source.source.content_kind();
            let load = manager.load_with_budget(&ranked_source.content, tier, intent, kind);
            consumed += load.tokens;

            debug!(
                "Loaded {} ({} tokens, score {:.1})",
                ranked_source.source.path.display(),
                load.tokens,
                ranked_source.score
            );

            loaded.push(ScoredSourceResult {
                source: ranked_source.source,
                score: ranked_source.score,
                boosted_score: ranked_source.boosted_score,
                load,
            });

            if consumed >= tier_limit {
                break;
            }
        }

        info!(
            "Loaded {} sources using {} of {} {} tokens",
            loaded.len(),
            consumed,
            tier_limit,
            tier
        );
        loaded
    }
}

/// Any word contains any keyword
fn contains_any(words: &[&str], keywords: &[&str]) -> bool {
    words
        .iter()
        .any(|word| keywords.iter().any(|kw| word.contains(kw)))
}

/// Any word starts with any keyword
fn starts_with_any(words: &[&str], keywords: &[&str]) -> bool {
    words
        .iter()
        .any(|word| keywords.iter().any(|kw| word.starts_with(kw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::models::SessionContextUpdate;
    use crate::context::pruner::PruningConfig;
    use crate::context::token_budget::TokenBudgetConfig;
    use crate::store::InMemoryContentStore;

    fn loader_with(store: InMemoryContentStore) -> (AdaptiveLoader, ContextManager) {
        let store: Arc<dyn ContentStore> = Arc::new(store);
        let scorer = RelevanceScorer::default();
        let loader = AdaptiveLoader::new(SourcesConfig::default(), store.clone(), scorer.clone());
        let manager = ContextManager::new(
            &TokenBudgetConfig::default(),
            PruningConfig::default(),
            scorer,
            store,
        );
        (loader, manager)
    }

    fn session(update: SessionContextUpdate) -> SessionContext {
        let mut ctx = SessionContext::default();
        ctx.merge(update);
        ctx
    }

    #[test]
    fn test_determine_tier_precedence() {
        let (loader, _) = loader_with(InMemoryContentStore::new());
        let empty = SessionContext::default();

        assert_eq!(loader.determine_tier("fix error in authentication", &empty), Tier::Execution);
        assert_eq!(loader.determine_tier("review code quality", &empty), Tier::Review);
        assert_eq!(
            loader.determine_tier("help with issue", &session(SessionContextUpdate::new().error("Authentication failed"))),
            Tier::Execution
        );
        assert_eq!(loader.determine_tier("review this implementation", &empty), Tier::Review);
        assert_eq!(loader.determine_tier("implement the login page", &empty), Tier::Execution);
        assert_eq!(loader.determine_tier("run the deploy skill", &empty), Tier::Activation);
        assert_eq!(loader.determine_tier("what skills exist?", &empty), Tier::Discovery);
        assert_eq!(loader.determine_tier("", &empty), Tier::Discovery);
    }

    #[test]
    fn test_error_and_review_keywords_match_inside_words() {
        let (loader, _) = loader_with(InMemoryContentStore::new());
        let empty = SessionContext::default();

        assert_eq!(loader.determine_tier("debugging the parser", &empty), Tier::Execution);
        assert_eq!(loader.determine_tier("debug the login flow", &empty), Tier::Execution);
        assert_eq!(loader.determine_tier("retest the parser", &empty), Tier::Review);
        assert_eq!(loader.determine_tier("recheck then build", &empty), Tier::Review);
        // implementation and activation stay word-prefix matches
        assert_eq!(loader.determine_tier("barcode lookup", &empty), Tier::Discovery);
        assert_eq!(loader.determine_tier("because reasons", &empty), Tier::Discovery);
    }

    #[test]
    fn test_error_words_beat_review_words() {
        let (loader, _) = loader_with(InMemoryContentStore::new());
        let empty = SessionContext::default();
        assert_eq!(loader.determine_tier("review the failing tests", &empty), Tier::Execution);
        assert_eq!(loader.determine_tier("because", &empty), Tier::Discovery);
    }

    #[test]
    fn test_identify_content_sources() {
        let (loader, _) = loader_with(InMemoryContentStore::new());
        let ctx = session(
            SessionContextUpdate::new()
                .phase("implementation")
                .recent_files(["src/a.rs", "src/b.rs"]),
        );

        let sources = loader.identify_content_sources(Some("tdd"), "build it", &ctx);
        assert_eq!(sources.len(), 6);
        assert_eq!(sources[0].path, PathBuf::from("memory/lessons-learned.md"));
        assert_eq!(sources[1].path, PathBuf::from("memory/decisions.md"));
        assert_eq!(sources[2].path, PathBuf::from("skills/tdd/SKILL.md"));
        assert_eq!(sources[2].priority, Priority::High);
        assert_eq!(sources[3].path, PathBuf::from("workflows/implementation.md"));
        assert_eq!(sources[3].priority, Priority::Medium);
        assert_eq!(sources[4].kind, SourceKind::Recent);
        assert_eq!(sources[5].path, PathBuf::from("src/b.rs"));

        let minimal = loader.identify_content_sources(None, "", &SessionContext::default());
        assert_eq!(minimal.len(), 2);
        assert!(minimal.iter().all(|s| s.priority == Priority::High));
    }

    #[test]
    fn test_score_and_rank_skips_unreadable() {
        let store = InMemoryContentStore::new()
            .with_file("memory/lessons-learned.md", "- test lessons about test flakiness")
            .with_file("src/a.rs", "fn main() {}");
        let (loader, _) = loader_with(store);
        let ctx = session(SessionContextUpdate::new().recent_files(["src/a.rs", "src/missing.rs"]));

        let sources = loader.identify_content_sources(None, "test", &ctx);
        assert_eq!(sources.len(), 4);

        let ranked = loader.score_and_rank_content(sources, "test", &ctx);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].source.path, PathBuf::from("memory/lessons-learned.md"));
        assert_eq!(ranked[0].boosted_score, ranked[0].score + 20.0);
        assert_eq!(ranked[1].boosted_score, ranked[1].score + 10.0);
    }

    #[test]
    fn test_load_within_budget_stops_at_tier_limit() {
        let store = InMemoryContentStore::new()
            .with_file("a.txt", "a".repeat(1200))
            .with_file("b.txt", "b".repeat(1200))
            .with_file("c.txt", "c".repeat(1200));
        let (loader, mut manager) = loader_with(store);
        let ctx = session(SessionContextUpdate::new().recent_files(["a.txt", "b.txt", "c.txt"]));

        let sources: Vec<ContentSource> = loader
            .identify_content_sources(None, "", &ctx)
            .into_iter()
            .filter(|s| s.kind == SourceKind::Recent)
            .collect();
        let ranked = loader.score_and_rank_content(sources, "", &ctx);
        let remaining = manager.remaining_budget();

        // 300 tokens each against a 500-token discovery ceiling
        let loaded = loader.load_within_budget(ranked, Tier::Discovery, remaining, "", &mut manager);
        assert_eq!(loaded.len(), 2);
        assert_eq!(manager.usage_stats().used, 600);
    }

    #[test]
    fn test_load_within_budget_respects_global_remaining() {
        let store = InMemoryContentStore::new().with_file("a.txt", "a".repeat(400));
        let (loader, mut manager) = loader_with(store);
        let ctx = session(SessionContextUpdate::new().recent_files(["a.txt"]));
        let sources = loader.identify_content_sources(None, "", &ctx);
        let ranked = loader.score_and_rank_content(sources, "", &ctx);

        let loaded = loader.load_within_budget(ranked, Tier::Execution, 0, "", &mut manager);
        assert!(loaded.is_empty());
        assert_eq!(manager.usage_stats().used, 0);
    }
}
