//! Per-cycle orchestration of declaration lookup, safety check, lifecycle
//! tracking and loading.
//!
//! A cycle is one invocation of one test unit. It starts in
//! [`HookState::NotEvaluated`] and ends in exactly one terminal state:
//!
//! ```text
//! NotEvaluated -> DeclarationChecked -> SkippedNoDeclaration
//!                                    -> SafetyChecked -> SkippedAlreadyLoaded
//!                                                     -> Loading -> Loaded
//!                                                                -> Failed
//! ```
//!
//! Any step after `NotEvaluated` may end in `Failed`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::declaration::{DeclarationRegistry, FixtureDeclaration, Lifecycle};
use crate::error::{FixtureError, FixtureResult, SetupFailure};
use crate::fixtures::{FixtureLoader, LoadReport};
use crate::lifecycle::LifecycleTracker;
use crate::safety::{SafetyOutcome, TransactionalSafetyCheck};
use crate::settings::FixtureSettings;

/// State of a test unit within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookState {
	/// Nothing inspected yet.
	NotEvaluated,
	/// The declaration lookup ran.
	DeclarationChecked,
	/// No declaration applies; nothing to do.
	SkippedNoDeclaration,
	/// The safety check passed or only warned.
	SafetyChecked,
	/// A per-class load already happened in this process.
	SkippedAlreadyLoaded,
	/// Declared kinds are being loaded.
	Loading,
	/// Every declared kind was loaded.
	Loaded,
	/// The cycle was aborted; the test body must not run.
	Failed,
}

impl HookState {
	/// Returns true for states that end a cycle.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Self::SkippedNoDeclaration | Self::SkippedAlreadyLoaded | Self::Loaded | Self::Failed
		)
	}

	/// Checks if moving to `next` is a legal transition.
	pub fn can_transition_to(&self, next: HookState) -> bool {
		use HookState::*;

		matches!(
			(self, next),
			(NotEvaluated, DeclarationChecked)
				| (DeclarationChecked, SkippedNoDeclaration | SafetyChecked | Failed)
				| (SafetyChecked, SkippedAlreadyLoaded | Loading | Failed)
				| (Loading, Loaded | Failed)
		)
	}
}

impl fmt::Display for HookState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::NotEvaluated => "NotEvaluated",
			Self::DeclarationChecked => "DeclarationChecked",
			Self::SkippedNoDeclaration => "SkippedNoDeclaration",
			Self::SafetyChecked => "SafetyChecked",
			Self::SkippedAlreadyLoaded => "SkippedAlreadyLoaded",
			Self::Loading => "Loading",
			Self::Loaded => "Loaded",
			Self::Failed => "Failed",
		};
		f.write_str(name)
	}
}

/// What the test runner knows about the unit about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
	/// Name of the test unit.
	pub unit: String,
	/// Whether the unit runs inside a transaction that is rolled back
	/// afterwards.
	pub rollback_isolated: bool,
}

impl ExecutionContext {
	/// Context for a unit without rollback isolation.
	pub fn new(unit: impl Into<String>) -> Self {
		Self {
			unit: unit.into(),
			rollback_isolated: false,
		}
	}

	/// Context for a unit running inside a rolled-back transaction.
	pub fn isolated(unit: impl Into<String>) -> Self {
		Self::new(unit).with_rollback_isolation(true)
	}

	/// Sets the rollback isolation signal.
	pub fn with_rollback_isolation(mut self, isolated: bool) -> Self {
		self.rollback_isolated = isolated;
		self
	}
}

/// Outcome of a cycle that allows the test body to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
	/// Test unit the cycle ran for.
	pub unit: String,
	/// Terminal state reached.
	pub state: HookState,
	/// Entities persisted in this cycle (empty unless `state` is `Loaded`).
	pub loaded: LoadReport,
	/// Non-fatal safety warnings.
	pub warnings: Vec<String>,
}

impl CycleReport {
	/// Returns true if this cycle loaded fixtures.
	pub fn did_load(&self) -> bool {
		self.state == HookState::Loaded
	}
}

struct Cycle<'a> {
	unit: &'a str,
	state: HookState,
}

impl<'a> Cycle<'a> {
	fn new(unit: &'a str) -> Self {
		Self {
			unit,
			state: HookState::NotEvaluated,
		}
	}

	fn advance(&mut self, next: HookState) {
		debug_assert!(
			self.state.can_transition_to(next),
			"illegal hook transition {} -> {}",
			self.state,
			next
		);
		tracing::trace!("test unit `{}`: {} -> {}", self.unit, self.state, next);
		self.state = next;
	}

	fn fail(&mut self, error: FixtureError) -> SetupFailure {
		self.advance(HookState::Failed);
		tracing::debug!("test unit `{}` aborted before its body: {}", self.unit, error);
		SetupFailure::new(self.unit, error)
	}

	fn finish(self, loaded: LoadReport, warnings: Vec<String>) -> CycleReport {
		debug_assert!(self.state.is_terminal());
		CycleReport {
			unit: self.unit.to_string(),
			state: self.state,
			loaded,
			warnings,
		}
	}
}

/// Runs before every test unit invocation and prepares its fixtures.
///
/// Per-class units load at most once for each [`LifecycleTracker`]. Build one
/// tracker per test process and pass a clone to every hook, including hooks
/// built per test around a fresh store.
#[derive(Debug, Clone)]
pub struct FixtureHook {
	declarations: Arc<DeclarationRegistry>,
	loader: FixtureLoader,
	safety: TransactionalSafetyCheck,
	tracker: LifecycleTracker,
}

impl FixtureHook {
	/// Creates a hook recording per-class loads in `tracker`.
	pub fn new(
		declarations: Arc<DeclarationRegistry>,
		loader: FixtureLoader,
		tracker: LifecycleTracker,
		settings: &FixtureSettings,
	) -> Self {
		Self {
			declarations,
			loader,
			safety: TransactionalSafetyCheck::from_settings(settings),
			tracker,
		}
	}

	/// Tracker used for per-class units.
	pub fn tracker(&self) -> &LifecycleTracker {
		&self.tracker
	}

	/// Declarations consulted by this hook.
	pub fn declarations(&self) -> &DeclarationRegistry {
		&self.declarations
	}

	/// Evaluates one cycle for the unit in `ctx`.
	///
	/// # Errors
	///
	/// Returns a [`SetupFailure`] when the test body must not run: a
	/// malformed or conflicting declaration, a strict safety failure, or any
	/// loading error. A per-class unit whose first load failed keeps failing
	/// on later cycles.
	pub async fn before_each(&self, ctx: &ExecutionContext) -> Result<CycleReport, SetupFailure> {
		let mut cycle = Cycle::new(&ctx.unit);

		let declaration = self.declarations.resolve(&ctx.unit);
		cycle.advance(HookState::DeclarationChecked);
		let declaration = match declaration {
			Ok(Some(declaration)) => declaration,
			Ok(None) => {
				cycle.advance(HookState::SkippedNoDeclaration);
				return Ok(cycle.finish(LoadReport::new(), Vec::new()));
			}
			Err(e) => return Err(cycle.fail(e)),
		};

		let mut warnings = Vec::new();
		match self
			.safety
			.check(&ctx.unit, Some(&declaration), ctx.rollback_isolated)
		{
			SafetyOutcome::Passed => {}
			SafetyOutcome::Warning(message) => {
				tracing::warn!("{}", message);
				warnings.push(message);
			}
			SafetyOutcome::Fatal(e) => return Err(cycle.fail(e)),
		}
		cycle.advance(HookState::SafetyChecked);

		if let Err(e) = self.tracker.observe(&ctx.unit, declaration.lifecycle()) {
			return Err(cycle.fail(e));
		}

		if !self.should_load(&ctx.unit, &declaration) {
			if let Some(reason) = self.tracker.failure(&ctx.unit) {
				return Err(cycle.fail(FixtureError::PoisonedLoad {
					unit: ctx.unit.clone(),
					reason,
				}));
			}
			tracing::debug!(
				"test unit `{}`: {} fixtures already loaded, skipping",
				ctx.unit,
				declaration.lifecycle()
			);
			cycle.advance(HookState::SkippedAlreadyLoaded);
			return Ok(cycle.finish(LoadReport::new(), warnings));
		}

		cycle.advance(HookState::Loading);
		match self.load(&ctx.unit, &declaration).await {
			Ok(report) => {
				cycle.advance(HookState::Loaded);
				Ok(cycle.finish(report, warnings))
			}
			Err(e) => {
				if declaration.lifecycle() == Lifecycle::PerClass {
					self.tracker.record_failure(&ctx.unit, e.to_string());
				}
				Err(cycle.fail(e))
			}
		}
	}

	/// Runs the hook, then `body` if the hook allows it.
	///
	/// # Panics
	///
	/// Panics with the [`SetupFailure`] message, before `body` is polled, if
	/// fixtures could not be prepared.
	pub async fn run<F, Fut, T>(&self, ctx: &ExecutionContext, body: F) -> T
	where
		F: FnOnce(CycleReport) -> Fut,
		Fut: Future<Output = T>,
	{
		match self.before_each(ctx).await {
			Ok(report) => body(report).await,
			Err(failure) => panic!("{}", failure),
		}
	}

	fn should_load(&self, unit: &str, declaration: &FixtureDeclaration) -> bool {
		match declaration.lifecycle() {
			Lifecycle::PerMethod => true,
			Lifecycle::PerClass => self.tracker.mark_if_first(unit),
		}
	}

	async fn load(&self, unit: &str, declaration: &FixtureDeclaration) -> FixtureResult<LoadReport> {
		let report = self.loader.load_all(declaration, unit).await?;
		tracing::info!(
			"Loaded {} fixture record(s) across {} entity kind(s) for test unit `{}` ({})",
			report.total_records(),
			report.entries().len(),
			unit,
			declaration.lifecycle()
		);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::declaration::TestUnit;
	use crate::error::StoreError;
	use crate::fixtures::{Entity, EntityId, InMemorySource, KindRegistry, Repository};
	use async_trait::async_trait;
	use parking_lot::Mutex;
	use rstest::{fixture, rstest};
	use serde::Deserialize;

	#[derive(Debug, Deserialize)]
	struct Owner {
		last_name: String,
	}

	impl Entity for Owner {
		const KIND: &'static str = "Owner";
	}

	#[derive(Debug, Deserialize)]
	struct Pet {
		name: String,
	}

	impl Entity for Pet {
		const KIND: &'static str = "Pet";
	}

	#[derive(Default)]
	struct Journal {
		writes: Mutex<Vec<String>>,
	}

	impl Journal {
		fn writes(&self) -> Vec<String> {
			self.writes.lock().clone()
		}
	}

	#[async_trait]
	impl Repository<Owner> for Journal {
		async fn create(&self, entity: Owner) -> Result<EntityId, StoreError> {
			let mut writes = self.writes.lock();
			writes.push(format!("Owner:{}", entity.last_name));
			Ok(EntityId(writes.len() as i64))
		}
	}

	#[async_trait]
	impl Repository<Pet> for Journal {
		async fn create(&self, entity: Pet) -> Result<EntityId, StoreError> {
			let mut writes = self.writes.lock();
			writes.push(format!("Pet:{}", entity.name));
			Ok(EntityId(writes.len() as i64))
		}
	}

	#[fixture]
	fn journal() -> Arc<Journal> {
		Arc::new(Journal::default())
	}

	fn source() -> InMemorySource {
		let mut source = InMemorySource::new();
		for unit in ["owner_listing", "pet_listing", "visit_listing"] {
			source = source
				.with_json("Owner", unit, r#"[{"last_name": "Franklin"}]"#)
				.with_json("Pet", unit, r#"[{"name": "Leo"}, {"name": "Basil"}]"#);
		}
		source
	}

	fn registry(units: Vec<TestUnit>) -> Arc<DeclarationRegistry> {
		let registry = DeclarationRegistry::new();
		for unit in units {
			registry.register(unit).unwrap();
		}
		Arc::new(registry)
	}

	fn hook(journal: &Arc<Journal>, units: Vec<TestUnit>, strict: bool) -> FixtureHook {
		hook_with_tracker(journal, registry(units), strict, LifecycleTracker::new())
	}

	fn hook_with_tracker(
		journal: &Arc<Journal>,
		declarations: Arc<DeclarationRegistry>,
		strict: bool,
		tracker: LifecycleTracker,
	) -> FixtureHook {
		let kinds = KindRegistry::new()
			.with::<Owner, _>(journal.clone())
			.unwrap()
			.with::<Pet, _>(journal.clone())
			.unwrap();
		let loader = FixtureLoader::new(Arc::new(source()), Arc::new(kinds));
		let settings = FixtureSettings::new().with_strict(strict);
		FixtureHook::new(declarations, loader, tracker, &settings)
	}

	fn unit(name: &str, kinds: &[&str], lifecycle: Lifecycle) -> TestUnit {
		TestUnit::new(name).with_declaration(
			FixtureDeclaration::new(kinds.iter().copied())
				.unwrap()
				.with_lifecycle(lifecycle),
		)
	}

	#[rstest]
	#[case(HookState::NotEvaluated, false)]
	#[case(HookState::DeclarationChecked, false)]
	#[case(HookState::SafetyChecked, false)]
	#[case(HookState::Loading, false)]
	#[case(HookState::SkippedNoDeclaration, true)]
	#[case(HookState::SkippedAlreadyLoaded, true)]
	#[case(HookState::Loaded, true)]
	#[case(HookState::Failed, true)]
	fn test_terminal_states(#[case] state: HookState, #[case] terminal: bool) {
		assert_eq!(state.is_terminal(), terminal);
	}

	#[rstest]
	fn test_terminal_states_never_transition() {
		let all = [
			HookState::NotEvaluated,
			HookState::DeclarationChecked,
			HookState::SkippedNoDeclaration,
			HookState::SafetyChecked,
			HookState::SkippedAlreadyLoaded,
			HookState::Loading,
			HookState::Loaded,
			HookState::Failed,
		];
		for from in all.iter().filter(|s| s.is_terminal()) {
			for to in all {
				assert!(!from.can_transition_to(to), "{} -> {}", from, to);
			}
		}
		assert!(HookState::NotEvaluated.can_transition_to(HookState::DeclarationChecked));
		assert!(!HookState::NotEvaluated.can_transition_to(HookState::Loading));
		assert!(!HookState::DeclarationChecked.can_transition_to(HookState::Loading));
	}

	#[rstest]
	#[tokio::test]
	async fn test_no_declaration_is_skipped(journal: Arc<Journal>) {
		let hook = hook(&journal, vec![TestUnit::new("plain_unit")], true);

		// Strict mode does not apply without a declaration.
		let report = hook.before_each(&ExecutionContext::new("plain_unit")).await.unwrap();
		assert_eq!(report.state, HookState::SkippedNoDeclaration);
		assert!(report.loaded.is_empty());

		let report = hook.before_each(&ExecutionContext::new("unregistered")).await.unwrap();
		assert_eq!(report.state, HookState::SkippedNoDeclaration);
		assert!(journal.writes().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_per_method_loads_every_invocation(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("pet_listing", &["Owner", "Pet"], Lifecycle::PerMethod)],
			true,
		);
		let ctx = ExecutionContext::isolated("pet_listing");

		for _ in 0..3 {
			let report = hook.before_each(&ctx).await.unwrap();
			assert_eq!(report.state, HookState::Loaded);
			assert_eq!(report.loaded.total_records(), 3);
		}

		let expected: Vec<String> = (0..3)
			.flat_map(|_| ["Owner:Franklin", "Pet:Leo", "Pet:Basil"])
			.map(String::from)
			.collect();
		assert_eq!(journal.writes(), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_per_class_loads_once(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("owner_listing", &["Owner", "Pet"], Lifecycle::PerClass)],
			true,
		);
		let ctx = ExecutionContext::isolated("owner_listing");

		let first = hook.before_each(&ctx).await.unwrap();
		assert_eq!(first.state, HookState::Loaded);
		for _ in 0..2 {
			let next = hook.before_each(&ctx).await.unwrap();
			assert_eq!(next.state, HookState::SkippedAlreadyLoaded);
			assert!(next.loaded.is_empty());
		}

		assert_eq!(journal.writes(), vec!["Owner:Franklin", "Pet:Leo", "Pet:Basil"]);
		assert!(hook.tracker().is_marked("owner_listing"));
	}

	#[rstest]
	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_per_class_concurrent_invocations_load_once(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("owner_listing", &["Owner"], Lifecycle::PerClass)],
			true,
		);

		let handles: Vec<_> = (0..8)
			.map(|_| {
				let hook = hook.clone();
				tokio::spawn(async move {
					hook.before_each(&ExecutionContext::isolated("owner_listing"))
						.await
						.unwrap()
						.state
				})
			})
			.collect();

		let mut loaded = 0;
		for handle in handles {
			match handle.await.unwrap() {
				HookState::Loaded => loaded += 1,
				state => assert_eq!(state, HookState::SkippedAlreadyLoaded),
			}
		}

		assert_eq!(loaded, 1);
		assert_eq!(journal.writes(), vec!["Owner:Franklin"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_strict_without_isolation_fails_before_loading(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("owner_listing", &["Owner"], Lifecycle::PerClass)],
			true,
		);

		let failure = hook
			.before_each(&ExecutionContext::new("owner_listing"))
			.await
			.unwrap_err();
		assert_eq!(failure.unit, "owner_listing");
		assert!(failure.error.is_configuration());
		assert!(failure.to_string().starts_with("fixture setup failed for test unit `owner_listing`"));
		assert!(journal.writes().is_empty());
		assert!(!hook.tracker().is_marked("owner_listing"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_lenient_without_isolation_warns_and_loads(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("owner_listing", &["Owner"], Lifecycle::PerMethod)],
			false,
		);

		let report = hook
			.before_each(&ExecutionContext::new("owner_listing"))
			.await
			.unwrap();
		assert_eq!(report.state, HookState::Loaded);
		assert_eq!(report.warnings.len(), 1);
		assert!(report.warnings[0].contains("owner_listing"));
		assert_eq!(journal.writes(), vec!["Owner:Franklin"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_inherited_declaration_loads_child_datasets(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![
				unit("clinic_base", &["Owner"], Lifecycle::PerMethod),
				TestUnit::new("visit_listing").with_parent("clinic_base"),
			],
			true,
		);

		let report = hook
			.before_each(&ExecutionContext::isolated("visit_listing"))
			.await
			.unwrap();
		assert_eq!(report.state, HookState::Loaded);
		assert_eq!(report.loaded.ids("Owner"), Some(&[EntityId(1)][..]));
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_dataset_fails_cycle(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("vet_listing", &["Owner"], Lifecycle::PerMethod)],
			true,
		);

		let failure = hook
			.before_each(&ExecutionContext::isolated("vet_listing"))
			.await
			.unwrap_err();
		assert!(matches!(
			failure.error,
			FixtureError::NotFound { ref kind, ref unit, .. } if kind == "Owner" && unit == "vet_listing"
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_per_class_load_poisons_later_cycles(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("vet_listing", &["Owner"], Lifecycle::PerClass)],
			true,
		);
		let ctx = ExecutionContext::isolated("vet_listing");

		let first = hook.before_each(&ctx).await.unwrap_err();
		assert!(matches!(first.error, FixtureError::NotFound { .. }));

		let second = hook.before_each(&ctx).await.unwrap_err();
		assert!(matches!(second.error, FixtureError::PoisonedLoad { ref unit, .. } if unit == "vet_listing"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_separately_built_hooks_sharing_tracker_load_per_class_once(journal: Arc<Journal>) {
		let declarations = registry(vec![unit("owner_listing", &["Owner"], Lifecycle::PerClass)]);
		let tracker = LifecycleTracker::new();
		let ctx = ExecutionContext::isolated("owner_listing");

		let mut states = Vec::new();
		for _ in 0..2 {
			// A new hook per test method, as when each test owns its store.
			let hook = hook_with_tracker(&journal, declarations.clone(), true, tracker.clone());
			states.push(hook.before_each(&ctx).await.unwrap().state);
		}

		assert_eq!(states, vec![HookState::Loaded, HookState::SkippedAlreadyLoaded]);
		assert_eq!(journal.writes(), vec!["Owner:Franklin"]);
		assert!(tracker.is_marked("owner_listing"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_same_unit_under_two_lifecycles_is_configuration_error(journal: Arc<Journal>) {
		let per_class = hook(
			&journal,
			vec![unit("owner_listing", &["Owner"], Lifecycle::PerClass)],
			true,
		);
		let per_method = hook_with_tracker(
			&journal,
			registry(vec![unit("owner_listing", &["Owner"], Lifecycle::PerMethod)]),
			true,
			per_class.tracker().clone(),
		);
		let ctx = ExecutionContext::isolated("owner_listing");

		per_class.before_each(&ctx).await.unwrap();
		let failure = per_method.before_each(&ctx).await.unwrap_err();
		assert!(failure.error.is_configuration());
		assert!(failure.error.to_string().contains("PER_CLASS"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_run_passes_report_to_body(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("owner_listing", &["Owner"], Lifecycle::PerMethod)],
			true,
		);

		let total = hook
			.run(&ExecutionContext::isolated("owner_listing"), |report| async move {
				report.loaded.total_records()
			})
			.await;
		assert_eq!(total, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_run_does_not_enter_body_on_setup_failure(journal: Arc<Journal>) {
		let hook = hook(
			&journal,
			vec![unit("owner_listing", &["Owner"], Lifecycle::PerMethod)],
			true,
		);
		let entered = Arc::new(Mutex::new(false));

		let body_entered = entered.clone();
		let result = tokio::spawn(async move {
			hook.run(&ExecutionContext::new("owner_listing"), |_| async move {
				*body_entered.lock() = true;
			})
			.await
		})
		.await;

		let error = result.unwrap_err();
		assert!(error.is_panic());
		let message = error.into_panic();
		let message = message
			.downcast_ref::<String>()
			.cloned()
			.unwrap_or_default();
		assert!(message.starts_with("fixture setup failed for test unit `owner_listing`"));
		assert!(!*entered.lock());
	}
}
