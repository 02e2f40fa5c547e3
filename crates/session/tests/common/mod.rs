//! In-memory collaborators for coordinator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, mpsc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use folio_session::collab::{
	BackNavigation, BackNavigationHandler, Collaborators, ControlRegistry, Dialogs, HostShell, ListControl, RemoteModel,
	RouteMatchedHandler, RouterCapability, SessionExpiredHandler, SubscriptionId,
};
use folio_session::document::{ActivityFlag, CreationRequest, PropertyKind};
use folio_session::edit_mode::NewActionAnnotation;
use folio_session::{Collection, CoordinatorConfig, DirtyStateProvider, DocumentContext, EditCoordinator, ProgrammingModel, RemoteError};
use folio_worker::TickQueue;
use parking_lot::Mutex;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn next_id(counter: &AtomicU64) -> SubscriptionId {
	SubscriptionId(counter.fetch_add(1, Ordering::SeqCst) + 1)
}

/// Remote model backed by maps; every call is appended to `calls`.
pub struct MockRemote {
	pub calls: Mutex<Vec<String>>,
	pub model: Mutex<ProgrammingModel>,
	pub flags: Mutex<HashMap<(String, ActivityFlag), bool>>,
	pub annotation: Mutex<Option<NewActionAnnotation>>,
	pub properties: Mutex<HashMap<String, PropertyKind>>,
	pub create_requests: Mutex<Vec<CreationRequest>>,
	pub fail_create: AtomicBool,
	/// Rows (numbered from 1 per remote) whose create request is rejected.
	pub reject_rows: Mutex<HashSet<u64>>,
	/// Rows that are created but later fail to settle.
	pub fail_settle_rows: Mutex<HashSet<u64>>,
	pub fail_delete: AtomicBool,
	pub fail_discard: AtomicBool,
	pub transient_in_collection: AtomicBool,
	pub discard_result: Mutex<Option<DocumentContext>>,
	pub timeout_handlers: Mutex<HashMap<SubscriptionId, SessionExpiredHandler>>,
	pub session_context_clears: AtomicUsize,
	next_row: AtomicU64,
	ids: AtomicU64,
}

impl Default for MockRemote {
	fn default() -> Self {
		let properties = [
			("ID", PropertyKind::Structural),
			("Product", PropertyKind::Structural),
			("Quantity", PropertyKind::Structural),
			("_Supplier", PropertyKind::Navigation),
		]
		.into_iter()
		.map(|(name, kind)| (name.to_string(), kind))
		.collect();
		Self {
			calls: Mutex::new(Vec::new()),
			model: Mutex::new(ProgrammingModel::Versioned),
			flags: Mutex::new(HashMap::new()),
			annotation: Mutex::new(None),
			properties: Mutex::new(properties),
			create_requests: Mutex::new(Vec::new()),
			fail_create: AtomicBool::new(false),
			reject_rows: Mutex::new(HashSet::new()),
			fail_settle_rows: Mutex::new(HashSet::new()),
			fail_delete: AtomicBool::new(false),
			fail_discard: AtomicBool::new(false),
			transient_in_collection: AtomicBool::new(false),
			discard_result: Mutex::new(None),
			timeout_handlers: Mutex::new(HashMap::new()),
			session_context_clears: AtomicUsize::new(0),
			next_row: AtomicU64::new(0),
			ids: AtomicU64::new(0),
		}
	}
}

impl MockRemote {
	pub fn set_flag(&self, path: &str, flag: ActivityFlag, value: bool) {
		self.flags.lock().insert((path.to_string(), flag), value);
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().clone()
	}

	pub fn called(&self, prefix: &str) -> usize {
		self.calls.lock().iter().filter(|call| call.starts_with(prefix)).count()
	}

	fn log(&self, call: String) {
		self.calls.lock().push(call);
	}

	/// Fires every attached session-timeout handler.
	pub fn expire_session(&self) {
		let handlers: Vec<_> = self.timeout_handlers.lock().values().cloned().collect();
		for handler in handlers {
			handler();
		}
	}
}

#[async_trait]
impl RemoteModel for MockRemote {
	async fn request_activity_flag(&self, path: &str, flag: ActivityFlag) -> Result<bool, RemoteError> {
		self.log(format!("flag {path} {}", flag.as_str()));
		self.flags
			.lock()
			.get(&(path.to_string(), flag))
			.copied()
			.ok_or_else(|| RemoteError::new("request_activity_flag", format!("no {} for {path}", flag.as_str())))
	}

	async fn create_record(&self, collection: &Collection, request: CreationRequest) -> Result<DocumentContext, RemoteError> {
		let row = self.next_row.fetch_add(1, Ordering::SeqCst) + 1;
		let base = collection.resolved_path();
		// A request dropped mid-flight never reaches the log.
		tokio::task::yield_now().await;
		self.log(format!("create {base}"));
		self.create_requests.lock().push(request.clone());
		if self.fail_create.load(Ordering::SeqCst) || self.reject_rows.lock().contains(&row) {
			return Err(RemoteError::new("create", format!("row {row} rejected by service")));
		}
		if request.inactive {
			return Ok(DocumentContext::inactive(format!("{base}($uid={row})")));
		}

		let context = DocumentContext::transient(format!("{base}($uid={row})"));
		let settling = context.clone();
		let fails = self.fail_settle_rows.lock().contains(&row);
		tokio::spawn(async move {
			tokio::task::yield_now().await;
			if fails {
				settling.mark_failed(RemoteError::new("activate", format!("row {row} failed validation")));
			} else {
				settling.mark_persisted(Some(format!("{base}({row})")));
			}
		});
		Ok(context)
	}

	async fn delete_record(&self, context: &DocumentContext) -> Result<(), RemoteError> {
		self.log(format!("delete {}", context.path()));
		if self.fail_delete.load(Ordering::SeqCst) {
			return Err(RemoteError::new("delete", "locked by another user"));
		}
		Ok(())
	}

	async fn discard_unpublished(&self, context: &DocumentContext) -> Result<Option<DocumentContext>, RemoteError> {
		self.log(format!("discard {}", context.path()));
		if self.fail_discard.load(Ordering::SeqCst) {
			return Err(RemoteError::new("discard", "session already gone"));
		}
		Ok(self.discard_result.lock().clone())
	}

	async fn reset_changes(&self, context: &DocumentContext) -> Result<(), RemoteError> {
		self.log(format!("reset {}", context.path()));
		context.set_pending_changes(false);
		Ok(())
	}

	async fn refresh(&self, context: &DocumentContext) -> Result<(), RemoteError> {
		self.log(format!("refresh {}", context.path()));
		Ok(())
	}

	async fn refresh_side_effects(&self, navigation_path: &str, context: Option<&DocumentContext>) -> Result<(), RemoteError> {
		let parent = context.map(DocumentContext::path).unwrap_or_default();
		self.log(format!("side_effects {navigation_path} {parent}"));
		Ok(())
	}

	fn clear_session_context(&self) {
		self.log("clear_session_context".to_string());
		self.session_context_clears.fetch_add(1, Ordering::SeqCst);
	}

	fn has_transient_contexts(&self, _collection: &Collection) -> bool {
		self.transient_in_collection.load(Ordering::SeqCst)
	}

	fn attach_session_timeout(&self, handler: SessionExpiredHandler) -> SubscriptionId {
		let id = next_id(&self.ids);
		self.timeout_handlers.lock().insert(id, handler);
		id
	}

	fn detach_session_timeout(&self, id: SubscriptionId) {
		self.timeout_handlers.lock().remove(&id);
	}

	fn meta_path(&self, data_path: &str) -> String {
		// "/Orders(1)/_Items" -> "/Orders/_Items"
		data_path
			.split('/')
			.map(|segment| segment.split('(').next().unwrap_or(segment))
			.collect::<Vec<_>>()
			.join("/")
	}

	fn property_kind(&self, _meta_path: &str, property: &str) -> Option<PropertyKind> {
		self.properties.lock().get(property).copied()
	}

	fn programming_model(&self, _context: &DocumentContext) -> ProgrammingModel {
		*self.model.lock()
	}

	fn new_action_annotation(&self, _meta_path: &str) -> Option<NewActionAnnotation> {
		self.annotation.lock().clone()
	}
}

/// Router whose guard is a path prefix.
pub struct MockRouter {
	pub hash: Mutex<String>,
	pub navigation_finalized: AtomicBool,
	pub guard: Mutex<Option<String>>,
	pub guard_discards: AtomicUsize,
	pub crossing_allowed: AtomicBool,
	pub back_out_of_guard: AtomicBool,
	pub navigated_back_from: Mutex<Vec<String>>,
}

impl MockRouter {
	pub fn at(hash: &str) -> Self {
		Self {
			hash: Mutex::new(hash.to_string()),
			navigation_finalized: AtomicBool::new(true),
			guard: Mutex::new(None),
			guard_discards: AtomicUsize::new(0),
			crossing_allowed: AtomicBool::new(false),
			back_out_of_guard: AtomicBool::new(false),
			navigated_back_from: Mutex::new(Vec::new()),
		}
	}

	pub fn guard(&self) -> Option<String> {
		self.guard.lock().clone()
	}
}

impl RouterCapability for MockRouter {
	fn hash(&self) -> String {
		self.hash.lock().clone()
	}

	fn is_navigation_finalized(&self) -> bool {
		self.navigation_finalized.load(Ordering::SeqCst)
	}

	fn register_navigation_guard(&self, key: &str) {
		*self.guard.lock() = Some(key.to_string());
	}

	fn discard_navigation_guard(&self) {
		self.guard_discards.fetch_add(1, Ordering::SeqCst);
		*self.guard.lock() = None;
	}

	fn check_target_against_guard(&self, hash: &str) -> bool {
		self.guard.lock().as_deref().is_some_and(|key| !hash.is_empty() && hash.starts_with(key))
	}

	fn is_guard_crossing_allowed_by_user(&self) -> bool {
		self.crossing_allowed.load(Ordering::SeqCst)
	}

	fn is_back_out_of_guard(&self) -> bool {
		self.back_out_of_guard.load(Ordering::SeqCst)
	}

	fn navigate_back_from(&self, context: &DocumentContext) {
		self.navigated_back_from.lock().push(context.path());
	}
}

/// Parks one `start_session` inside the host until the test releases it.
pub struct StartGate {
	entered: mpsc::Sender<()>,
	release: mpsc::Receiver<()>,
}

/// Host shell recording every registration.
pub struct MockHost {
	pub start_gate: Mutex<Option<StartGate>>,
	pub router: Option<Arc<MockRouter>>,
	pub providers: Mutex<HashMap<SubscriptionId, Arc<DirtyStateProvider>>>,
	pub route_handlers: Mutex<HashMap<SubscriptionId, RouteMatchedHandler>>,
	pub back_handler: Mutex<Option<BackNavigationHandler>>,
	pub dirty_flag: Mutex<Vec<bool>>,
	ids: AtomicU64,
}

impl MockHost {
	pub fn new(router: Option<Arc<MockRouter>>) -> Self {
		Self {
			start_gate: Mutex::new(None),
			router,
			providers: Mutex::new(HashMap::new()),
			route_handlers: Mutex::new(HashMap::new()),
			back_handler: Mutex::new(None),
			dirty_flag: Mutex::new(Vec::new()),
			ids: AtomicU64::new(0),
		}
	}

	/// Makes the next installed back handler block until `release` is sent.
	/// `entered` fires once the start is parked.
	pub fn hold_next_start(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
		let (entered_tx, entered_rx) = mpsc::channel();
		let (release_tx, release_rx) = mpsc::channel();
		*self.start_gate.lock() = Some(StartGate {
			entered: entered_tx,
			release: release_rx,
		});
		(entered_rx, release_tx)
	}

	pub fn provider(&self) -> Option<Arc<DirtyStateProvider>> {
		self.providers.lock().values().next().cloned()
	}

	/// Notifies route handlers of a route change to `hash`.
	pub fn route_to(&self, hash: &str) {
		if let Some(router) = &self.router {
			*router.hash.lock() = hash.to_string();
		}
		let handlers: Vec<_> = self.route_handlers.lock().values().cloned().collect();
		for handler in handlers {
			handler(hash);
		}
	}

	/// Triggers back navigation, returning `Proceed` when no interceptor is installed.
	pub async fn press_back(&self) -> BackNavigation {
		let handler = self.back_handler.lock().clone();
		match handler {
			Some(handler) => handler().await,
			None => BackNavigation::Proceed,
		}
	}
}

impl HostShell for MockHost {
	fn router(&self) -> Option<Arc<dyn RouterCapability>> {
		self.router.clone().map(|router| router as Arc<dyn RouterCapability>)
	}

	fn register_dirty_state_provider(&self, provider: Arc<DirtyStateProvider>) -> SubscriptionId {
		let id = next_id(&self.ids);
		self.providers.lock().insert(id, provider);
		id
	}

	fn deregister_dirty_state_provider(&self, id: SubscriptionId) {
		self.providers.lock().remove(&id);
	}

	fn set_dirty_flag(&self, dirty: bool) {
		self.dirty_flag.lock().push(dirty);
	}

	fn on_route_matched(&self, handler: RouteMatchedHandler) -> SubscriptionId {
		let id = next_id(&self.ids);
		self.route_handlers.lock().insert(id, handler);
		id
	}

	fn off_route_matched(&self, id: SubscriptionId) {
		self.route_handlers.lock().remove(&id);
	}

	fn set_back_navigation_handler(&self, handler: Option<BackNavigationHandler>) {
		let gate = if handler.is_some() { self.start_gate.lock().take() } else { None };
		if let Some(gate) = gate {
			let _ = gate.entered.send(());
			let _ = gate.release.recv();
		}
		*self.back_handler.lock() = handler;
	}
}

#[derive(Default)]
pub struct MockDialogs {
	pub deny_data_loss: AtomicBool,
	pub data_loss_prompts: AtomicUsize,
	pub expiry_notices: AtomicUsize,
	pub message_clears: AtomicUsize,
}

#[async_trait]
impl Dialogs for MockDialogs {
	async fn confirm_data_loss(&self) -> bool {
		self.data_loss_prompts.fetch_add(1, Ordering::SeqCst);
		!self.deny_data_loss.load(Ordering::SeqCst)
	}

	async fn notify_session_expired(&self) {
		self.expiry_notices.fetch_add(1, Ordering::SeqCst);
	}

	fn clear_transient_messages(&self) {
		self.message_clears.fetch_add(1, Ordering::SeqCst);
	}
}

pub struct MockList {
	pub collection: Collection,
	pub selection_clears: AtomicUsize,
	pub refreshes: AtomicUsize,
}

impl MockList {
	pub fn new(collection: Collection) -> Self {
		Self {
			collection,
			selection_clears: AtomicUsize::new(0),
			refreshes: AtomicUsize::new(0),
		}
	}
}

#[async_trait]
impl ListControl for MockList {
	fn collection(&self) -> Collection {
		self.collection.clone()
	}

	fn clear_selection(&self) {
		self.selection_clears.fetch_add(1, Ordering::SeqCst);
	}

	async fn refresh_and_wait(&self) {
		tokio::task::yield_now().await;
		self.refreshes.fetch_add(1, Ordering::SeqCst);
	}
}

#[derive(Default)]
pub struct MockControls {
	pub lists: Mutex<HashMap<String, Arc<MockList>>>,
}

impl MockControls {
	pub fn add(&self, id: &str, collection: Collection) -> Arc<MockList> {
		let list = Arc::new(MockList::new(collection));
		self.lists.lock().insert(id.to_string(), Arc::clone(&list));
		list
	}
}

impl ControlRegistry for MockControls {
	fn control(&self, id: &str) -> Option<Arc<dyn ListControl>> {
		self.lists.lock().get(id).cloned().map(|list| list as Arc<dyn ListControl>)
	}
}

/// One coordinator wired to mocks, with deferred steps held in `ticks`.
pub struct Harness {
	pub remote: Arc<MockRemote>,
	pub router: Arc<MockRouter>,
	pub host: Arc<MockHost>,
	pub dialogs: Arc<MockDialogs>,
	pub controls: Arc<MockControls>,
	pub ticks: TickQueue,
	pub coordinator: EditCoordinator,
}

pub const ORDER: &str = "/Orders(1)";
pub const ORDER_HASH: &str = "Orders(1)";

impl Harness {
	pub fn new() -> Self {
		Self::with_config(CoordinatorConfig::default())
	}

	pub fn with_config(config: CoordinatorConfig) -> Self {
		init_tracing();
		let remote = Arc::new(MockRemote::default());
		let router = Arc::new(MockRouter::at(ORDER_HASH));
		let host = Arc::new(MockHost::new(Some(Arc::clone(&router))));
		let dialogs = Arc::new(MockDialogs::default());
		let controls = Arc::new(MockControls::default());
		let ticks = TickQueue::new();
		let coordinator = EditCoordinator::new(
			Collaborators {
				remote: remote.clone(),
				host: Some(host.clone()),
				dialogs: dialogs.clone(),
				controls: controls.clone(),
				deferrer: Arc::new(ticks.clone()),
			},
			config,
		);
		Self {
			remote,
			router,
			host,
			dialogs,
			controls,
			ticks,
			coordinator,
		}
	}

	/// Coordinator whose host is absent (`None`) or has no router (`Some(false)`).
	pub fn degraded(host_with_router: Option<bool>) -> EditCoordinator {
		init_tracing();
		let host = host_with_router.map(|with_router| {
			let router = with_router.then(|| Arc::new(MockRouter::at(ORDER_HASH)));
			Arc::new(MockHost::new(router)) as Arc<dyn HostShell>
		});
		EditCoordinator::new(
			Collaborators {
				remote: Arc::new(MockRemote::default()),
				host,
				dialogs: Arc::new(MockDialogs::default()),
				controls: Arc::new(MockControls::default()),
				deferrer: Arc::new(TickQueue::new()),
			},
			CoordinatorConfig::default(),
		)
	}

	pub fn order(&self) -> DocumentContext {
		DocumentContext::persisted(ORDER)
	}

	/// Lets spawned callback tasks run to completion.
	pub async fn settle(&self) {
		for _ in 0..8 {
			tokio::task::yield_now().await;
		}
	}
}
