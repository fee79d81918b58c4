//! Conversation driver: runs one user turn against the remote model
//!
//! A turn appends the user's message, asks the provider for a reply with
//! the session's earlier messages as context, and appends the reply (or a
//! fixed diagnostic on failure) to the session captured when the turn
//! began. Which session is active by then does not matter.

use futures::FutureExt;
use road_ai_core::config::{Config, DEFAULT_ERROR_MESSAGE};
use road_ai_core::knowledge;
use road_ai_core::session::{Message, SessionId, SessionStore, SharedSessionStore};
use road_ai_core::utils::{expand_tilde, truncate_chars};
use road_ai_core::{Error, Result};
use road_ai_providers::{build_provider, LLMProvider};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// How a turn ended, with the model message that was appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model replied
    Fulfilled(Message),
    /// The provider failed; the diagnostic message was appended instead
    Failed(Message),
}

impl TurnOutcome {
    pub fn message(&self) -> &Message {
        match self {
            TurnOutcome::Fulfilled(msg) | TurnOutcome::Failed(msg) => msg,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, TurnOutcome::Fulfilled(_))
    }
}

/// Runs turns and reconciles their results into the session store
pub struct ConversationDriver {
    store: SharedSessionStore,
    provider: Arc<dyn LLMProvider>,
    error_message: String,
    in_flight: AtomicBool,
    in_flight_tx: watch::Sender<bool>,
}

impl ConversationDriver {
    /// Create a driver over `store` talking to `provider`
    pub fn new(store: SharedSessionStore, provider: Arc<dyn LLMProvider>) -> Self {
        let (in_flight_tx, _) = watch::channel(false);
        Self {
            store,
            provider,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            in_flight: AtomicBool::new(false),
            in_flight_tx,
        }
    }

    /// Build the store, reference document and provider from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let document_path = config
            .knowledge
            .document_path
            .as_deref()
            .map(expand_tilde);
        let document = knowledge::load_document(document_path.as_deref())?;
        let provider = build_provider(&config.provider, knowledge::system_instruction(&document))?;

        let store = SessionStore::with_title_rules(
            config.chat.default_title.clone(),
            config.chat.title_max_chars,
        )
        .into_shared();

        Ok(Self::new(store, provider).with_error_message(config.chat.error_message.clone()))
    }

    /// Replace the diagnostic appended when a turn fails
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// The store this driver writes into
    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Model used by the underlying provider
    pub fn model(&self) -> String {
        self.provider.get_default_model()
    }

    /// Whether a turn is currently outstanding
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Watch the in-flight flag
    pub fn subscribe_in_flight(&self) -> watch::Receiver<bool> {
        self.in_flight_tx.subscribe()
    }

    /// Send `user_text` as the next turn of `session_id`.
    ///
    /// Fails fast with `InvalidInput` for blank text, `NotFound` for an
    /// unknown session and `Busy` while another turn is outstanding; none of
    /// these touch the store. Provider failures, panics included, never
    /// surface here: they become a `Failed` outcome whose diagnostic is
    /// already in the session.
    pub async fn send_turn(&self, session_id: &SessionId, user_text: &str) -> Result<TurnOutcome> {
        if user_text.trim().is_empty() {
            return Err(Error::InvalidInput("message text is blank".to_string()));
        }

        let _guard = InFlightGuard::acquire(&self.in_flight, &self.in_flight_tx)?;

        let prior_turns = {
            let mut store = self.store.write();
            let prior_turns = store.history(session_id)?;
            store.append_message(session_id, Message::user(user_text))?;
            prior_turns
        };
        self.in_flight_tx.send_replace(true);

        info!(
            "Sending turn for session {} ({} prior turns): {}",
            session_id,
            prior_turns.len(),
            truncate_chars(user_text, 80)
        );

        let reply = AssertUnwindSafe(self.provider.send_message(&prior_turns, user_text))
            .catch_unwind()
            .await;

        let outcome = match reply {
            Ok(Ok(text)) => {
                debug!("Model replied to session {} with {} bytes", session_id, text.len());
                TurnOutcome::Fulfilled(self.reconcile(session_id, Message::model(text))?)
            }
            Ok(Err(e)) => {
                error!("Turn for session {} failed: {}", session_id, e);
                self.fail(session_id)?
            }
            Err(panic) => {
                error!(
                    "Provider panicked during turn for session {}: {}",
                    session_id,
                    panic_message(panic.as_ref())
                );
                self.fail(session_id)?
            }
        };

        Ok(outcome)
    }

    fn fail(&self, session_id: &SessionId) -> Result<TurnOutcome> {
        let diagnostic = Message::model(self.error_message.clone());
        Ok(TurnOutcome::Failed(self.reconcile(session_id, diagnostic)?))
    }

    /// Append the model's message to the session captured at call time
    fn reconcile(&self, session_id: &SessionId, message: Message) -> Result<Message> {
        let mut store = self.store.write();
        let stored = store.append_message(session_id, message)?;
        Ok(stored.clone())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Holds the in-flight flag for the duration of a turn and clears it on
/// drop, including when the turn future is dropped or unwinds.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    tx: &'a watch::Sender<bool>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, tx: &'a watch::Sender<bool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self { flag, tx })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        // Only wake watchers if `true` was actually published.
        self.tx.send_if_modified(|busy| std::mem::replace(busy, false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use road_ai_core::session::Role;
    use road_ai_providers::{ProviderError, ProviderResult};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Replies with a fixed text and records what it was asked
    struct StaticProvider {
        reply: String,
        calls: Mutex<Vec<(Vec<Message>, String)>>,
    }

    impl StaticProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for StaticProvider {
        async fn send_message(&self, history: &[Message], text: &str) -> ProviderResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push((history.to_vec(), text.to_string()));
            Ok(self.reply.clone())
        }

        fn get_default_model(&self) -> String {
            "static".to_string()
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        async fn send_message(&self, _history: &[Message], _text: &str) -> ProviderResult<String> {
            Err(ProviderError::ApiError("HTTP 403: quota".to_string()))
        }

        fn get_default_model(&self) -> String {
            "failing".to_string()
        }
    }

    /// Holds the call open until the test releases it
    struct GatedProvider {
        started: Mutex<Option<oneshot::Sender<()>>>,
        release: Mutex<Option<oneshot::Receiver<ProviderResult<String>>>>,
    }

    impl GatedProvider {
        fn new() -> (
            Self,
            oneshot::Receiver<()>,
            oneshot::Sender<ProviderResult<String>>,
        ) {
            let (started_tx, started_rx) = oneshot::channel();
            let (release_tx, release_rx) = oneshot::channel();
            let provider = Self {
                started: Mutex::new(Some(started_tx)),
                release: Mutex::new(Some(release_rx)),
            };
            (provider, started_rx, release_tx)
        }
    }

    #[async_trait]
    impl LLMProvider for GatedProvider {
        async fn send_message(&self, _history: &[Message], _text: &str) -> ProviderResult<String> {
            let started = self.started.lock().unwrap().take();
            if let Some(started) = started {
                let _ = started.send(());
            }
            let release = self.release.lock().unwrap().take();
            match release {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ProviderError::ApiError("dropped".to_string()))),
                None => Err(ProviderError::ApiError("already used".to_string())),
            }
        }

        fn get_default_model(&self) -> String {
            "gated".to_string()
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl LLMProvider for PanickingProvider {
        async fn send_message(&self, _history: &[Message], _text: &str) -> ProviderResult<String> {
            panic!("provider blew up");
        }

        fn get_default_model(&self) -> String {
            "panicking".to_string()
        }
    }

    fn driver_with(provider: Arc<dyn LLMProvider>) -> (Arc<ConversationDriver>, SessionId) {
        let store = SessionStore::new().into_shared();
        let id = store.write().create_session();
        (Arc::new(ConversationDriver::new(store, provider)), id)
    }

    #[tokio::test]
    async fn test_marine_cover_scenario() {
        let (driver, id) = driver_with(Arc::new(StaticProvider::new("100mm")));

        let outcome = driver
            .send_turn(&id, "What is the cover for marine exposure?")
            .await
            .unwrap();
        assert!(outcome.is_fulfilled());

        let store = driver.store().read();
        let session = store.get(&id).unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].text, "What is the cover for marine exposure?");
        assert_eq!(session.messages[1].role, Role::Model);
        assert_eq!(session.messages[1].text, "100mm");
        assert_eq!(session.title, "What is the cover for mar...");
        assert!(!driver.is_in_flight());
    }

    #[tokio::test]
    async fn test_prior_turns_exclude_current_message() {
        let provider = Arc::new(StaticProvider::new("ok"));
        let (driver, id) = driver_with(provider.clone());

        driver.send_turn(&id, "first").await.unwrap();
        driver.send_turn(&id, "second").await.unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.is_empty());
        assert_eq!(calls[0].1, "first");

        let texts: Vec<_> = calls[1].0.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "ok"]);
        assert_eq!(calls[1].1, "second");
    }

    #[tokio::test]
    async fn test_failure_appends_single_diagnostic() {
        let (driver, id) = driver_with(Arc::new(FailingProvider));

        let outcome = driver.send_turn(&id, "Riprap gravity?").await.unwrap();

        assert!(!outcome.is_fulfilled());
        assert_eq!(outcome.message().text, DEFAULT_ERROR_MESSAGE);
        let history = driver.store().read().history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Model);
        assert_eq!(history[1].text, DEFAULT_ERROR_MESSAGE);
        assert!(!driver.is_in_flight());
    }

    #[tokio::test]
    async fn test_custom_error_message() {
        let store = SessionStore::new().into_shared();
        let id = store.write().create_session();
        let driver = ConversationDriver::new(store, Arc::new(FailingProvider))
            .with_error_message("Model unavailable");

        let outcome = driver.send_turn(&id, "hello").await.unwrap();
        assert_eq!(outcome.message().text, "Model unavailable");
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_without_mutation() {
        let (driver, id) = driver_with(Arc::new(StaticProvider::new("unused")));

        let err = driver.send_turn(&id, "   \n\t").await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        let store = driver.store().read();
        assert!(store.get(&id).unwrap().is_empty());
        assert_eq!(store.get(&id).unwrap().title, "New Discussion");
        assert!(!driver.is_in_flight());
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let provider = Arc::new(StaticProvider::new("unused"));
        let (driver, _id) = driver_with(provider.clone());

        let err = driver
            .send_turn(&SessionId::from("missing"), "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(provider.calls.lock().unwrap().is_empty());
        assert!(!driver.is_in_flight());
    }

    #[tokio::test]
    async fn test_response_lands_in_originating_session() {
        let (provider, started, release) = GatedProvider::new();
        let (driver, a) = driver_with(Arc::new(provider));
        let b = driver.store().write().create_session();
        driver.store().write().set_active(&a).unwrap();

        let task = {
            let driver = Arc::clone(&driver);
            let a = a.clone();
            tokio::spawn(async move { driver.send_turn(&a, "q1").await })
        };
        started.await.unwrap();

        assert!(driver.is_in_flight());
        let c = {
            let mut store = driver.store().write();
            store.set_active(&b).unwrap();
            store.create_session()
        };

        release.send(Ok("a1".to_string())).unwrap();
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.is_fulfilled());

        let store = driver.store().read();
        let texts: Vec<_> = store
            .history(&a)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["q1", "a1"]);
        assert!(store.get(&b).unwrap().is_empty());
        assert!(store.get(&c).unwrap().is_empty());
        assert_eq!(store.active_id(), Some(&c));
        assert!(!driver.is_in_flight());
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_busy() {
        let (provider, started, release) = GatedProvider::new();
        let (driver, a) = driver_with(Arc::new(provider));
        let b = driver.store().write().create_session();

        let task = {
            let driver = Arc::clone(&driver);
            let a = a.clone();
            tokio::spawn(async move { driver.send_turn(&a, "q1").await })
        };
        started.await.unwrap();

        let err = driver.send_turn(&b, "q2").await.unwrap_err();
        assert!(matches!(err, Error::Busy));
        assert!(driver.store().read().get(&b).unwrap().is_empty());

        release
            .send(Err(ProviderError::InvalidResponse("empty".to_string())))
            .unwrap();
        let outcome = task.await.unwrap().unwrap();
        assert!(!outcome.is_fulfilled());
        assert!(!driver.is_in_flight());

        // Free again once the first turn has settled.
        assert!(driver.send_turn(&b, "q2").await.is_ok());
    }

    #[tokio::test]
    async fn test_in_flight_watch_transitions() {
        let (provider, started, release) = GatedProvider::new();
        let (driver, id) = driver_with(Arc::new(provider));
        let mut watcher = driver.subscribe_in_flight();
        assert!(!*watcher.borrow());

        let task = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.send_turn(&id, "q").await })
        };
        started.await.unwrap();
        assert!(*watcher.borrow_and_update());

        release.send(Ok("a".to_string())).unwrap();
        task.await.unwrap().unwrap();

        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());
    }

    #[tokio::test]
    async fn test_provider_panic_becomes_diagnostic() {
        let (driver, id) = driver_with(Arc::new(PanickingProvider));

        let result = {
            let driver = Arc::clone(&driver);
            let id = id.clone();
            tokio::spawn(async move { driver.send_turn(&id, "boom").await }).await
        };

        let outcome = result.unwrap().unwrap();
        assert!(!outcome.is_fulfilled());
        assert_eq!(outcome.message().text, DEFAULT_ERROR_MESSAGE);
        assert!(!driver.is_in_flight());

        let history = driver.store().read().history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Model);
        assert_eq!(history[1].text, DEFAULT_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_rejected_turn_does_not_wake_watchers() {
        let (driver, _id) = driver_with(Arc::new(StaticProvider::new("unused")));
        let mut watcher = driver.subscribe_in_flight();
        watcher.borrow_and_update();

        let err = driver
            .send_turn(&SessionId::from("missing"), "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(!watcher.has_changed().unwrap());
        assert!(!driver.is_in_flight());
    }

    #[tokio::test]
    async fn test_from_config_uses_chat_settings() {
        let mut config = Config::default();
        config.chat.default_title = "Untitled".to_string();
        let driver = ConversationDriver::from_config(&config).unwrap();

        let id = driver.store().write().create_session();
        assert_eq!(driver.store().read().get(&id).unwrap().title, "Untitled");
        assert_eq!(driver.model(), "gemini-2.5-flash");
    }
}
