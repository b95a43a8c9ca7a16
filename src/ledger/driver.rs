//! Orchestrates one state-machine step for a ledger entry
//!
//! The driver owns the I/O around [`machine`](super::machine): it calls the
//! execution service when the plan asks for it, persists the transition, and
//! hands a fresh success to the dispatcher. All calls are awaited in order.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::entry::LedgerEntry;
use super::machine::{self, Outcome, Plan};
use super::status::ExecutionStatus;
use crate::db::LedgerStore;
use crate::execution::{ExecutionClient, ExecutionError, ExecutionRequest};
use crate::notify::Dispatcher;
use crate::types::Result;

/// Source of "now" for the staleness check
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct LedgerDriver {
    store: Arc<dyn LedgerStore>,
    executor: Arc<dyn ExecutionClient>,
    dispatcher: Dispatcher,
    pending_hash_timeout: Duration,
    clock: Clock,
}

impl LedgerDriver {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        executor: Arc<dyn ExecutionClient>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            store,
            executor,
            dispatcher,
            pending_hash_timeout: Duration::seconds(
                machine::DEFAULT_PENDING_HASH_TIMEOUT_SECS as i64,
            ),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_pending_hash_timeout(mut self, timeout: Duration) -> Self {
        self.pending_hash_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Advance `entry` by one step. `Ok(true)` means the logical event is
    /// settled (success or failure) and the caller should stop retrying.
    ///
    /// Only store failures surface as `Err`; execution errors are folded
    /// into the returned flag.
    #[instrument(skip_all, fields(key = %entry.key()))]
    pub async fn advance<E: LedgerEntry>(
        &self,
        entry: &mut E,
        request: &ExecutionRequest,
    ) -> Result<bool> {
        let current = entry.progress();
        let now = (self.clock)();

        let outcome = match machine::plan(&current, now, self.pending_hash_timeout) {
            Plan::Settle(outcome) => outcome,
            Plan::Poll(handle) => {
                debug!(handle = %handle, "Polling provisional handle");
                match self.executor.poll_status(&handle).await {
                    Ok(hash) => Outcome::Polled(hash),
                    Err(e) => classify_error(e),
                }
            }
            Plan::Execute => {
                info!(subject_id = %request.subject_id, amount = %request.amount, "Executing");
                match self.executor.execute(request).await {
                    Ok(result) => Outcome::Executed(result),
                    Err(e) => classify_error(e),
                }
            }
        };

        if outcome == Outcome::Expired {
            warn!(
                created_at = ?current.created_at,
                "Provisional execution timed out, marking failure"
            );
        }

        let transition = machine::apply(&current, outcome);

        if transition.persist {
            let written = self.store.save_progress(&entry.key(), &transition.next).await?;
            if !written {
                // Someone else settled this key in the meantime
                return Ok(true);
            }
        }

        entry.set_progress(&transition.next);

        if transition.next.status != current.status {
            info!(
                from = %current.status,
                to = %transition.next.status,
                "Ledger transition"
            );
        }

        if transition.notify {
            self.dispatcher.on_success(entry).await;
        }

        if transition.next.status == ExecutionStatus::PendingHash && !transition.handled {
            debug!("Awaiting final handle, caller should retry");
        }

        Ok(transition.handled)
    }
}

fn classify_error(err: ExecutionError) -> Outcome {
    if err.is_permanent() {
        warn!(error = %err, "Execution permanently rejected");
        Outcome::Rejected
    } else {
        warn!(error = %err, "Execution transport error, will retry");
        Outcome::TransportFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Metadata, RewardDoc, RewardReason};
    use crate::db::{InMemoryLedgerStore, LedgerStore as _};
    use crate::execution::ExecutionOutcome;
    use crate::ledger::LedgerEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedExecutor {
        execute: Mutex<Vec<std::result::Result<ExecutionOutcome, ExecutionError>>>,
        poll: Mutex<Vec<std::result::Result<Option<String>, ExecutionError>>>,
        execute_calls: AtomicUsize,
        poll_calls: AtomicUsize,
    }

    impl ScriptedExecutor {
        fn new(
            execute: Vec<std::result::Result<ExecutionOutcome, ExecutionError>>,
            poll: Vec<std::result::Result<Option<String>, ExecutionError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                execute: Mutex::new(execute),
                poll: Mutex::new(poll),
                execute_calls: AtomicUsize::new(0),
                poll_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ExecutionClient for ScriptedExecutor {
        async fn execute(
            &self,
            _request: &ExecutionRequest,
        ) -> std::result::Result<ExecutionOutcome, ExecutionError> {
            self.execute_calls.fetch_add(1, Ordering::SeqCst);
            self.execute.lock().await.remove(0)
        }

        async fn poll_status(
            &self,
            _handle: &str,
        ) -> std::result::Result<Option<String>, ExecutionError> {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            self.poll.lock().await.remove(0)
        }
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            subject_id: "u1".into(),
            destination_wallet: None,
            amount: "100".into(),
            auth_token: None,
            token_address: "0xtoken".into(),
            chain_name: "base".into(),
        }
    }

    async fn pending_reward(store: &InMemoryLedgerStore) -> RewardDoc {
        store
            .insert_reward(RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transport_error_leaves_pending() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let executor = ScriptedExecutor::new(
            vec![Err(ExecutionError::Transport("connection reset".into()))],
            vec![],
        );
        let driver = LedgerDriver::new(store.clone(), executor.clone(), Dispatcher::disabled());

        let mut reward = pending_reward(&store).await;
        let handled = driver.advance(&mut reward, &request()).await.unwrap();

        assert!(!handled);
        assert_eq!(reward.status, ExecutionStatus::Pending);
        let stored = store.find_reward(&reward.reward_key()).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Pending);
    }

    #[tokio::test]
    async fn test_rejected_poll_fails_record() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let executor = ScriptedExecutor::new(
            vec![],
            vec![Err(ExecutionError::Rejected {
                status: 422,
                message: "reverted".into(),
            })],
        );
        let driver = LedgerDriver::new(store.clone(), executor.clone(), Dispatcher::disabled());

        let mut reward = RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100");
        reward.status = ExecutionStatus::PendingHash;
        reward.user_op_hash = Some("op1".into());
        store.seed_reward(reward.clone()).await;

        assert!(driver.advance(&mut reward, &request()).await.unwrap());
        assert_eq!(reward.status, ExecutionStatus::Failure);
        assert_eq!(executor.execute_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clock_drives_expiry() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let executor = ScriptedExecutor::new(vec![], vec![]);
        let created = Utc::now();
        let driver = LedgerDriver::new(store.clone(), executor.clone(), Dispatcher::disabled())
            .with_pending_hash_timeout(Duration::minutes(10))
            .with_clock(Arc::new(move || created + Duration::minutes(11)));

        let mut reward = RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100");
        reward.metadata = Metadata::created(created);
        reward.status = ExecutionStatus::PendingHash;
        reward.user_op_hash = Some("op1".into());
        store.seed_reward(reward.clone()).await;

        assert!(driver.advance(&mut reward, &request()).await.unwrap());
        assert_eq!(reward.status, ExecutionStatus::Failure);
        assert_eq!(executor.poll_calls.load(Ordering::SeqCst), 0);
        assert_eq!(executor.execute_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refused_write_reports_handled() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let executor = ScriptedExecutor::new(vec![Ok(ExecutionOutcome::confirmed("0xlate"))], vec![]);
        let driver = LedgerDriver::new(store.clone(), executor.clone(), Dispatcher::disabled());

        // A stale in-memory copy while the stored record already succeeded
        let mut stale = pending_reward(&store).await;
        let mut settled = stale.progress();
        settled.status = ExecutionStatus::Success;
        settled.final_handle = Some("0xfirst".into());
        store.save_progress(&stale.key(), &settled).await.unwrap();

        assert!(driver.advance(&mut stale, &request()).await.unwrap());
        let stored = store.find_reward(&stale.reward_key()).await.unwrap().unwrap();
        assert_eq!(stored.transaction_hash.as_deref(), Some("0xfirst"));
    }
}
