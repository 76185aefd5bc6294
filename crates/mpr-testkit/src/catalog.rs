use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mpr_reconcile::{CatalogError, CatalogSyncClient, SubmitOutcome};
use rust_decimal::Decimal;

/// Per-item behavior of the [`ScriptedCatalog`]. Items without a script
/// resolve to `parent-of-{item}` and accept every price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogScript {
    /// `resolve_parent` fails with `NotFound`.
    MissingParent,
    /// `resolve_parent` fails with a transport error for the first `failures` calls.
    FlakyResolve { failures: u32 },
    /// `submit_price` fails with a transport error for the first `failures` calls.
    FlakySubmit { failures: u32 },
    /// `submit_price` fails with a non-retryable HTTP status.
    RejectSubmit { status: u16 },
    /// `submit_price` returns these inline validation messages.
    Validation(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub parent_id: String,
    pub item_id: String,
    pub price: Decimal,
}

#[derive(Debug, Default)]
struct State {
    scripts: HashMap<String, CatalogScript>,
    resolve_calls: Vec<String>,
    submit_calls: Vec<Submission>,
    /// Remaining transport failures per item for the flaky scripts.
    remaining: HashMap<String, u32>,
}

#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    state: Mutex<State>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, item_id: &str, script: CatalogScript) -> Self {
        {
            let mut st = self.lock();
            if let CatalogScript::FlakyResolve { failures } | CatalogScript::FlakySubmit { failures } =
                &script
            {
                st.remaining.insert(item_id.to_string(), *failures);
            }
            st.scripts.insert(item_id.to_string(), script);
        }
        self
    }

    pub fn resolve_calls(&self) -> Vec<String> {
        self.lock().resolve_calls.clone()
    }

    /// Every `submit_price` attempt, including ones that failed.
    pub fn submit_calls(&self) -> Vec<Submission> {
        self.lock().submit_calls.clone()
    }

    pub fn total_calls(&self) -> usize {
        let st = self.lock();
        st.resolve_calls.len() + st.submit_calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(st: &mut State, item_id: &str) -> bool {
        match st.remaining.get_mut(item_id) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait::async_trait]
impl CatalogSyncClient for ScriptedCatalog {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn resolve_parent(&self, item_id: &str) -> Result<String, CatalogError> {
        let mut st = self.lock();
        st.resolve_calls.push(item_id.to_string());
        let script = st.scripts.get(item_id).cloned();
        match script {
            Some(CatalogScript::MissingParent) => Err(CatalogError::NotFound(item_id.to_string())),
            Some(CatalogScript::FlakyResolve { .. }) if Self::take_failure(&mut st, item_id) => {
                Err(CatalogError::Transport("connection reset by peer".to_string()))
            }
            _ => Ok(format!("parent-of-{item_id}")),
        }
    }

    async fn submit_price(
        &self,
        parent_id: &str,
        item_id: &str,
        price: Decimal,
    ) -> Result<SubmitOutcome, CatalogError> {
        let mut st = self.lock();
        st.submit_calls.push(Submission {
            parent_id: parent_id.to_string(),
            item_id: item_id.to_string(),
            price,
        });
        let script = st.scripts.get(item_id).cloned();
        match script {
            Some(CatalogScript::FlakySubmit { .. }) if Self::take_failure(&mut st, item_id) => {
                Err(CatalogError::Transport("operation timed out".to_string()))
            }
            Some(CatalogScript::RejectSubmit { status }) => Err(CatalogError::Http {
                status,
                body: "rejected".to_string(),
            }),
            Some(CatalogScript::Validation(messages)) => Ok(SubmitOutcome {
                updated: Vec::new(),
                validation_errors: messages,
            }),
            _ => Ok(SubmitOutcome {
                updated: vec![item_id.to_string()],
                validation_errors: Vec::new(),
            }),
        }
    }
}
