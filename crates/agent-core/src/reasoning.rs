//! Reasoning Loop
//!
//! Drives one session: each user query becomes a turn that alternates
//! between the decision engine and tool dispatch until the engine answers.
//!
//! ```text
//! AwaitingInput ──▶ ModelTurn ──▶ Terminal ──▶ AwaitingInput
//!                     ▲    │
//!                     │    ▼
//!                  ToolDispatch
//! ```
//!
//! A turn works on a staged copy of the conversation and commits it only
//! when the turn completes, so cancelled or failed turns leave no trace.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::aggregator::{AggregatorConfig, ResultAggregator};
use crate::arguments::synthesize;
use crate::connection::ProviderDescriptor;
use crate::decision::{Decision, DecisionEngine, ProposedCall};
use crate::dispatch::{DEFAULT_CALL_TIMEOUT, Dispatcher};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, ToolCallRef};
use crate::registry::{RegistrationReport, ToolRegistry};
use crate::session::Session;
use crate::tool::{ToolCallRequest, ToolCallResult, ToolDescriptor};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum tool-dispatch rounds per turn
    pub max_iterations: usize,

    /// Wait budget for one tool call
    pub tool_timeout: Duration,

    /// Wait budget for one model call
    pub model_timeout: Duration,

    /// Extra attempts after a failed model call (capped at one)
    pub model_retries: usize,

    /// Wait budget for connecting to one provider at bootstrap
    pub connect_timeout: Duration,

    pub aggregator: AggregatorConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout: DEFAULT_CALL_TIMEOUT,
            model_timeout: Duration::from_secs(120),
            model_retries: 1,
            connect_timeout: Duration::from_secs(10),
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// Where the loop currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    ModelTurn,
    ToolDispatch,
    Terminal,
}

/// Result of one turn
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// Final assistant text
    pub answer: String,

    /// Tool-dispatch rounds the turn used
    pub rounds: usize,

    /// The turn hit the iteration cap and the answer is partial
    pub degraded: bool,
}

enum PreparedCall {
    Ready(ToolCallRequest),
    Rejected(ToolCallResult),
}

/// The main Agent struct
pub struct Agent {
    engine: Arc<dyn DecisionEngine>,
    registry: ToolRegistry,
    dispatcher: Dispatcher,
    aggregator: ResultAggregator,
    config: AgentConfig,
    session: Session,
    state: LoopState,
    cancel: CancellationToken,
    registration: RegistrationReport,
}

impl Agent {
    /// Create an agent over an already populated registry
    pub fn new(engine: Arc<dyn DecisionEngine>, registry: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            engine,
            registry,
            dispatcher: Dispatcher::new(config.tool_timeout),
            aggregator: ResultAggregator::new(config.aggregator.clone()),
            config,
            session: Session::new(),
            state: LoopState::AwaitingInput,
            cancel: CancellationToken::new(),
            registration: RegistrationReport::default(),
        }
    }

    /// Connect to the given providers and start a session.
    ///
    /// Unreachable providers are excluded; if none can be reached the
    /// session cannot start.
    pub async fn bootstrap(
        engine: Arc<dyn DecisionEngine>,
        providers: Vec<ProviderDescriptor>,
        config: AgentConfig,
    ) -> Result<Self> {
        let attempted = providers.len();
        let mut registry = ToolRegistry::new().with_connect_timeout(config.connect_timeout);
        let registration = registry.register_all(providers).await;

        if registration.registered.is_empty() {
            return Err(AgentError::NoProvidersAvailable { attempted });
        }
        if registration.is_degraded() {
            let missing: Vec<&str> = registration.unavailable.iter().map(|(id, _)| id.as_str()).collect();
            tracing::warn!(missing = ?missing, "Starting session in degraded mode");
        }

        let mut agent = Self::new(engine, registry, config);
        agent.registration = registration;
        Ok(agent)
    }

    /// Run one turn: user text in, final assistant text out
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if !self.session.active {
            return Err(AgentError::Other("session has ended".into()));
        }

        let mut staged = self.session.conversation.clone();
        staged.push_user(input);

        let outcome = self.drive(&mut staged).await;
        self.state = LoopState::AwaitingInput;

        match outcome {
            Ok(outcome) => {
                self.session.commit_turn(staged);
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Turn aborted");
                Err(e)
            }
        }
    }

    async fn drive(&mut self, staged: &mut Conversation) -> Result<TurnOutcome> {
        let catalog = self.registry.list();
        let mut rounds = 0;

        loop {
            self.state = LoopState::ModelTurn;
            let calls = match self.decide(staged, &catalog).await? {
                Decision::ToolCalls(calls) if !calls.is_empty() => calls,
                Decision::ToolCalls(_) => return Ok(self.finish(staged, String::new(), rounds, false)),
                Decision::Terminal(answer) => return Ok(self.finish(staged, answer, rounds, false)),
            };

            if rounds >= self.config.max_iterations {
                let err = AgentError::MaxIterations(self.config.max_iterations);
                tracing::warn!(rounds, "{err}; ending turn with a partial answer");
                let answer = self.aggregator.partial_answer(staged, rounds);
                return Ok(self.finish(staged, answer, rounds, true));
            }

            rounds += 1;
            self.state = LoopState::ToolDispatch;
            tracing::debug!(round = rounds, calls = calls.len(), "Dispatching tool calls");
            self.dispatch_round(staged, calls).await?;
        }
    }

    fn finish(&mut self, staged: &mut Conversation, answer: String, rounds: usize, degraded: bool) -> TurnOutcome {
        self.state = LoopState::Terminal;
        staged.push_answer(answer.clone());
        TurnOutcome { answer, rounds, degraded }
    }

    /// Ask the engine, with a deadline and at most one retry
    async fn decide(&self, conversation: &Conversation, catalog: &[ToolDescriptor]) -> Result<Decision> {
        let attempts = 1 + self.config.model_retries.min(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let call = tokio::time::timeout(self.config.model_timeout, self.engine.decide(conversation, catalog));
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(AgentError::Cancelled),
                outcome = call => outcome,
            };

            let err = match outcome {
                Ok(Ok(decision)) => return Ok(decision),
                Ok(Err(e)) => e,
                Err(_) => AgentError::ModelTimeout(self.config.model_timeout),
            };

            if attempt >= attempts || !err.is_retryable() {
                return Err(err);
            }
            tracing::warn!(attempt, error = %err, "Model call failed, retrying once");
        }
    }

    async fn dispatch_round(&self, staged: &mut Conversation, calls: Vec<ProposedCall>) -> Result<()> {
        let refs: Vec<ToolCallRef> = calls
            .into_iter()
            .map(|c| ToolCallRef {
                call_id: uuid::Uuid::new_v4().to_string(),
                name: c.name,
                arguments: c.arguments,
            })
            .collect();
        let origin = staged.propose_calls("", refs.clone());

        let prepared: Vec<PreparedCall> = refs.into_iter().map(|r| self.prepare(r, origin)).collect();

        let batch = join_all(prepared.iter().map(|p| async move {
            match p {
                PreparedCall::Ready(request) => self.dispatcher.execute(&self.registry, request).await,
                PreparedCall::Rejected(result) => result.clone(),
            }
        }));

        let results = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(AgentError::Cancelled),
            results = batch => results,
        };

        self.aggregator.fold(staged, &results)
    }

    /// Resolve the tool and synthesize its arguments; failures become error results
    fn prepare(&self, call: ToolCallRef, origin: u64) -> PreparedCall {
        let resolved = self
            .registry
            .resolve(&call.name)
            .and_then(|tool| synthesize(tool, &call.arguments).map(|args| (tool.name.clone(), args)));

        match resolved {
            Ok((name, synthesized)) => PreparedCall::Ready(ToolCallRequest {
                id: call.call_id,
                name,
                arguments: synthesized.arguments,
                origin,
            }),
            Err(e) => {
                tracing::debug!(tool = %call.name, error = %e, "Tool call rejected before dispatch");
                let mut result = ToolCallResult::from_error(&call.call_id, &call.name, &e);
                if matches!(e, AgentError::ToolNotFound(_)) {
                    result = ToolCallResult::failure(
                        &call.call_id,
                        &call.name,
                        format!("Error: {e}. Available tools: {}", self.registry.names().join(", ")),
                    );
                }
                PreparedCall::Rejected(result)
            }
        }
    }

    /// Cancel the session; in-flight waits are abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for cancelling the session from elsewhere
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Close provider connections and end the session
    pub async fn shutdown(&mut self) {
        self.registry.shutdown().await;
        self.session.end();
        self.state = LoopState::AwaitingInput;
    }

    /// Get the tool registry
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Provider registration outcome from bootstrap
    pub const fn registration(&self) -> &RegistrationReport {
        &self.registration
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Clear the conversation, keeping provider connections
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    engine: Option<Arc<dyn DecisionEngine>>,
    providers: Vec<ProviderDescriptor>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            providers: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn engine(mut self, engine: Arc<dyn DecisionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn provider(mut self, provider: ProviderDescriptor) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = ProviderDescriptor>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub const fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub const fn model_timeout(mut self, timeout: Duration) -> Self {
        self.config.model_timeout = timeout;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> Result<Agent> {
        let engine = self
            .engine
            .ok_or_else(|| AgentError::Config("Decision engine is required".into()))?;

        Agent::bootstrap(engine, self.providers, self.config).await
    }
}
