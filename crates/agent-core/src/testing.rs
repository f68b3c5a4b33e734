//! Test doubles: an in-memory provider transport and a scripted decision engine.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::{ProviderResponse, ProviderTransport};
use crate::decision::{Decision, DecisionEngine, ProposedCall};
use crate::error::{AgentError, Result};
use crate::message::Conversation;
use crate::tool::{Arguments, ParameterSchema, ToolDescriptor, ToolSpec};

#[derive(Default)]
pub struct FakeTransport {
    reachable: bool,
    multiplexing: bool,
    broken_catalog: bool,
    catalog_delay: Option<Duration>,
    tools: Vec<ToolSpec>,
    responses: HashMap<String, ProviderResponse>,
    delays: HashMap<String, Duration>,
    log: Mutex<Vec<(String, Arguments)>>,
    initialized: AtomicUsize,
    closed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn with_tool(self, name: &str, required: &[&str]) -> Self {
        self.with_spec(ToolSpec {
            name: name.into(),
            description: format!("{name} tool"),
            parameters: required
                .iter()
                .map(|p| ParameterSchema::required(*p, "string", *p))
                .collect(),
            default_arguments: None,
            examples: Vec::new(),
        })
    }

    pub fn with_spec(mut self, spec: ToolSpec) -> Self {
        self.tools.push(spec);
        self
    }

    pub fn with_response(mut self, tool: &str, response: ProviderResponse) -> Self {
        self.responses.insert(tool.into(), response);
        self
    }

    pub fn with_delay(mut self, tool: &str, delay: Duration) -> Self {
        self.delays.insert(tool.into(), delay);
        self
    }

    pub fn multiplexed(mut self) -> Self {
        self.multiplexing = true;
        self
    }

    /// Handshake succeeds, catalog fetch fails
    pub fn with_broken_catalog(mut self) -> Self {
        self.broken_catalog = true;
        self
    }

    pub fn with_catalog_delay(mut self, delay: Duration) -> Self {
        self.catalog_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn call_log(&self) -> Vec<(String, Arguments)> {
        self.log.lock().unwrap().clone()
    }

    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderTransport for FakeTransport {
    async fn initialize(&self) -> Result<()> {
        if !self.reachable {
            return Err(AgentError::Other("connection refused".into()));
        }
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        if let Some(delay) = self.catalog_delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken_catalog {
            return Err(AgentError::Other("catalog unavailable".into()));
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, tool_name: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        self.log.lock().unwrap().push((tool_name.to_string(), arguments.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(tool_name) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(self
            .responses
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| ProviderResponse::text(format!("{tool_name} ok"))))
    }

    fn supports_multiplexing(&self) -> bool {
        self.multiplexing
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type DecideFn = dyn Fn(&Conversation, &[ToolDescriptor]) -> Result<Decision> + Send + Sync;

/// Decision engine driven by a queue of canned decisions, then a fallback closure
pub struct ScriptedEngine {
    script: Mutex<VecDeque<Result<Decision>>>,
    fallback: Box<DecideFn>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Conversation>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Result<Decision>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Box::new(|_, _| Ok(Decision::Terminal("done".into()))),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn from_fn(
        f: impl Fn(&Conversation, &[ToolDescriptor]) -> Result<Decision> + Send + Sync + 'static,
    ) -> Self {
        let mut engine = Self::new(Vec::new());
        engine.fallback = Box::new(f);
        engine
    }

    /// Always propose the same call
    pub fn always_calls(tool: &str) -> Self {
        let tool = tool.to_string();
        Self::from_fn(move |_, _| Ok(Decision::ToolCalls(vec![ProposedCall::new(&tool, "{}")])))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Conversation snapshots as passed to each decision
    pub fn seen(&self) -> Vec<Conversation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    async fn decide(&self, conversation: &Conversation, catalog: &[ToolDescriptor]) -> Result<Decision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(conversation.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(decision) => decision,
            None => (self.fallback)(conversation, catalog),
        }
    }
}
