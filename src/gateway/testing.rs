//! Scripted transport used by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::DownstreamError;
use crate::gateway::transport::{DownstreamResponse, GatewayRequest, Transport};
use crate::registry::ServiceInstance;

type Reply = Result<DownstreamResponse, DownstreamError>;

/// Replies from per-address queues and records every call.
///
/// An address with an empty queue answers 200 with its own address as body.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, address: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn fail(&self, address: &str, status: u16) {
        self.push(address, Err(DownstreamError::with_status(status, "scripted failure")));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, target: &ServiceInstance, _request: &GatewayRequest) -> Reply {
        let address = target.address();
        self.calls.lock().unwrap().push(address.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&address)
            .and_then(|queue| queue.pop_front());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply.unwrap_or_else(|| Ok(DownstreamResponse::ok(address)))
    }
}
