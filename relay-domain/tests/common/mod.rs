#![allow(dead_code)]

use async_trait::async_trait;
use relay_domain::event::{CorrelationKey, RelayEvent};
use relay_domain::eventing::{EventListener, HandledEventType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    OrderPlaced { order_id: i64 },
    OrderShipped { order_id: i64 },
    Poke { order_id: i64 },
}

impl RelayEvent for OrderEvent {
    const EVENT_TYPES: &'static [&'static str] = &["OrderPlaced", "OrderShipped", "Poke"];

    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "OrderPlaced",
            OrderEvent::OrderShipped { .. } => "OrderShipped",
            OrderEvent::Poke { .. } => "Poke",
        }
    }

    fn correlation_key(&self) -> Option<CorrelationKey> {
        match self {
            OrderEvent::OrderPlaced { order_id }
            | OrderEvent::OrderShipped { order_id }
            | OrderEvent::Poke { order_id } => Some((*order_id).into()),
        }
    }

    fn is_control_signal(&self) -> bool {
        matches!(self, OrderEvent::Poke { .. })
    }
}

/// 可切换成败的监听器，记录每次调用
pub struct Switchable {
    id: &'static str,
    handles: HandledEventType,
    failing: Mutex<HashSet<i64>>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<OrderEvent>>,
}

impl Switchable {
    pub fn new(id: &'static str, handles: HandledEventType) -> Arc<Self> {
        Arc::new(Self {
            id,
            handles,
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_for(&self, order_id: i64) {
        self.failing.lock().unwrap().insert(order_id);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<OrderEvent> {
        self.seen.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.seen.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventListener<OrderEvent> for Switchable {
    fn listener_id(&self) -> &str {
        self.id
    }

    fn handled_event_type(&self) -> HandledEventType {
        self.handles.clone()
    }

    async fn on_event(&self, event: &OrderEvent) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(event.clone());
        let order_id = match event {
            OrderEvent::OrderPlaced { order_id }
            | OrderEvent::OrderShipped { order_id }
            | OrderEvent::Poke { order_id } => *order_id,
        };
        if self.failing.lock().unwrap().contains(&order_id) {
            anyhow::bail!("{} rejects order {order_id}", self.id);
        }
        Ok(())
    }
}
