use super::listener::{EventListener, HandledEventType};
use crate::error::{DomainError, DomainResult};
use crate::event::RelayEvent;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 按事件类型索引的监听器集合
pub struct ListenerRegistry<E: RelayEvent> {
    by_type: HashMap<String, Vec<Arc<dyn EventListener<E>>>>,
    all: Vec<Arc<dyn EventListener<E>>>,
    by_id: HashMap<String, Arc<dyn EventListener<E>>>,
}

impl<E: RelayEvent> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            by_type: self.by_type.clone(),
            all: self.all.clone(),
            by_id: self.by_id.clone(),
        }
    }
}

impl<E: RelayEvent> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            by_type: HashMap::new(),
            all: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<E: RelayEvent> ListenerRegistry<E> {
    /// 监听器 id 是发布记录的路由键，重复即拒绝
    pub fn new(listeners: Vec<Arc<dyn EventListener<E>>>) -> DomainResult<Self> {
        let mut registry = Self::default();

        for l in listeners {
            let id = l.listener_id().to_string();
            if registry.by_id.contains_key(&id) {
                return Err(DomainError::DuplicateListener { listener_id: id });
            }
            registry.by_id.insert(id, l.clone());

            match l.handled_event_type() {
                HandledEventType::All => registry.all.push(l),
                HandledEventType::One(t) => {
                    registry.by_type.entry(t).or_default().push(l);
                }
                HandledEventType::Many(ts) => {
                    let unique: HashSet<String> = ts.into_iter().collect();
                    for t in unique {
                        registry.by_type.entry(t).or_default().push(l.clone());
                    }
                }
            }
        }

        Ok(registry)
    }

    /// 订阅该事件类型的全部监听器（具体类型在前，通配在后）
    pub fn matching(&self, event_type: &str) -> Vec<Arc<dyn EventListener<E>>> {
        let mut merged: Vec<Arc<dyn EventListener<E>>> = Vec::new();
        if let Some(list) = self.by_type.get(event_type) {
            merged.extend(list.iter().cloned());
        }
        merged.extend(self.all.iter().cloned());
        merged
    }

    pub fn by_id(&self, listener_id: &str) -> Option<Arc<dyn EventListener<E>>> {
        self.by_id.get(listener_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
