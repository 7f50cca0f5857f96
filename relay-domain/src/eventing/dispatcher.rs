//! 分发器（Dispatcher）
//!
//! 提交后分发协议：
//! - 在事务作用域内为每个匹配的监听器写入一条未完成的发布记录；
//! - 事务提交后才调用监听器，回滚则不留记录、不调用；
//! - 监听器成功则标记完成，失败（错误或超时）仅记日志，记录保持未完成等待重投；
//! - 控制信号不入账本，提交后直接送达监听器。
//!
use super::listener::EventListener;
use super::registry::ListenerRegistry;
use crate::clock::SharedClock;
use crate::config::DispatcherConfig;
use crate::error::{DomainError, DomainResult};
use crate::event::RelayEvent;
use crate::persist::{LedgerTransaction, PublicationId, PublicationLedger, PublicationRecord};
use std::ops::AddAssign;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// 一次分发的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 写入账本的记录数
    pub recorded: usize,
    /// 投递成功并标记完成的记录数
    pub completed: usize,
    /// 投递失败、保持未完成的记录数
    pub failed: usize,
}

impl AddAssign for DispatchReport {
    fn add_assign(&mut self, rhs: Self) {
        self.recorded += rhs.recorded;
        self.completed += rhs.completed;
        self.failed += rhs.failed;
    }
}

struct DispatcherInner<L: PublicationLedger, E: RelayEvent> {
    ledger: Arc<L>,
    clock: SharedClock,
    registry: ListenerRegistry<E>,
    listener_timeout: Option<Duration>,
}

/// 分发器句柄，克隆开销很小
pub struct Dispatcher<L: PublicationLedger, E: RelayEvent> {
    inner: Arc<DispatcherInner<L, E>>,
}

impl<L: PublicationLedger, E: RelayEvent> Clone for Dispatcher<L, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// 不持有所有权的分发器引用，供需要回调分发器的监听器使用
pub struct WeakDispatcher<L: PublicationLedger, E: RelayEvent> {
    inner: Weak<DispatcherInner<L, E>>,
}

impl<L: PublicationLedger, E: RelayEvent> Clone for WeakDispatcher<L, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<L: PublicationLedger, E: RelayEvent> WeakDispatcher<L, E> {
    pub fn upgrade(&self) -> DomainResult<Dispatcher<L, E>> {
        self.inner
            .upgrade()
            .map(|inner| Dispatcher { inner })
            .ok_or(DomainError::DispatcherGone)
    }
}

impl<L: PublicationLedger, E: RelayEvent> Dispatcher<L, E> {
    /// 监听器 id 重复时失败
    pub fn new(
        ledger: Arc<L>,
        clock: SharedClock,
        config: &DispatcherConfig,
        listeners: Vec<Arc<dyn EventListener<E>>>,
    ) -> DomainResult<Self> {
        Self::new_cyclic(ledger, clock, config, |_| listeners)
    }

    /// 构造期间即可拿到自身的弱引用，监听器可借此再次发布事件
    pub fn new_cyclic<F>(
        ledger: Arc<L>,
        clock: SharedClock,
        config: &DispatcherConfig,
        build_listeners: F,
    ) -> DomainResult<Self>
    where
        F: FnOnce(&WeakDispatcher<L, E>) -> Vec<Arc<dyn EventListener<E>>>,
    {
        let listener_timeout = config.listener_timeout;
        let mut rejected = None;
        let inner = Arc::new_cyclic(|weak| {
            let handle = WeakDispatcher {
                inner: weak.clone(),
            };
            let registry = ListenerRegistry::new(build_listeners(&handle)).unwrap_or_else(|err| {
                rejected = Some(err);
                ListenerRegistry::default()
            });
            DispatcherInner {
                ledger,
                clock,
                registry,
                listener_timeout,
            }
        });

        match rejected {
            Some(err) => Err(err),
            None => Ok(Self { inner }),
        }
    }

    pub fn downgrade(&self) -> WeakDispatcher<L, E> {
        WeakDispatcher {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.inner.ledger
    }

    pub fn clock(&self) -> &SharedClock {
        &self.inner.clock
    }

    /// 打开分发作用域（同时打开账本事务）
    pub async fn begin(&self) -> DomainResult<DispatchScope<L, E>> {
        Ok(DispatchScope {
            dispatcher: self.clone(),
            tx: self.inner.ledger.begin().await?,
            publications: Vec::new(),
            signals: Vec::new(),
        })
    }

    /// 单事件：开启、发布、提交、投递
    pub async fn publish(&self, event: E) -> DomainResult<DispatchReport> {
        self.publish_all(vec![event]).await
    }

    /// 多事件共用一个事务
    pub async fn publish_all(&self, events: Vec<E>) -> DomainResult<DispatchReport> {
        let mut scope = self.begin().await?;
        for event in &events {
            if let Err(err) = scope.publish(event).await {
                scope.rollback().await?;
                return Err(err);
            }
        }
        Ok(scope.commit().await?.deliver().await)
    }

    /// 重新投递一条已入账的记录（扫描器与定向重投使用）
    pub async fn redispatch(&self, record: &PublicationRecord) -> DispatchReport {
        match record.decode::<E>() {
            Ok(event) => self.redeliver(record, &event).await,
            Err(err) => {
                tracing::warn!(
                    publication_id = %record.id(),
                    listener_id = record.listener_id(),
                    error = %err,
                    "cannot decode publication for redispatch"
                );
                DispatchReport {
                    failed: 1,
                    ..Default::default()
                }
            }
        }
    }

    /// 以已解码的事件重新投递
    pub async fn redeliver(&self, record: &PublicationRecord, event: &E) -> DispatchReport {
        if record.is_completed() {
            return DispatchReport::default();
        }
        if self.deliver_record(record, event).await {
            DispatchReport {
                completed: 1,
                ..Default::default()
            }
        } else {
            DispatchReport {
                failed: 1,
                ..Default::default()
            }
        }
    }

    async fn invoke(&self, listener: &dyn EventListener<E>, event: &E) -> anyhow::Result<()> {
        match self.inner.listener_timeout {
            Some(limit) => tokio::time::timeout(limit, listener.on_event(event))
                .await
                .map_err(|_| anyhow::anyhow!("listener timed out after {limit:?}"))?,
            None => listener.on_event(event).await,
        }
    }

    /// 返回记录是否已完成
    async fn deliver_record(&self, record: &PublicationRecord, event: &E) -> bool {
        let Some(listener) = self.inner.registry.by_id(record.listener_id()) else {
            tracing::warn!(
                publication_id = %record.id(),
                listener_id = record.listener_id(),
                "no listener registered for publication"
            );
            return false;
        };

        if let Err(err) = self.invoke(listener.as_ref(), event).await {
            tracing::warn!(
                publication_id = %record.id(),
                listener_id = record.listener_id(),
                event_type = record.event_type(),
                error = %err,
                "listener failed, publication stays incomplete"
            );
            return false;
        }

        match self.inner.ledger.mark_complete(record.id()).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(
                    publication_id = %record.id(),
                    listener_id = record.listener_id(),
                    error = %err,
                    "failed to mark publication complete"
                );
                false
            }
        }
    }

    async fn signal(&self, event: &E) {
        for listener in self.inner.registry.matching(event.event_type()) {
            if let Err(err) = self.invoke(listener.as_ref(), event).await {
                tracing::warn!(
                    listener_id = listener.listener_id(),
                    event_type = event.event_type(),
                    error = %err,
                    "control signal listener failed"
                );
            }
        }
    }
}

/// 分发作用域：持有账本事务，记录待投递的发布
pub struct DispatchScope<L: PublicationLedger, E: RelayEvent> {
    dispatcher: Dispatcher<L, E>,
    tx: L::Transaction,
    publications: Vec<(PublicationRecord, E)>,
    signals: Vec<E>,
}

impl<L: PublicationLedger, E: RelayEvent> DispatchScope<L, E> {
    /// 为每个匹配的监听器写入一条发布记录，返回写入条数
    ///
    /// 标签不在 `E::EVENT_TYPES` 中的事件直接拒绝，否则入账后无法再解码重投。
    pub async fn publish(&mut self, event: &E) -> DomainResult<usize> {
        if !E::is_known_type(event.event_type()) {
            return Err(DomainError::UnknownEventType {
                event_type: event.event_type().to_string(),
            });
        }
        if event.is_control_signal() {
            self.signals.push(event.clone());
            return Ok(0);
        }

        let listeners = self.dispatcher.inner.registry.matching(event.event_type());
        if listeners.is_empty() {
            tracing::debug!(event_type = event.event_type(), "no listener for event");
            return Ok(0);
        }

        let published_at = self.dispatcher.inner.clock.now();
        for listener in &listeners {
            let record = PublicationRecord::for_listener(event, listener.listener_id(), published_at)?;
            self.tx.record(&record).await?;
            self.publications.push((record, event.clone()));
        }
        Ok(listeners.len())
    }

    /// 账本事务，业务写入应通过它与发布记录一起提交
    pub fn transaction(&mut self) -> &mut L::Transaction {
        &mut self.tx
    }

    pub async fn commit(self) -> DomainResult<CommittedDispatch<L, E>> {
        self.tx.commit().await?;
        tracing::debug!(recorded = self.publications.len(), "dispatch scope committed");
        Ok(CommittedDispatch {
            dispatcher: self.dispatcher,
            publications: self.publications,
            signals: self.signals,
        })
    }

    pub async fn rollback(self) -> DomainResult<()> {
        self.tx.rollback().await
    }
}

/// 已提交、尚未投递的分发
pub struct CommittedDispatch<L: PublicationLedger, E: RelayEvent> {
    dispatcher: Dispatcher<L, E>,
    publications: Vec<(PublicationRecord, E)>,
    signals: Vec<E>,
}

impl<L: PublicationLedger, E: RelayEvent> CommittedDispatch<L, E> {
    pub fn publication_ids(&self) -> Vec<PublicationId> {
        self.publications.iter().map(|(r, _)| r.id()).collect()
    }

    /// 调用监听器；失败不会向调用方传播
    pub async fn deliver(self) -> DispatchReport {
        let mut report = DispatchReport {
            recorded: self.publications.len(),
            ..Default::default()
        };

        for (record, event) in &self.publications {
            if self.dispatcher.deliver_record(record, event).await {
                report.completed += 1;
            } else {
                report.failed += 1;
            }
        }

        for signal in &self.signals {
            self.dispatcher.signal(signal).await;
        }

        report
    }
}
