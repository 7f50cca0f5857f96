mod common;

use common::{OrderEvent, Switchable};
use futures_util::TryStreamExt;
use relay_domain::clock::{ManualClock, SharedClock};
use relay_domain::config::DispatcherConfig;
use relay_domain::event::CorrelationKey;
use relay_domain::eventing::{CorrelationResubmitter, Dispatcher, HandledEventType};
use relay_domain::persist::{InMemoryLedger, PublicationLedger, PublicationLedgerExt, PublicationRecord};
use std::sync::Arc;

fn setup() -> (
    Arc<InMemoryLedger>,
    Arc<Switchable>,
    Dispatcher<InMemoryLedger, OrderEvent>,
) {
    let clock: SharedClock = Arc::new(ManualClock::default());
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
    let listener = Switchable::new("orders", HandledEventType::All);
    let dispatcher = Dispatcher::new(
        ledger.clone(),
        clock,
        &DispatcherConfig::default(),
        vec![listener.clone()],
    )
    .unwrap();
    (ledger, listener, dispatcher)
}

#[tokio::test]
async fn resubmits_only_the_failed_order() {
    let (ledger, listener, dispatcher) = setup();
    let resubmitter = CorrelationResubmitter::for_dispatcher(&dispatcher);

    listener.fail_for(1001);
    dispatcher
        .publish_all(vec![
            OrderEvent::OrderPlaced { order_id: 1001 },
            OrderEvent::OrderPlaced { order_id: 1002 },
        ])
        .await
        .unwrap();

    let records = ledger.snapshot().unwrap();
    let by_order = |order_id: i64| -> PublicationRecord {
        records
            .iter()
            .find(|r| r.decode::<OrderEvent>().unwrap() == OrderEvent::OrderPlaced { order_id })
            .cloned()
            .unwrap()
    };
    assert!(!by_order(1001).is_completed());
    assert!(by_order(1002).is_completed());

    listener.reset();
    let report = resubmitter.resubmit(&CorrelationKey::from(1002_i64)).await.unwrap();
    assert_eq!(report.completed + report.failed, 0);
    assert_eq!(listener.calls(), 0);

    listener.heal();
    let report = resubmitter.resubmit(&CorrelationKey::from(1001_i64)).await.unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(listener.seen(), vec![OrderEvent::OrderPlaced { order_id: 1001 }]);
    assert_eq!(ledger.count_incomplete().await.unwrap(), 0);
}

#[tokio::test]
async fn other_keys_are_untouched() {
    let (ledger, listener, dispatcher) = setup();
    let resubmitter = CorrelationResubmitter::for_dispatcher(&dispatcher);

    for order_id in [1, 2, 3] {
        listener.fail_for(order_id);
    }
    dispatcher
        .publish_all(vec![
            OrderEvent::OrderPlaced { order_id: 1 },
            OrderEvent::OrderShipped { order_id: 1 },
            OrderEvent::OrderPlaced { order_id: 2 },
            OrderEvent::OrderPlaced { order_id: 3 },
        ])
        .await
        .unwrap();
    assert_eq!(ledger.count_incomplete().await.unwrap(), 4);

    listener.heal();
    listener.reset();
    let report = resubmitter.resubmit(&CorrelationKey::from(1_i64)).await.unwrap();

    assert_eq!(report.completed, 2);
    assert_eq!(listener.calls(), 2);
    assert_eq!(ledger.count_incomplete().await.unwrap(), 2);

    let remaining: Vec<i64> = ledger
        .find_incomplete_matching(|_: &OrderEvent| true)
        .map_ok(|(_, event)| match event {
            OrderEvent::OrderPlaced { order_id }
            | OrderEvent::OrderShipped { order_id }
            | OrderEvent::Poke { order_id } => order_id,
        })
        .try_collect()
        .await
        .unwrap();
    assert_eq!(remaining, vec![2, 3]);
}

#[tokio::test]
async fn control_signal_drives_resubmission_without_a_record() {
    use async_trait::async_trait;
    use relay_domain::eventing::{EventListener, WeakDispatcher};

    struct ResubmitOnPoke {
        resubmitter: CorrelationResubmitter<InMemoryLedger, OrderEvent>,
    }

    #[async_trait]
    impl EventListener<OrderEvent> for ResubmitOnPoke {
        fn listener_id(&self) -> &str {
            "poke"
        }

        fn handled_event_type(&self) -> HandledEventType {
            HandledEventType::one("Poke")
        }

        async fn on_event(&self, event: &OrderEvent) -> anyhow::Result<()> {
            if let OrderEvent::Poke { order_id } = event {
                self.resubmitter.resubmit(&(*order_id).into()).await?;
            }
            Ok(())
        }
    }

    let clock: SharedClock = Arc::new(ManualClock::default());
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
    let orders = Switchable::new("orders", HandledEventType::one("OrderPlaced"));
    let listeners = orders.clone();
    let dispatcher = Dispatcher::new_cyclic(
        ledger.clone(),
        clock,
        &DispatcherConfig::default(),
        move |weak: &WeakDispatcher<InMemoryLedger, OrderEvent>| {
            vec![
                listeners as Arc<dyn EventListener<OrderEvent>>,
                Arc::new(ResubmitOnPoke {
                    resubmitter: CorrelationResubmitter::new(weak.clone()),
                }),
            ]
        },
    )
    .unwrap();

    orders.fail_for(42);
    dispatcher
        .publish(OrderEvent::OrderPlaced { order_id: 42 })
        .await
        .unwrap();
    assert_eq!(ledger.count_incomplete().await.unwrap(), 1);

    orders.heal();
    dispatcher.publish(OrderEvent::Poke { order_id: 42 }).await.unwrap();

    assert_eq!(ledger.count_incomplete().await.unwrap(), 0);
    assert_eq!(ledger.len().unwrap(), 1);
    assert_eq!(orders.calls(), 2);
}
