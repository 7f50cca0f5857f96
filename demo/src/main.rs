use anyhow::Context;
use async_trait::async_trait;
use relay_application::command::CommandBus;
use relay_application::context::AppContext;
use relay_application::query::QueryBus;
use relay_application::translation::{
    CountIncompletePublications, NotifierResponse, PartnerNotifier, RefetchTranslations,
    RequestTranslations, TranslationModule, TranslationRequest, TranslationUpdate, Translator,
};
use relay_application::{InMemoryCommandBus, InMemoryQueryBus};
use relay_domain::clock::{Clock, SharedClock, SystemClock};
use relay_domain::config::RelayConfig;
use relay_domain::eventing::{ResubmissionSweeper, RetentionSweeper, Schedule, SweepScheduler};
use relay_domain::persist::{InMemoryLedger, InMemoryLockStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 不调用真实模型：把原文包装成结构化输出
struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, prompt: &str) -> anyhow::Result<String> {
        let original = prompt
            .split("Original text: \"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .context("prompt without original text")?;
        Ok(format!(
            r#"{{"translatedText":"{}","sourceLanguage":"en","targetLanguage":"de","confidence":"medium"}}"#,
            original.to_uppercase()
        ))
    }
}

/// 前 N 次回写返回错误，之后成功
struct FlakyNotifier {
    failures_left: AtomicUsize,
}

#[async_trait]
impl PartnerNotifier for FlakyNotifier {
    async fn update_translation(&self, update: &TranslationUpdate) -> anyhow::Result<NotifierResponse> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Ok(NotifierResponse {
                error_list: vec![format!("partner unavailable for order {}", update.order_id)],
            });
        }
        tracing::info!(?update, "partner accepted translation");
        Ok(NotifierResponse::default())
    }
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

/// 未给出路径时使用默认配置；`load` 自带校验
fn load_config() -> anyhow::Result<RelayConfig> {
    match std::env::args().nth(1) {
        Some(path) => RelayConfig::load(&path).with_context(|| format!("loading {path}")),
        None => Ok(RelayConfig::default()),
    }
}

fn request(order_id: i64, value: &str) -> TranslationRequest {
    TranslationRequest {
        order_id,
        master_copy_key_id: order_id * 100,
        value: value.to_string(),
        source_locale: "en".to_string(),
        target_locale: "de".to_string(),
        user_id: "demo".to_string(),
    }
}

async fn report_backlog(queries: &InMemoryQueryBus) -> anyhow::Result<()> {
    let dto = queries
        .dispatch(&AppContext::default(), CountIncompletePublications)
        .await?;
    tracing::info!(incomplete = dto.incomplete, "publication backlog");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let config = load_config()?;

    let clock: SharedClock = SystemClock::shared();
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()).with_page_size(config.ledger.page_size));
    let locks = Arc::new(InMemoryLockStore::new());
    let seeded = Some(clock.now() - chrono::TimeDelta::days(2));
    locks.seed(config.retention.lock_name.clone(), seeded)?;
    locks.seed(config.resubmission.lock_name.clone(), seeded)?;

    let module = TranslationModule::new(
        ledger.clone(),
        clock.clone(),
        &config.dispatcher,
        Arc::new(FakeTranslator),
        Arc::new(FlakyNotifier {
            failures_left: AtomicUsize::new(1),
        }),
    )?;
    let commands = InMemoryCommandBus::new();
    let queries = InMemoryQueryBus::new();
    module.register(&commands, &queries)?;

    let ctx = AppContext::with_request_id("demo-1");
    commands
        .dispatch(
            &ctx,
            RequestTranslations {
                requests: vec![request(1001, "Red leather handbag"), request(1002, "Wool scarf")],
            },
        )
        .await?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    report_backlog(&queries).await?;

    // 第一次回写失败的订单，通过重新拉取补投
    commands
        .dispatch(&ctx, RefetchTranslations { order_id: 1001 })
        .await?;
    commands
        .dispatch(&ctx, RefetchTranslations { order_id: 1002 })
        .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    report_backlog(&queries).await?;

    let retention = Arc::new(RetentionSweeper::new(
        locks.clone(),
        ledger.clone(),
        clock.clone(),
        config.retention.clone(),
    ));
    let resubmission = Arc::new(ResubmissionSweeper::new(
        locks.clone(),
        module.dispatcher().clone(),
        config.resubmission.clone(),
    ));

    let handle = SweepScheduler::new(clock.clone())
        .schedule(Schedule::DailyAt(config.retention.run_at), retention)
        .schedule(Schedule::DailyAt(config.resubmission.run_at), resubmission)
        .start();

    tracing::info!("relay running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    handle.shutdown();
    handle.join().await;
    report_backlog(&queries).await?;
    Ok(())
}
