//! 清扫调度器（SweepScheduler）
//!
//! 进程内定时器：按固定间隔或每日固定时刻（UTC）触发 `ScheduledTask`，
//! 通过 `SchedulerHandle` 关闭与等待。跨实例的互斥由任务自身的锁表保证。
//!
use super::sweeper::ScheduledTask;
use crate::clock::SharedClock;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// 固定间隔，首次触发在一个间隔之后
    Every(Duration),
    /// 每日固定时刻（UTC）
    DailyAt(NaiveTime),
}

impl Schedule {
    /// 严格晚于 `now` 的下一次触发时刻
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Every(period) => TimeDelta::from_std(period)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            Schedule::DailyAt(at) => {
                let today = now.date_naive().and_time(at).and_utc();
                if today > now {
                    today
                } else {
                    today + TimeDelta::days(1)
                }
            }
        }
    }

    /// 从 `now` 到下一次触发的等待时长
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or_default()
    }
}

pub struct SweepScheduler {
    clock: SharedClock,
    entries: Vec<(Schedule, Arc<dyn ScheduledTask>)>,
}

impl SweepScheduler {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            entries: Vec::new(),
        }
    }

    pub fn schedule(mut self, schedule: Schedule, task: Arc<dyn ScheduledTask>) -> Self {
        self.entries.push((schedule, task));
        self
    }

    /// 每个条目一个长驻任务
    pub fn start(self) -> SchedulerHandle {
        let token = CancellationToken::new();
        let tasks = self
            .entries
            .into_iter()
            .map(|(schedule, task)| {
                tracing::info!(task = task.name(), ?schedule, "scheduling task");
                match schedule {
                    Schedule::Every(period) => Self::spawn_periodic(token.clone(), period, task),
                    Schedule::DailyAt(_) => {
                        Self::spawn_daily(token.clone(), self.clock.clone(), schedule, task)
                    }
                }
            })
            .collect();

        SchedulerHandle { token, tasks }
    }

    fn spawn_periodic(
        token: CancellationToken,
        period: Duration,
        task: Arc<dyn ScheduledTask>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = period.max(Duration::from_millis(1));
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => run_task(task.as_ref()).await,
                }
            }
        })
    }

    fn spawn_daily(
        token: CancellationToken,
        clock: SharedClock,
        schedule: Schedule,
        task: Arc<dyn ScheduledTask>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let delay = schedule.delay_from(clock.now());
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = time::sleep(delay) => run_task(task.as_ref()).await,
                }
            }
        })
    }
}

async fn run_task(task: &dyn ScheduledTask) {
    if let Err(err) = task.run().await {
        tracing::error!(task = task.name(), error = %err, "scheduled task failed");
    }
}

/// 调度器运行句柄：用于优雅关闭与等待任务结束
pub struct SchedulerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use crate::error::DomainResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl ScheduledTask for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn run(&self) -> DomainResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn daily_next_occurrence_is_strictly_after_now() {
        let schedule = Schedule::DailyAt(at(17, 30));

        let before = Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(before),
            Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap();
        assert_eq!(
            schedule.next_after(exactly),
            Utc.with_ymd_and_hms(2024, 3, 2, 17, 30, 0).unwrap()
        );

        let after = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(after),
            Utc.with_ymd_and_hms(2025, 1, 1, 17, 30, 0).unwrap()
        );
    }

    #[test]
    fn every_adds_the_period() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let schedule = Schedule::Every(Duration::from_secs(90));
        assert_eq!(schedule.delay_from(now), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn every_runs_repeatedly_until_shutdown() {
        let counter = Arc::new(Counter::default());
        let handle = SweepScheduler::new(SystemClock::shared())
            .schedule(Schedule::Every(Duration::from_secs(10)), counter.clone())
            .start();

        time::sleep(Duration::from_secs(35)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 3);

        handle.shutdown();
        handle.join().await;
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn daily_waits_for_the_wall_clock_time() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 17, 29, 0).unwrap());
        let counter = Arc::new(Counter::default());
        let handle = SweepScheduler::new(Arc::new(clock.clone()))
            .schedule(Schedule::DailyAt(at(17, 30)), counter.clone())
            .start();

        time::sleep(Duration::from_secs(59)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 0);

        // 触发后墙钟前进到次日之前，下一次等待约 24 小时
        clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap());
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);

        drop(handle);
    }
}
