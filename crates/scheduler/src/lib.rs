//! Periodic task runner for the engine's batch jobs.
//!
//! Each job is wrapped in an explicit [`Task`] with a name and a cadence.
//! [`Scheduler::spawn`] drives every task on a tokio interval until
//! [`Scheduler::shutdown`] is called; tasks are also runnable directly with
//! a chosen date, which is how the tests exercise them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use engine::{Engine, EngineError};
use tokio::sync::watch;
use tokio::task::JoinSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    Hourly,
    Daily,
}

impl Cadence {
    pub fn period(self) -> Duration {
        match self {
            Cadence::Hourly => Duration::from_secs(60 * 60),
            Cadence::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<u32, EngineError>> + Send>>;
type TaskFn = Box<dyn Fn(NaiveDate) -> TaskFuture + Send + Sync>;

/// A named batch job. `run` takes the date the invocation is for, so a
/// caller can drive a task for any day.
pub struct Task {
    pub name: &'static str,
    pub cadence: Cadence,
    run: TaskFn,
}

impl Task {
    pub async fn run(&self, today: NaiveDate) -> Result<u32, EngineError> {
        (self.run)(today).await
    }
}

/// The five batch jobs over a shared engine.
pub fn tasks(engine: Arc<Engine>) -> Vec<Task> {
    let regenerate = engine.clone();
    let retry = engine.clone();
    let activate = engine.clone();
    let rollover = engine.clone();
    let remind = engine;

    vec![
        Task {
            name: "regenerate-recurring",
            cadence: Cadence::Daily,
            run: Box::new(move |today| {
                let engine = regenerate.clone();
                Box::pin(async move { engine.regenerate_recurring(today).await })
            }),
        },
        Task {
            name: "retry-pending",
            cadence: Cadence::Hourly,
            run: Box::new(move |_today| {
                let engine = retry.clone();
                Box::pin(async move { engine.retry_pending().await })
            }),
        },
        Task {
            name: "activate-scheduled",
            cadence: Cadence::Daily,
            run: Box::new(move |today| {
                let engine = activate.clone();
                Box::pin(async move { engine.activate_scheduled(today).await })
            }),
        },
        Task {
            name: "rollover-budgets",
            cadence: Cadence::Daily,
            run: Box::new(move |today| {
                let engine = rollover.clone();
                Box::pin(async move { engine.rollover_budgets(today).await })
            }),
        },
        Task {
            name: "remind-goal-deadlines",
            cadence: Cadence::Daily,
            run: Box::new(move |today| {
                let engine = remind.clone();
                Box::pin(async move { engine.remind_goal_deadlines(today).await })
            }),
        },
    ]
}

pub struct Scheduler {
    workers: JoinSet<()>,
    stop: watch::Sender<bool>,
}

impl Scheduler {
    /// Spawn one worker per task. Every worker waits a full period before
    /// its first run and keeps running until [`Scheduler::shutdown`].
    pub fn spawn(engine: Arc<Engine>) -> Scheduler {
        let (stop, _) = watch::channel(false);
        let mut workers = JoinSet::new();

        for task in tasks(engine) {
            let mut stopped = stop.subscribe();
            workers.spawn(async move {
                let mut interval = tokio::time::interval(task.cadence.period());
                // The first tick completes immediately; skip it so the task
                // first fires one full period from startup.
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let today = Utc::now().date_naive();
                            match task.run(today).await {
                                Ok(0) => {}
                                Ok(n) => {
                                    tracing::info!("task {} touched {n} records", task.name);
                                }
                                Err(err) => {
                                    tracing::error!("task {} failed: {err}", task.name);
                                }
                            }
                        }
                        _ = stopped.changed() => break,
                    }
                }
            });
        }

        Scheduler { workers, stop }
    }

    /// Stop all workers and wait for them to finish.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        while self.workers.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::builder().build())
    }

    #[test]
    fn five_tasks_with_expected_cadences() {
        let tasks = tasks(engine());
        let names: Vec<_> = tasks.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "regenerate-recurring",
                "retry-pending",
                "activate-scheduled",
                "rollover-budgets",
                "remind-goal-deadlines",
            ]
        );

        let hourly: Vec<_> = tasks
            .iter()
            .filter(|t| t.cadence == Cadence::Hourly)
            .map(|t| t.name)
            .collect();
        assert_eq!(hourly, vec!["retry-pending"]);
    }

    #[test]
    fn cadence_periods() {
        assert_eq!(Cadence::Hourly.period(), Duration::from_secs(3600));
        assert_eq!(Cadence::Daily.period(), Duration::from_secs(86400));
    }

    #[tokio::test]
    async fn shutdown_stops_workers() {
        let scheduler = Scheduler::spawn(engine());
        scheduler.shutdown().await;
    }
}
