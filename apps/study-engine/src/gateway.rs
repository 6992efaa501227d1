//! Command gateway: the single writer in front of the card store.
//!
//! Callers hold cheap [`Engine`] clones. Every call becomes a [`Command`] on
//! a bounded channel; one worker thread owns the database connection, the
//! scheduler and the clock, and runs commands to completion in the order
//! they were sent.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::counters;
use crate::db::{CardRepository, CardScope, DbError, ReviewLogRepository, SqliteRepository};
use crate::error::{EngineError, Result};
use crate::scheduler::{IntervalPreview, Scheduler};
use chrono::{DateTime, Utc};
use srs_core::{
    ActivityEvent, Card, CardRef, CardType, DueCounts, Rating, ReviewLogEntry, ReviewOutcome,
    SectionScore,
};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests understood by the worker.
#[derive(Debug)]
enum Command {
    LoadProject {
        project_id: String,
        sections: Vec<String>,
        cards: Vec<CardRef>,
        reply: Reply<usize>,
    },
    PickNext {
        project_id: String,
        section_ids: Vec<String>,
        new_cap: u32,
        card_type: Option<CardType>,
        reply: Reply<Option<String>>,
    },
    Preview {
        card_id: String,
        reply: Reply<Vec<IntervalPreview>>,
    },
    Review {
        project_id: String,
        card: CardRef,
        rating: Rating,
        elapsed_ms: u64,
        reply: Reply<ReviewOutcome>,
    },
    Undo {
        reply: Reply<Option<String>>,
    },
    Suspend {
        card_id: String,
        reply: Reply<()>,
    },
    Unsuspend {
        card_id: String,
        reply: Reply<()>,
    },
    Bury {
        card_id: String,
        reply: Reply<()>,
    },
    UnburyAll {
        project_id: String,
        reply: Reply<usize>,
    },
    GetCard {
        card_id: String,
        reply: Reply<Option<Card>>,
    },
    CountDue {
        project_id: String,
        section_ids: Vec<String>,
        reply: Reply<DueCounts>,
    },
    UpdateScore {
        project_id: String,
        section_id: String,
        correct: bool,
        reply: Reply<SectionScore>,
    },
    ResetSection {
        project_id: String,
        section_id: String,
        reply: Reply<usize>,
    },
    Scores {
        project_id: String,
        reply: Reply<Vec<SectionScore>>,
    },
    ReviewLog {
        project_id: String,
        limit: usize,
        reply: Reply<Vec<ReviewLogEntry>>,
    },
    AddActivity {
        project_id: String,
        section_id: Option<String>,
        rating: Rating,
        reply: Reply<ActivityEvent>,
    },
    Activity {
        project_id: String,
        limit: usize,
        reply: Reply<Vec<ActivityEvent>>,
    },
    ClearActivity {
        project_id: String,
        reply: Reply<usize>,
    },
    ActivityScore {
        project_id: String,
        section_id: Option<String>,
        reply: Reply<f64>,
    },
    SetRetention {
        project_id: String,
        retention: f64,
        reply: Reply<()>,
    },
    Retention {
        project_id: String,
        reply: Reply<f64>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Handle to the study engine.
#[derive(Debug, Clone)]
pub struct Engine {
    sender: mpsc::Sender<Command>,
}

impl Engine {
    /// Open (or create) the database at `config.db_path`.
    ///
    /// Migrations run before this returns; if they fail, the error is
    /// returned and no worker is left running.
    pub async fn open<C: Clock>(config: EngineConfig, clock: C) -> Result<Self> {
        let path = config.db_path.clone();
        info!(path = %path.display(), "opening study database");
        Self::spawn(config, clock, move || SqliteRepository::open(&path)).await
    }

    /// Engine over a private in-memory database.
    pub async fn open_in_memory<C: Clock>(config: EngineConfig, clock: C) -> Result<Self> {
        Self::spawn(config, clock, SqliteRepository::open_in_memory).await
    }

    async fn spawn<C, F>(config: EngineConfig, clock: C, open: F) -> Result<Self>
    where
        C: Clock,
        F: FnOnce() -> std::result::Result<SqliteRepository, DbError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.queue_depth.max(1));
        let (ready_tx, ready_rx) = oneshot::channel();

        thread::Builder::new()
            .name("study-engine".to_string())
            .spawn(move || match Worker::start(open, &config, clock) {
                Ok(worker) => {
                    let _ = ready_tx.send(Ok(()));
                    worker.run(receiver);
                }
                Err(e) => {
                    error!(error = %e, "engine failed to start");
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| {
                error!(error = %e, "failed to spawn engine worker");
                EngineError::Unavailable
            })?;

        ready_rx.await.map_err(|_| EngineError::Unavailable)??;
        Ok(Self { sender })
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| EngineError::Unavailable)?;
        response.await.map_err(|_| EngineError::Unavailable)?
    }

    /// Stop the worker once every command queued before this one has run.
    pub async fn shutdown(&self) -> Result<()> {
        let (done, stopped) = oneshot::channel();
        self.sender
            .send(Command::Shutdown { done })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        stopped.await.map_err(|_| EngineError::Unavailable)
    }

    pub async fn load_project(
        &self,
        project_id: &str,
        sections: &[String],
        cards: Vec<CardRef>,
    ) -> Result<usize> {
        self.request(|reply| Command::LoadProject {
            project_id: project_id.to_string(),
            sections: sections.to_vec(),
            cards,
            reply,
        })
        .await
    }

    pub async fn pick_next(
        &self,
        project_id: &str,
        section_ids: &[String],
        new_cap: u32,
        card_type: Option<CardType>,
    ) -> Result<Option<String>> {
        self.request(|reply| Command::PickNext {
            project_id: project_id.to_string(),
            section_ids: section_ids.to_vec(),
            new_cap,
            card_type,
            reply,
        })
        .await
    }

    pub async fn preview(&self, card_id: &str) -> Result<Vec<IntervalPreview>> {
        self.request(|reply| Command::Preview {
            card_id: card_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn review(
        &self,
        project_id: &str,
        card: CardRef,
        rating: Rating,
        elapsed_ms: u64,
    ) -> Result<ReviewOutcome> {
        self.request(|reply| Command::Review {
            project_id: project_id.to_string(),
            card,
            rating,
            elapsed_ms,
            reply,
        })
        .await
    }

    pub async fn undo(&self) -> Result<Option<String>> {
        self.request(|reply| Command::Undo { reply }).await
    }

    pub async fn suspend(&self, card_id: &str) -> Result<()> {
        self.request(|reply| Command::Suspend {
            card_id: card_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn unsuspend(&self, card_id: &str) -> Result<()> {
        self.request(|reply| Command::Unsuspend {
            card_id: card_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn bury(&self, card_id: &str) -> Result<()> {
        self.request(|reply| Command::Bury {
            card_id: card_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn unbury_all(&self, project_id: &str) -> Result<usize> {
        self.request(|reply| Command::UnburyAll {
            project_id: project_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Option<Card>> {
        self.request(|reply| Command::GetCard {
            card_id: card_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn count_due(&self, project_id: &str, section_ids: &[String]) -> Result<DueCounts> {
        self.request(|reply| Command::CountDue {
            project_id: project_id.to_string(),
            section_ids: section_ids.to_vec(),
            reply,
        })
        .await
    }

    pub async fn update_score(
        &self,
        project_id: &str,
        section_id: &str,
        correct: bool,
    ) -> Result<SectionScore> {
        self.request(|reply| Command::UpdateScore {
            project_id: project_id.to_string(),
            section_id: section_id.to_string(),
            correct,
            reply,
        })
        .await
    }

    /// Delete a section's cards and zero its score. Returns cards deleted.
    pub async fn reset_section(&self, project_id: &str, section_id: &str) -> Result<usize> {
        self.request(|reply| Command::ResetSection {
            project_id: project_id.to_string(),
            section_id: section_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn scores(&self, project_id: &str) -> Result<Vec<SectionScore>> {
        self.request(|reply| Command::Scores {
            project_id: project_id.to_string(),
            reply,
        })
        .await
    }

    /// Most recent review log entries, newest first.
    pub async fn review_log(&self, project_id: &str, limit: usize) -> Result<Vec<ReviewLogEntry>> {
        self.request(|reply| Command::ReviewLog {
            project_id: project_id.to_string(),
            limit,
            reply,
        })
        .await
    }

    pub async fn add_activity(
        &self,
        project_id: &str,
        section_id: Option<&str>,
        rating: Rating,
    ) -> Result<ActivityEvent> {
        self.request(|reply| Command::AddActivity {
            project_id: project_id.to_string(),
            section_id: section_id.map(str::to_string),
            rating,
            reply,
        })
        .await
    }

    pub async fn activity(&self, project_id: &str, limit: usize) -> Result<Vec<ActivityEvent>> {
        self.request(|reply| Command::Activity {
            project_id: project_id.to_string(),
            limit,
            reply,
        })
        .await
    }

    pub async fn clear_activity(&self, project_id: &str) -> Result<usize> {
        self.request(|reply| Command::ClearActivity {
            project_id: project_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn activity_score(&self, project_id: &str, section_id: Option<&str>) -> Result<f64> {
        self.request(|reply| Command::ActivityScore {
            project_id: project_id.to_string(),
            section_id: section_id.map(str::to_string),
            reply,
        })
        .await
    }

    pub async fn set_retention(&self, project_id: &str, retention: f64) -> Result<()> {
        self.request(|reply| Command::SetRetention {
            project_id: project_id.to_string(),
            retention,
            reply,
        })
        .await
    }

    pub async fn retention(&self, project_id: &str) -> Result<f64> {
        self.request(|reply| Command::Retention {
            project_id: project_id.to_string(),
            reply,
        })
        .await
    }
}

/// State owned by the worker thread.
struct Worker<C> {
    repo: SqliteRepository,
    scheduler: Scheduler,
    clock: C,
    activity_cap: usize,
}

impl<C: Clock> Worker<C> {
    fn start<F>(open: F, config: &EngineConfig, clock: C) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<SqliteRepository, DbError>,
    {
        let repo = open()?;
        let mut scheduler = Scheduler::new(config);
        scheduler.restore(&repo)?;
        info!(
            model = scheduler.model_name(),
            leech_threshold = config.leech_threshold,
            "engine ready"
        );

        Ok(Self {
            repo,
            scheduler,
            clock,
            activity_cap: config.activity_cap,
        })
    }

    fn run(mut self, mut receiver: mpsc::Receiver<Command>) {
        while let Some(command) = receiver.blocking_recv() {
            if let Command::Shutdown { done } = command {
                receiver.close();
                drop(self);
                info!("engine stopped");
                let _ = done.send(());
                return;
            }
            self.handle(command);
        }
        info!("engine stopped: all handles dropped");
    }

    /// Current time, after rolling the study day over if it changed.
    fn begin(&mut self) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        self.scheduler.roll_day(&self.repo, now)?;
        Ok(now)
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::LoadProject {
                project_id,
                sections,
                cards,
                reply,
            } => {
                let result = self.begin().and_then(|now| {
                    self.scheduler
                        .load_project(&self.repo, &project_id, &sections, &cards, now)
                });
                respond(reply, result);
            }
            Command::PickNext {
                project_id,
                section_ids,
                new_cap,
                card_type,
                reply,
            } => {
                let result = self.begin().and_then(|now| {
                    let scope = CardScope::new(&project_id, &section_ids).with_card_type(card_type);
                    self.scheduler.pick_next(&self.repo, &scope, new_cap, now)
                });
                respond(reply, result);
            }
            Command::Preview { card_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|now| self.scheduler.preview(&self.repo, &card_id, now));
                respond(reply, result);
            }
            Command::Review {
                project_id,
                card,
                rating,
                elapsed_ms,
                reply,
            } => {
                let result = self.begin().and_then(|now| {
                    self.scheduler
                        .review(&self.repo, &project_id, &card, rating, elapsed_ms, now)
                });
                respond(reply, result);
            }
            Command::Undo { reply } => {
                let result = self.begin().and_then(|_| self.scheduler.undo(&self.repo));
                respond(reply, result);
            }
            Command::Suspend { card_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| self.scheduler.suspend(&self.repo, &card_id));
                respond(reply, result);
            }
            Command::Unsuspend { card_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| self.scheduler.unsuspend(&self.repo, &card_id));
                respond(reply, result);
            }
            Command::Bury { card_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| self.scheduler.bury(&self.repo, &card_id));
                respond(reply, result);
            }
            Command::UnburyAll { project_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| self.scheduler.unbury_all(&self.repo, &project_id));
                respond(reply, result);
            }
            Command::GetCard { card_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| Ok(self.repo.get_card(&card_id)?));
                respond(reply, result);
            }
            Command::CountDue {
                project_id,
                section_ids,
                reply,
            } => {
                let result = self.begin().and_then(|now| {
                    let scope = CardScope::new(&project_id, &section_ids);
                    counters::count_due(&self.repo, &scope, now)
                });
                respond(reply, result);
            }
            Command::UpdateScore {
                project_id,
                section_id,
                correct,
                reply,
            } => {
                let result = self.begin().and_then(|_| {
                    counters::update_score(&self.repo, &project_id, &section_id, correct)
                });
                respond(reply, result);
            }
            Command::ResetSection {
                project_id,
                section_id,
                reply,
            } => {
                let result = self
                    .begin()
                    .and_then(|_| counters::reset_section(&self.repo, &project_id, &section_id));
                respond(reply, result);
            }
            Command::Scores { project_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| counters::scores(&self.repo, &project_id));
                respond(reply, result);
            }
            Command::ReviewLog {
                project_id,
                limit,
                reply,
            } => {
                let result = self
                    .begin()
                    .and_then(|_| Ok(self.repo.review_log(&project_id, limit)?));
                respond(reply, result);
            }
            Command::AddActivity {
                project_id,
                section_id,
                rating,
                reply,
            } => {
                let cap = self.activity_cap;
                let result = self.begin().and_then(|now| {
                    counters::add_activity(
                        &self.repo,
                        &project_id,
                        section_id.as_deref(),
                        rating,
                        cap,
                        now,
                    )
                });
                respond(reply, result);
            }
            Command::Activity {
                project_id,
                limit,
                reply,
            } => {
                let result = self
                    .begin()
                    .and_then(|_| counters::activity(&self.repo, &project_id, limit));
                respond(reply, result);
            }
            Command::ClearActivity { project_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| counters::clear_activity(&self.repo, &project_id));
                respond(reply, result);
            }
            Command::ActivityScore {
                project_id,
                section_id,
                reply,
            } => {
                let cap = self.activity_cap;
                let result = self.begin().and_then(|now| {
                    counters::activity_score(&self.repo, &project_id, section_id.as_deref(), cap, now)
                });
                respond(reply, result);
            }
            Command::SetRetention {
                project_id,
                retention,
                reply,
            } => {
                let result = self.begin().and_then(|_| {
                    self.scheduler
                        .set_retention(&self.repo, &project_id, retention)
                });
                respond(reply, result);
            }
            Command::Retention { project_id, reply } => {
                let result = self
                    .begin()
                    .and_then(|_| self.scheduler.retention(&self.repo, &project_id));
                respond(reply, result);
            }
            Command::Shutdown { done } => {
                let _ = done.send(());
            }
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T>) {
    if reply.send(result).is_err() {
        debug!("caller went away before the reply was sent");
    }
}
