use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::errors::{ClientError, ClientResult};
use crate::grading::{Answer, Outcome};
use crate::models::Question;
use crate::names;
use crate::services::auth::AuthContext;
use crate::services::repository::SessionRepository;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayMode {
    /// Practice run; can be retried.
    Standalone,
    /// Linked to a live session; played once, score submitted at the end.
    Session { code: String },
}

/// Result of the single advance transition for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub question: usize,
    pub outcome: Outcome,
    pub score: u32,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub number: usize,
    pub question: String,
    pub outcome: Outcome,
    pub correct_answer: String,
    /// Only for questions that were not answered correctly.
    pub your_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub score: u32,
    pub total: usize,
    pub lines: Vec<ReportLine>,
    pub can_retry: bool,
    pub results_url: Option<String>,
}

// ---------------------------------------------------------------------------
// PlayEngine: timed question sequence for one player
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PlayEngine {
    questions: Vec<Question>,
    mode: PlayMode,
    time_limit: u32,
    index: usize,
    time_left: u32,
    score: u32,
    answers: Vec<Option<Answer>>,
    history: Vec<Outcome>,
    finished: bool,
}

impl PlayEngine {
    pub fn new(questions: Vec<Question>, time_limit: u32, mode: PlayMode) -> ClientResult<Self> {
        if questions.is_empty() {
            return Err(ClientError::Malformed("quiz has no questions".to_string()));
        }
        if time_limit == 0 {
            return Err(ClientError::input("question time limit must be at least 1"));
        }

        let answers = vec![None; questions.len()];
        Ok(Self {
            questions,
            mode,
            time_limit,
            index: 0,
            time_left: time_limit,
            score: 0,
            answers,
            history: Vec::new(),
            finished: false,
        })
    }

    pub fn mode(&self) -> &PlayMode {
        &self.mode
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.questions.len()
    }

    pub fn current(&self) -> Option<&Question> {
        if self.finished {
            None
        } else {
            self.questions.get(self.index)
        }
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn history(&self) -> &[Outcome] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// What the player explicitly recorded for the current question.
    pub fn recorded_answer(&self) -> Option<&Answer> {
        if self.finished {
            return None;
        }
        self.answers[self.index].as_ref()
    }

    /// Recorded answer, or the question's default when nothing was recorded.
    pub fn effective_answer(&self) -> Option<Answer> {
        let question = self.current()?;
        self.recorded_answer()
            .cloned()
            .or_else(|| question.default_answer())
    }

    fn has_answer(&self) -> bool {
        match self.effective_answer() {
            Some(Answer::Text(text)) => !text.is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    /// "Next" is blocked only while time remains and nothing is answered.
    pub fn can_advance(&self) -> bool {
        !self.finished && (self.has_answer() || self.time_left == 0)
    }

    pub fn record(&mut self, answer: Answer) -> ClientResult<()> {
        let Some(question) = self.current() else {
            return Err(ClientError::input("the quiz is over"));
        };
        if self.time_left == 0 {
            return Err(ClientError::input("time is up for this question"));
        }
        question.check_answer(&answer)?;

        self.answers[self.index] = Some(answer);
        Ok(())
    }

    /// Manual "next".
    pub fn next(&mut self) -> ClientResult<Advance> {
        if self.finished {
            return Err(ClientError::input("the quiz is over"));
        }
        if !self.can_advance() {
            return Err(ClientError::input("Select an answer or wait for the timer."));
        }
        let question = self.index;
        self.advance(question)
            .ok_or_else(|| ClientError::input("question already advanced"))
    }

    /// One countdown unit elapsed; advances by itself when the count hits zero.
    pub fn tick(&mut self) -> Option<Advance> {
        if self.finished {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            let question = self.index;
            self.advance(question)
        } else {
            None
        }
    }

    /// The only transition that grades. Runs at most once per question: a
    /// stale `question` (already advanced past) is ignored.
    fn advance(&mut self, question: usize) -> Option<Advance> {
        if self.finished || question != self.index {
            return None;
        }

        let submitted = self.effective_answer();
        let outcome = self.questions[question].grade(submitted.as_ref());
        self.answers[question] = submitted;
        self.history.push(outcome);
        if outcome.is_correct() {
            self.score += 1;
        }

        self.time_left = self.time_limit;
        if self.is_last() {
            self.finished = true;
        } else {
            self.index += 1;
        }

        Some(Advance {
            question,
            outcome,
            score: self.score,
            finished: self.finished,
        })
    }

    pub fn report(&self) -> Option<Report> {
        if !self.finished {
            return None;
        }

        let lines = self
            .questions
            .iter()
            .zip(&self.history)
            .zip(&self.answers)
            .enumerate()
            .map(|(idx, ((question, outcome), answer))| ReportLine {
                number: idx + 1,
                question: question.text().to_string(),
                outcome: *outcome,
                correct_answer: question.correct_display(),
                your_answer: (!outcome.is_correct())
                    .then(|| question.answer_display(answer.as_ref())),
            })
            .collect();

        let results_url = match &self.mode {
            PlayMode::Session { code } => Some(names::results_page_url(code)),
            PlayMode::Standalone => None,
        };

        Some(Report {
            score: self.score,
            total: self.questions.len(),
            lines,
            can_retry: self.mode == PlayMode::Standalone,
            results_url,
        })
    }

    /// Standalone only: back to the first question with a clean slate.
    pub fn retry(&mut self) -> ClientResult<()> {
        if let PlayMode::Session { .. } = self.mode {
            return Err(ClientError::input(
                "a session can only be played once; see the results instead",
            ));
        }

        self.index = 0;
        self.score = 0;
        self.time_left = self.time_limit;
        self.answers = vec![None; self.questions.len()];
        self.history.clear();
        self.finished = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlayRunner: drives a PlayEngine with a countdown and player input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PlayInput {
    Answer(Answer),
    Next,
    Retry,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayEvent {
    Question {
        index: usize,
        total: usize,
        question: Question,
        time_left: u32,
    },
    Tick {
        time_left: u32,
    },
    Recorded(Answer),
    Rejected(String),
    Advanced(Advance),
    Finished(Report),
}

pub struct PlayOutcome {
    /// `None` when the player quit before the last question.
    pub report: Option<Report>,
    /// Background score submission, if one was started.
    pub submission: Option<JoinHandle<()>>,
}

pub struct PlayRunner<R: SessionRepository + 'static> {
    repo: Arc<R>,
    auth: AuthContext,
    tick: Duration,
    time_limit: u32,
}

impl<R: SessionRepository + 'static> PlayRunner<R> {
    pub fn new(repo: Arc<R>, auth: AuthContext, tick: Duration, time_limit: u32) -> Self {
        Self {
            repo,
            auth,
            tick,
            time_limit,
        }
    }

    /// Fetches the quiz; any failure here ends the play view.
    pub async fn load(&self, quiz_id: i32, mode: PlayMode) -> ClientResult<PlayEngine> {
        let quiz = self.repo.fetch_quiz(&self.auth, quiz_id).await.map_err(|e| {
            tracing::error!("could not load quiz {quiz_id}: {e}");
            e
        })?;
        tracing::info!(
            "loaded quiz '{}' ({} questions) in {:?} mode",
            quiz.name,
            quiz.questions.len(),
            mode
        );
        PlayEngine::new(quiz.questions, self.time_limit, mode)
    }

    fn submit_in_background(&self, code: String, score: u32) -> JoinHandle<()> {
        let repo = Arc::clone(&self.repo);
        let auth = self.auth.clone();
        tokio::spawn(async move {
            match repo.submit_score(&auth, &code, score).await {
                Ok(()) => tracing::info!("submitted score {score} for session {code}"),
                Err(e) => tracing::error!("could not submit score for session {code}: {e}"),
            }
        })
    }

    pub async fn run(
        &self,
        mut engine: PlayEngine,
        mut inputs: mpsc::Receiver<PlayInput>,
        events: mpsc::UnboundedSender<PlayEvent>,
    ) -> PlayOutcome {
        let emit = |event: PlayEvent| {
            let _ = events.send(event);
        };
        let show_question = |engine: &PlayEngine| {
            if let Some(question) = engine.current() {
                emit(PlayEvent::Question {
                    index: engine.index(),
                    total: engine.total(),
                    question: question.clone(),
                    time_left: engine.time_left(),
                });
            }
        };

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut submission = None;

        show_question(&engine);

        loop {
            if engine.is_finished() {
                match inputs.recv().await {
                    Some(PlayInput::Retry) => match engine.retry() {
                        Ok(()) => {
                            ticker.reset();
                            show_question(&engine);
                        }
                        Err(e) => emit(PlayEvent::Rejected(e.to_string())),
                    },
                    Some(PlayInput::Quit) | None => break,
                    Some(_) => emit(PlayEvent::Rejected("the quiz is over".to_string())),
                }
                continue;
            }

            let advance = tokio::select! {
                _ = ticker.tick() => {
                    let advance = engine.tick();
                    if advance.is_none() {
                        emit(PlayEvent::Tick { time_left: engine.time_left() });
                    }
                    advance
                }
                input = inputs.recv() => match input {
                    None | Some(PlayInput::Quit) => break,
                    Some(PlayInput::Answer(answer)) => {
                        match engine.record(answer.clone()) {
                            Ok(()) => emit(PlayEvent::Recorded(answer)),
                            Err(e) => emit(PlayEvent::Rejected(e.to_string())),
                        }
                        None
                    }
                    Some(PlayInput::Next) => {
                        if engine.can_advance() {
                            // old countdown is dropped before grading
                            ticker.reset();
                        }
                        match engine.next() {
                            Ok(advance) => Some(advance),
                            Err(e) => {
                                emit(PlayEvent::Rejected(e.to_string()));
                                None
                            }
                        }
                    }
                    Some(PlayInput::Retry) => {
                        emit(PlayEvent::Rejected("finish the quiz before retrying".to_string()));
                        None
                    }
                },
            };

            let Some(advance) = advance else {
                continue;
            };
            ticker.reset();
            emit(PlayEvent::Advanced(advance.clone()));

            if !advance.finished {
                show_question(&engine);
                continue;
            }

            if let PlayMode::Session { code } = engine.mode() {
                submission = Some(self.submit_in_background(code.clone(), engine.score()));
            }
            if let Some(report) = engine.report() {
                emit(PlayEvent::Finished(report));
            }
        }

        PlayOutcome {
            report: engine.report(),
            submission,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
