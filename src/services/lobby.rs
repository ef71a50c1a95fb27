use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::errors::{ClientError, ClientResult};
use crate::models::{normalize_session_code, Participant, Session};
use crate::names;
use crate::navigation::PhaseParams;
use crate::services::auth::AuthContext;
use crate::services::poller::{spawn_polling, PollHandle};
use crate::services::repository::SessionRepository;

/// Everything the play phase needs once the session has started.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayLaunch {
    pub code: String,
    pub quiz_id: i32,
    pub is_host: bool,
}

impl PlayLaunch {
    pub fn params(&self) -> PhaseParams {
        PhaseParams::play(&self.code, self.is_host)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyView {
    pub session: Session,
    pub participants: Vec<Participant>,
    pub is_host: bool,
    /// Present in the roster, and holding a team when the session uses teams.
    pub joined: bool,
    pub team: Option<String>,
}

impl LobbyView {
    pub fn can_start(&self) -> bool {
        self.is_host && !self.session.started
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LobbyState {
    Loading,
    Lobby(LobbyView),
    TeamSelection(LobbyView),
    Started(PlayLaunch),
}

impl LobbyState {
    pub fn view(&self) -> Option<&LobbyView> {
        match self {
            LobbyState::Lobby(view) | LobbyState::TeamSelection(view) => Some(view),
            LobbyState::Loading | LobbyState::Started(_) => None,
        }
    }
}

/// One poll's worth of server state.
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyObservation {
    Waiting {
        session: Session,
        /// `None` when the roster could not be fetched this time.
        participants: Option<Vec<Participant>>,
    },
    Started(Session),
}

/// Reduces poll observations into a [`LobbyState`] for one local user.
pub struct LobbyController {
    user_id: i32,
    state: LobbyState,
}

impl LobbyController {
    pub fn new(user_id: i32) -> Self {
        Self {
            user_id,
            state: LobbyState::Loading,
        }
    }

    pub fn state(&self) -> &LobbyState {
        &self.state
    }

    pub fn observe(&mut self, observation: ClientResult<LobbyObservation>) -> &LobbyState {
        if matches!(self.state, LobbyState::Started(_)) {
            return &self.state;
        }

        let observation = match observation {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!("lobby poll failed, keeping previous state: {e}");
                return &self.state;
            }
        };

        self.state = match observation {
            LobbyObservation::Started(session) => {
                tracing::info!("session {} started", session.code);
                LobbyState::Started(PlayLaunch {
                    is_host: session.is_host(self.user_id),
                    code: session.code,
                    quiz_id: session.quiz_id,
                })
            }
            LobbyObservation::Waiting {
                session,
                participants,
            } => {
                let participants = participants.unwrap_or_else(|| {
                    self.state
                        .view()
                        .map(|view| view.participants.clone())
                        .unwrap_or_default()
                });
                self.waiting(session, participants)
            }
        };

        &self.state
    }

    fn waiting(&self, session: Session, participants: Vec<Participant>) -> LobbyState {
        let local = participants.iter().find(|p| p.id == self.user_id);
        let team = local.and_then(|p| p.team.clone());
        let team_mode = session.is_team_mode();
        let joined = local.is_some() && (!team_mode || team.is_some());

        let view = LobbyView {
            is_host: session.is_host(self.user_id),
            session,
            participants,
            joined,
            team,
        };

        if team_mode && !view.joined {
            LobbyState::TeamSelection(view)
        } else {
            LobbyState::Lobby(view)
        }
    }
}

/// Fetches the session, and the roster only while the session is still waiting.
pub async fn observe_lobby<R: SessionRepository>(
    repo: &R,
    auth: &AuthContext,
    code: &str,
) -> ClientResult<LobbyObservation> {
    let session = repo.fetch_session(auth, code).await?;
    if session.started {
        return Ok(LobbyObservation::Started(session));
    }

    let participants = match repo.list_participants(auth, code).await {
        Ok(participants) => Some(participants),
        Err(e) => {
            tracing::warn!("could not update participant list for {code}: {e}");
            None
        }
    };

    Ok(LobbyObservation::Waiting {
        session,
        participants,
    })
}

// ---------------------------------------------------------------------------
// Lobby: a live, polled session lobby
// ---------------------------------------------------------------------------

pub struct Lobby<R: SessionRepository + 'static> {
    repo: Arc<R>,
    auth: AuthContext,
    code: String,
    state: watch::Receiver<LobbyState>,
    poll: Option<PollHandle>,
}

impl<R: SessionRepository + 'static> Lobby<R> {
    pub fn open(repo: Arc<R>, auth: AuthContext, code: String, every: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(LobbyState::Loading);
        let mut controller = LobbyController::new(auth.user_id());

        let fetch_repo = Arc::clone(&repo);
        let fetch_auth = auth.clone();
        let fetch_code = code.clone();

        let poll = spawn_polling(
            every,
            move || {
                let repo = Arc::clone(&fetch_repo);
                let auth = fetch_auth.clone();
                let code = fetch_code.clone();
                async move { observe_lobby(repo.as_ref(), &auth, &code).await }
            },
            move |observation| {
                let state = controller.observe(observation).clone();
                let started = matches!(state, LobbyState::Started(_));
                state_tx.send_if_modified(|current| {
                    if *current == state {
                        false
                    } else {
                        *current = state;
                        true
                    }
                });
                if started {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );

        tracing::info!("opened lobby for session {code}");
        Self {
            repo,
            auth,
            code,
            state: state_rx,
            poll: Some(poll),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> LobbyState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LobbyState> {
        self.state.clone()
    }

    fn current_view(&self) -> ClientResult<LobbyView> {
        match &*self.state.borrow() {
            LobbyState::Lobby(view) | LobbyState::TeamSelection(view) => Ok(view.clone()),
            LobbyState::Loading => Err(ClientError::input("the session is still loading")),
            LobbyState::Started(_) => Err(ClientError::input("the session has already started")),
        }
    }

    fn refresh(&self) {
        if let Some(poll) = &self.poll {
            poll.poke();
        }
    }

    /// Joins the session, with `team` when the session uses teams.
    pub async fn join_team(&self, team: Option<&str>) -> ClientResult<()> {
        let view = self.current_view()?;
        let session = &view.session;

        let team = if session.is_team_mode() {
            let choices = session.team_choices();
            let Some(team) = team.map(str::trim).filter(|t| !t.is_empty()) else {
                return Err(ClientError::input(if choices.is_empty() {
                    "Please select a team.".to_string()
                } else {
                    format!("Please select a team (1-{}).", session.num_teams)
                }));
            };
            if !choices.is_empty() && !choices.iter().any(|c| c == team) {
                return Err(ClientError::input(format!(
                    "Invalid team number. Choose 1-{}.",
                    session.num_teams
                )));
            }
            Some(team.to_string())
        } else {
            None
        };

        self.repo
            .join_session(&self.auth, &self.code, team.clone())
            .await?;
        tracing::info!(
            "user {} joined session {} (team={:?})",
            self.auth.user_id(),
            self.code,
            team
        );
        self.refresh();
        Ok(())
    }

    /// Asks the server to start the session; the lobby moves on only once a
    /// poll observes it.
    pub async fn start(&self) -> ClientResult<()> {
        let view = self.current_view()?;
        if !view.is_host {
            return Err(ClientError::NotHost("start the session"));
        }

        self.repo.start_session(&self.auth, &self.code).await?;
        tracing::info!("start requested for session {}", self.code);
        self.refresh();
        Ok(())
    }

    pub async fn invite(&self, recipient_id: i32) -> ClientResult<()> {
        let view = self.current_view()?;
        if !view.is_host {
            return Err(ClientError::NotHost("invite participants"));
        }

        self.repo
            .invite(&self.auth, &self.code, recipient_id)
            .await?;
        tracing::info!("invited user {recipient_id} to session {}", self.code);
        Ok(())
    }

    /// Resolves once a poll has observed the start; polling is stopped
    /// before the launch is returned.
    pub async fn wait_for_launch(&mut self) -> ClientResult<PlayLaunch> {
        let launch = loop {
            let started = match &*self.state.borrow_and_update() {
                LobbyState::Started(launch) => Some(launch.clone()),
                _ => None,
            };
            if let Some(launch) = started {
                break launch;
            }
            if self.state.changed().await.is_err() {
                return Err(ClientError::input("the lobby was closed"));
            }
        };

        if let Some(poll) = self.poll.take() {
            poll.stop().await;
        }
        Ok(launch)
    }

    pub async fn close(mut self) {
        if let Some(poll) = self.poll.take() {
            poll.stop().await;
        }
        tracing::info!("closed lobby for session {}", self.code);
    }
}

// ---------------------------------------------------------------------------
// LobbyService: hosting and opening lobbies
// ---------------------------------------------------------------------------

pub struct LobbyService<R: SessionRepository + 'static> {
    repo: Arc<R>,
    poll_every: Duration,
}

impl<R: SessionRepository + 'static> LobbyService<R> {
    pub fn new(repo: Arc<R>, poll_every: Duration) -> Self {
        Self { repo, poll_every }
    }

    /// Creates a session for `quiz_id` and returns its code.
    pub async fn host(&self, auth: &AuthContext, quiz_id: i32, num_teams: u32) -> ClientResult<String> {
        if num_teams < names::MIN_TEAM_COUNT {
            return Err(ClientError::input(
                "Number of teams must be a positive number (1 or more).",
            ));
        }

        let quiz = self.repo.fetch_quiz(auth, quiz_id).await?;
        if quiz.questions.is_empty() {
            return Err(ClientError::input("Cannot host a quiz with no questions."));
        }

        let code = self.repo.create_session(auth, quiz_id, num_teams).await?;
        let code = normalize_session_code(&code)
            .map_err(|_| ClientError::Malformed(format!("unexpected session code '{code}'")))?;

        tracing::info!(
            "session {code} created for quiz={quiz_id} with {num_teams} team(s) by user {}",
            auth.user_id()
        );
        Ok(code)
    }

    pub fn open(&self, auth: AuthContext, code: &str) -> ClientResult<Lobby<R>> {
        let code = normalize_session_code(code)?;
        Ok(Lobby::open(Arc::clone(&self.repo), auth, code, self.poll_every))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
