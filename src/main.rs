use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use quizinart_live::grading::Answer;
use quizinart_live::models::Question;
use quizinart_live::names;
use quizinart_live::navigation::{Phase, PhaseParams};
use quizinart_live::services::auth::{AuthContext, AuthService, LoginOutcome};
use quizinart_live::services::lobby::{LobbyService, LobbyState, PlayLaunch};
use quizinart_live::services::play::{PlayEvent, PlayInput, PlayMode, PlayRunner};
use quizinart_live::services::results::ResultsService;
use quizinart_live::{views, ClientConfig, HttpClient};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Quiz server base URL.
    #[arg(long, env = "QUIZ_API_URL", default_value = "http://127.0.0.1:1414")]
    api_url: String,

    #[arg(short, long, env = "QUIZ_USERNAME")]
    username: String,

    #[arg(short, long, env = "QUIZ_PASSWORD", hide_env_values = true)]
    password: String,

    /// How often the lobby re-reads the session.
    #[arg(long, env, default_value_t = 3000)]
    poll_interval_ms: u64,

    /// Give up on a server request after this long.
    #[arg(long, env, default_value_t = 10_000)]
    request_timeout_ms: u64,

    /// Seconds allowed per question.
    #[arg(long, env, default_value_t = names::DEFAULT_QUESTION_SECONDS)]
    question_seconds: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a session for a quiz and run its lobby as host.
    Host {
        quiz_id: i32,
        #[arg(long, default_value_t = names::MIN_TEAM_COUNT)]
        teams: u32,
    },
    /// Join a session by code.
    Join { code: String },
    /// Play a quiz on your own.
    Practice { quiz_id: i32 },
    /// Show the standings of a session.
    Results { code: String },
    /// Continue from a saved link such as `session=ABC123&isHost=true`.
    Resume { quiz_id: i32, query: String },
}

struct App {
    client: Arc<HttpClient>,
    auth: AuthContext,
    config: ClientConfig,
    lines: mpsc::UnboundedReceiver<String>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "quizinart_live=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();

    let config = ClientConfig::new(&args.api_url)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_question_seconds(args.question_seconds)
        .with_request_timeout(Duration::from_millis(args.request_timeout_ms));
    let client = Arc::new(HttpClient::with_timeout(
        &config.base_url,
        config.request_timeout,
    )?);

    let auth_service = AuthService::new(HttpClient::clone(&client));
    let auth = match auth_service.login(&args.username, &args.password).await? {
        LoginOutcome::Success(auth) => auth,
        LoginOutcome::InvalidCredentials => bail!("invalid username or password"),
        LoginOutcome::EmptyFields => bail!("username and password are required"),
    };

    let mut app = App {
        client,
        auth: auth.clone(),
        config,
        lines: spawn_line_reader(),
    };

    let result = match args.command {
        Command::Host { quiz_id, teams } => app.host(quiz_id, teams).await,
        Command::Join { code } => app.join(&code).await,
        Command::Practice { quiz_id } => app.play(quiz_id, PlayMode::Standalone).await,
        Command::Results { code } => app.results(&code).await,
        Command::Resume { quiz_id, query } => app.resume(quiz_id, &query).await,
    };

    if let Err(e) = auth_service.logout(auth).await {
        tracing::warn!("logout failed: {e}");
    }
    result
}

fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Maps a typed line to play input, reading answers by the current question's kind.
fn parse_play_input(line: &str, current: Option<&Question>) -> Option<PlayInput> {
    match line.trim().to_ascii_lowercase().as_str() {
        "next" | "n" => return Some(PlayInput::Next),
        "retry" => return Some(PlayInput::Retry),
        "quit" | "q" => return Some(PlayInput::Quit),
        _ => {}
    }
    match current? {
        Question::MultipleChoice { .. } => match line.trim().parse::<usize>() {
            Ok(n) if n > 0 => Some(PlayInput::Answer(Answer::Choice(n - 1))),
            _ => None,
        },
        Question::TextInput { .. } => Some(PlayInput::Answer(Answer::Text(line.to_string()))),
        Question::Slider { .. } => line
            .trim()
            .parse::<f64>()
            .ok()
            .map(|v| PlayInput::Answer(Answer::Value(v))),
    }
}

impl App {
    async fn host(&mut self, quiz_id: i32, teams: u32) -> color_eyre::Result<()> {
        let service = LobbyService::new(Arc::clone(&self.client), self.config.poll_interval);
        let code = service.host(&self.auth, quiz_id, teams).await?;
        println!("Session {code} created. Share the code with your players.");
        self.join(&code).await
    }

    async fn join(&mut self, code: &str) -> color_eyre::Result<()> {
        let Some(launch) = self.lobby(code).await? else {
            return Ok(());
        };
        println!("Starting: {}", launch.params().to_url(&names::simulator_page_url(launch.quiz_id)));
        self.play(launch.quiz_id, PlayMode::Session { code: launch.code.clone() })
            .await?;
        self.results(&launch.code).await
    }

    async fn resume(&mut self, quiz_id: i32, query: &str) -> color_eyre::Result<()> {
        match PhaseParams::from_query(query).phase() {
            Phase::Standalone => self.play(quiz_id, PlayMode::Standalone).await,
            Phase::Play { code, .. } => {
                self.play(quiz_id, PlayMode::Session { code: code.clone() }).await?;
                self.results(&code).await
            }
            Phase::Results { code } => self.results(&code).await,
        }
    }

    /// Runs the lobby until the session starts; `None` if the user left.
    async fn lobby(&mut self, code: &str) -> color_eyre::Result<Option<PlayLaunch>> {
        let service = LobbyService::new(Arc::clone(&self.client), self.config.poll_interval);
        let mut lobby = service.open(self.auth.clone(), code)?;
        let mut updates = lobby.subscribe();
        println!("Lobby {}", names::lobby_page_url(lobby.code()));

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return Err(eyre!("lobby polling stopped unexpectedly"));
                    }
                    let state = updates.borrow_and_update().clone();
                    print!("{}", views::lobby(&state));
                    if let LobbyState::Started(_) = state {
                        break;
                    }
                }
                line = self.lines.recv() => {
                    let Some(line) = line else {
                        lobby.close().await;
                        return Ok(None);
                    };
                    let mut words = line.split_whitespace();
                    let result = match (words.next(), words.next()) {
                        (Some("join"), team) => lobby.join_team(team).await,
                        (Some("start"), _) => lobby.start().await,
                        (Some("invite"), Some(id)) => match id.parse::<i32>() {
                            Ok(id) => lobby.invite(id).await.map(|()| println!("Invitation sent.")),
                            Err(_) => Err(quizinart_live::ClientError::input("user id must be a number")),
                        },
                        (Some("quit"), _) => {
                            lobby.close().await;
                            return Ok(None);
                        }
                        (None, _) => Ok(()),
                        _ => {
                            println!("Commands: join [team], start, invite <user id>, quit");
                            Ok(())
                        }
                    };
                    if let Err(e) = result {
                        println!("! {}", e.inline_message());
                    }
                }
            }
        }

        Ok(Some(lobby.wait_for_launch().await?))
    }

    async fn play(&mut self, quiz_id: i32, mode: PlayMode) -> color_eyre::Result<()> {
        let runner = PlayRunner::new(
            Arc::clone(&self.client),
            self.auth.clone(),
            self.config.tick,
            self.config.question_seconds,
        );
        let engine = runner.load(quiz_id, mode).await?;

        let (input_tx, input_rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let play = runner.run(engine, input_rx, event_tx);
        tokio::pin!(play);

        let mut current: Option<Question> = None;
        let outcome = loop {
            tokio::select! {
                outcome = &mut play => break outcome,
                Some(event) = event_rx.recv() => render_play_event(event, &mut current),
                line = self.lines.recv() => {
                    let input = match line {
                        None => Some(PlayInput::Quit),
                        Some(line) => parse_play_input(&line, current.as_ref()),
                    };
                    match input {
                        Some(input) => {
                            if input_tx.send(input).await.is_err() {
                                tracing::warn!("play loop is no longer accepting input");
                            }
                        }
                        None => println!("? not an answer for this question"),
                    }
                }
            }
        };
        while let Ok(event) = event_rx.try_recv() {
            render_play_event(event, &mut current);
        }

        if let Some(submission) = outcome.submission {
            if let Err(e) = submission.await {
                tracing::error!("score submission task failed: {e}");
            }
        }
        Ok(())
    }

    async fn results(&self, code: &str) -> color_eyre::Result<()> {
        let service = ResultsService::new(Arc::clone(&self.client));
        let standings = service.standings(&self.auth, code).await?;
        print!("{}", views::standings(code, &standings));
        Ok(())
    }
}

fn render_play_event(event: PlayEvent, current: &mut Option<Question>) {
    match event {
        PlayEvent::Question {
            index,
            total,
            question,
            time_left,
        } => {
            print!("{}", views::question(index, total, &question, time_left));
            *current = Some(question);
        }
        PlayEvent::Tick { time_left } if time_left <= 5 => println!("  {time_left}s left"),
        PlayEvent::Tick { .. } => {}
        PlayEvent::Recorded(_) => println!("  answer recorded"),
        PlayEvent::Rejected(message) => println!("! {message}"),
        PlayEvent::Advanced(advance) => println!("{}", advance.outcome),
        PlayEvent::Finished(report) => {
            *current = None;
            print!("{}", views::report(&report));
        }
    }
}
