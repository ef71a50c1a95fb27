//! Plain-text screens for the terminal driver.

use std::fmt;

use crate::grading::format_number;
use crate::models::Question;
use crate::services::lobby::{LobbyState, LobbyView};
use crate::services::play::Report;
use crate::services::results::Standings;

struct Roster<'a>(&'a LobbyView);

impl fmt::Display for Roster<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        writeln!(f, "Participants ({}):", view.participants.len())?;
        if view.participants.is_empty() {
            writeln!(f, "  nobody has joined yet")?;
        }
        for p in &view.participants {
            let host = if p.id == view.session.host_id { " (host)" } else { "" };
            match &p.team {
                Some(team) => writeln!(f, "  - {}{host} [team {team}]", p.username)?,
                None => writeln!(f, "  - {}{host}", p.username)?,
            }
        }
        Ok(())
    }
}

struct LobbyScreen<'a>(&'a LobbyState);

impl fmt::Display for LobbyScreen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = match self.0 {
            LobbyState::Loading => return writeln!(f, "Loading session..."),
            LobbyState::Started(launch) => {
                return writeln!(f, "Session {} has started!", launch.code)
            }
            LobbyState::Lobby(view) | LobbyState::TeamSelection(view) => view,
        };

        let session = &view.session;
        let title = session.quiz_name.as_deref().unwrap_or("Quiz");
        writeln!(f, "== {title} | session {} ==", session.code)?;
        if session.is_team_mode() {
            writeln!(f, "Team mode")?;
        }
        write!(f, "{}", Roster(view))?;

        if let LobbyState::TeamSelection(_) = self.0 {
            let choices = session.team_choices();
            if choices.is_empty() {
                writeln!(f, "Pick a team: join <team>")?;
            } else {
                writeln!(f, "Pick a team ({}): join <team>", choices.join(", "))?;
            }
        } else if !view.joined {
            writeln!(f, "Type 'join' to take part.")?;
        }

        if view.can_start() {
            writeln!(f, "Type 'start' to begin, or 'invite <user id>'.")?;
        } else if !view.is_host {
            writeln!(f, "Waiting for the host to start...")?;
        }
        Ok(())
    }
}

pub fn lobby(state: &LobbyState) -> String {
    LobbyScreen(state).to_string()
}

struct QuestionScreen<'a> {
    index: usize,
    total: usize,
    question: &'a Question,
    time_left: u32,
}

impl fmt::Display for QuestionScreen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nQuestion {} of {} ({}s)", self.index + 1, self.total, self.time_left)?;
        writeln!(f, "{}", self.question.text())?;
        match self.question {
            Question::MultipleChoice { options, .. } => {
                for (idx, option) in options.iter().enumerate() {
                    writeln!(f, "  {}) {}", idx + 1, option.text)?;
                }
                writeln!(f, "Answer with the option number, then 'next'.")
            }
            Question::TextInput { max_length: Some(max), .. } => {
                writeln!(f, "Type your answer (max {max} characters), then 'next'.")
            }
            Question::TextInput { max_length: None, .. } => {
                writeln!(f, "Type your answer, then 'next'.")
            }
            Question::Slider { min, max, step, .. } => writeln!(
                f,
                "Pick a value from {} to {} (step {}), then 'next'.",
                format_number(*min),
                format_number(*max),
                format_number(*step)
            ),
        }
    }
}

pub fn question(index: usize, total: usize, question: &Question, time_left: u32) -> String {
    QuestionScreen { index, total, question, time_left }.to_string()
}

struct ReportScreen<'a>(&'a Report);

impl fmt::Display for ReportScreen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "\nQuiz complete! Score: {}/{}", report.score, report.total)?;
        for line in &report.lines {
            writeln!(f, "{}. {} [{}]", line.number, line.question, line.outcome)?;
            writeln!(f, "   Correct answer: {}", line.correct_answer)?;
            if let Some(answer) = &line.your_answer {
                writeln!(f, "   Your answer: {answer}")?;
            }
        }
        if report.can_retry {
            writeln!(f, "Type 'retry' to play again or 'quit'.")?;
        } else {
            writeln!(f, "Type 'quit' to continue.")?;
        }
        if let Some(url) = &report.results_url {
            writeln!(f, "Session results: {url}")?;
        }
        Ok(())
    }
}

pub fn report(report: &Report) -> String {
    ReportScreen(report).to_string()
}

struct StandingsScreen<'a> {
    code: &'a str,
    standings: &'a Standings,
}

impl fmt::Display for StandingsScreen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let standings = self.standings;
        writeln!(f, "== Results for session {} ==", self.code)?;
        if standings.ranking.is_empty() {
            writeln!(f, "No scores submitted yet.")?;
        }
        for (place, entry) in standings.ranking.iter().enumerate() {
            write!(f, "{:>3}. {}", place + 1, entry.username)?;
            if let Some(team) = &entry.team {
                write!(f, " (team {team})")?;
            }
            writeln!(f, ": {}", entry.score)?;
        }

        let Some(teams) = &standings.teams else {
            return Ok(());
        };
        writeln!(f, "\nTeams:")?;
        for team in teams {
            writeln!(
                f,
                "  {}: total {}, average {} over {} member(s) [{}]",
                team.team,
                team.total_score,
                team.average_display(),
                team.member_count,
                team.members.join(", ")
            )?;
        }
        Ok(())
    }
}

pub fn standings(code: &str, standings: &Standings) -> String {
    StandingsScreen { code, standings }.to_string()
}
