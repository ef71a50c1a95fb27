use std::sync::Arc;

use crate::errors::ClientResult;
use crate::models::{ResultEntry, Session};
use crate::services::auth::AuthContext;
use crate::services::repository::SessionRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct TeamSummary {
    pub team: String,
    pub total_score: u32,
    pub member_count: usize,
    pub members: Vec<String>,
    /// Mean score rounded to two decimals.
    pub average: f64,
}

impl TeamSummary {
    pub fn average_display(&self) -> String {
        format!("{:.2}", self.average)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    /// Highest score first; ties keep the server's order.
    pub ranking: Vec<ResultEntry>,
    /// `None` when nobody played on a team.
    pub teams: Option<Vec<TeamSummary>>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn aggregate(entries: Vec<ResultEntry>) -> Standings {
    let mut teams: Vec<TeamSummary> = Vec::new();
    for entry in &entries {
        let Some(label) = entry.team.as_deref() else {
            continue;
        };
        match teams.iter_mut().find(|t| t.team == label) {
            Some(team) => {
                team.total_score += entry.score;
                team.member_count += 1;
                team.members.push(entry.username.clone());
            }
            None => teams.push(TeamSummary {
                team: label.to_string(),
                total_score: entry.score,
                member_count: 1,
                members: vec![entry.username.clone()],
                average: 0.0,
            }),
        }
    }
    for team in &mut teams {
        team.average = round2(f64::from(team.total_score) / team.member_count as f64);
    }
    // sort_by is stable, so first-seen order survives ties
    teams.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    let mut ranking = entries;
    ranking.sort_by(|a, b| b.score.cmp(&a.score));

    Standings {
        ranking,
        teams: (!teams.is_empty()).then_some(teams),
    }
}

// ---------------------------------------------------------------------------
// ResultsService
// ---------------------------------------------------------------------------

pub struct ResultsService<R: SessionRepository> {
    repo: Arc<R>,
}

impl<R: SessionRepository> ResultsService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn standings(&self, auth: &AuthContext, code: &str) -> ClientResult<Standings> {
        let entries = self.repo.fetch_results(auth, code).await?;
        tracing::info!("fetched {} results for session {code}", entries.len());
        Ok(aggregate(entries))
    }

    /// Session metadata for the results header.
    pub async fn session(&self, auth: &AuthContext, code: &str) -> ClientResult<Session> {
        self.repo.fetch_session(auth, code).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::UserProfile;
    use crate::services::repository::MockSessionRepository;

    fn entry(name: &str, score: u32, team: Option<&str>) -> ResultEntry {
        ResultEntry {
            username: name.to_string(),
            score,
            team: team.map(str::to_string),
        }
    }

    #[test]
    fn ranks_by_score_and_averages_teams() {
        let standings = aggregate(vec![
            entry("A", 8, Some("Red")),
            entry("B", 6, Some("Red")),
            entry("C", 9, None),
        ]);

        let names: Vec<_> = standings.ranking.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);

        let teams = standings.teams.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].team, "Red");
        assert_eq!(teams[0].average_display(), "7.00");
        assert_eq!(teams[0].total_score, 14);
        assert_eq!(teams[0].members, vec!["A", "B"]);
    }

    #[test]
    fn ties_keep_fetch_order() {
        let standings = aggregate(vec![
            entry("first", 5, None),
            entry("second", 5, None),
            entry("third", 7, None),
        ]);
        let names: Vec<_> = standings.ranking.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
        assert!(standings.teams.is_none());
    }

    #[test]
    fn averages_round_to_two_decimals() {
        let standings = aggregate(vec![
            entry("a", 1, Some("1")),
            entry("b", 1, Some("1")),
            entry("c", 2, Some("1")),
            entry("solo", 4, Some("2")),
        ]);
        let teams = standings.teams.unwrap();
        // team 1 total 4, team 2 total 4: first seen stays first
        assert_eq!(teams[0].team, "1");
        assert_eq!(teams[0].average, 1.33);
        assert_eq!(teams[0].average_display(), "1.33");
        assert_eq!(teams[1].average_display(), "4.00");
        assert_eq!(teams[1].member_count, 1);
    }

    #[test]
    fn empty_results() {
        let standings = aggregate(vec![]);
        assert!(standings.ranking.is_empty());
        assert!(standings.teams.is_none());
    }

    #[tokio::test]
    async fn service_aggregates_fetched_results() {
        let mut mock = MockSessionRepository::new();
        mock.expect_fetch_results()
            .withf(|_, code| code == "ABC123")
            .returning(|_, _| {
                Box::pin(async { Ok(vec![entry("A", 2, None), entry("B", 3, None)]) })
            });

        let svc = ResultsService::new(Arc::new(mock));
        let auth = AuthContext::new(
            "session=x".to_string(),
            UserProfile { id: 1, username: "A".to_string() },
        );
        let standings = svc.standings(&auth, "ABC123").await.unwrap();
        assert_eq!(standings.ranking[0].username, "B");
    }
}
