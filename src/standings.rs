use std::collections::HashMap;

use crate::types::{parse_event_name, Event, Team, EVENT_NAME_SEPARATOR};

/// Builds the current league table from completed results plus handicap
/// offsets.
///
/// Ordering is points descending, then goal difference descending, with the
/// team name as a final key so equal rows come out in a stable order.
pub fn calc_league_table(
    team_names: &[String],
    results: &[Event],
    handicaps: &HashMap<String, i32>,
) -> Vec<Team> {
    let mut teams: HashMap<&str, Team> = team_names
        .iter()
        .map(|name| {
            (
                name.as_str(),
                Team {
                    name: name.clone(),
                    ..Team::default()
                },
            )
        })
        .collect();

    for (name, handicap) in handicaps {
        if let Some(team) = teams.get_mut(name.as_str()) {
            team.points += handicap;
        }
    }

    for result in results {
        let Some((home, away)) = parse_event_name(&result.name) else {
            continue;
        };
        let Some(score) = result.score.as_ref().filter(|s| s.len() == 2) else {
            continue;
        };
        let (home_goals, away_goals) = (score[0], score[1]);
        if !teams.contains_key(home) || !teams.contains_key(away) {
            continue;
        }

        if home_goals > away_goals {
            teams.get_mut(home).expect("home team present").points += 3;
        } else if home_goals < away_goals {
            teams.get_mut(away).expect("away team present").points += 3;
        } else {
            teams.get_mut(home).expect("home team present").points += 1;
            teams.get_mut(away).expect("away team present").points += 1;
        }

        let home_team = teams.get_mut(home).expect("home team present");
        home_team.goal_difference += home_goals - away_goals;
        home_team.played += 1;
        let away_team = teams.get_mut(away).expect("away team present");
        away_team.goal_difference += away_goals - home_goals;
        away_team.played += 1;
    }

    let mut table: Vec<Team> = teams.into_values().collect();
    table.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference.cmp(&a.goal_difference))
            .then(a.name.cmp(&b.name))
    });
    table
}

/// Enumerates the fixtures still to be played.
///
/// Every ordered pair of distinct teams owes `rounds` meetings; completed
/// results consume them. Enumeration order follows the team-name order and is
/// independent of any RNG.
pub fn calc_remaining_fixtures(
    team_names: &[String],
    results: &[Event],
    rounds: usize,
) -> Vec<String> {
    let mut played_counts: HashMap<&str, usize> = HashMap::new();
    for result in results {
        if result.score.as_ref().is_some_and(|s| s.len() == 2) {
            *played_counts.entry(result.name.as_str()).or_default() += 1;
        }
    }

    let mut remaining = Vec::new();
    for home in team_names {
        for away in team_names {
            if home == away {
                continue;
            }
            let fixture = format!("{home}{EVENT_NAME_SEPARATOR}{away}");
            let played = played_counts.get(fixture.as_str()).copied().unwrap_or(0);
            for _ in played..rounds {
                remaining.push(fixture.clone());
            }
        }
    }
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, home_goals: i32, away_goals: i32) -> Event {
        Event {
            name: name.to_string(),
            date: "2026-01-10".to_string(),
            score: Some(vec![home_goals, away_goals]),
            match_odds: None,
        }
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn table_awards_three_one_zero() {
        let teams = names(&["A", "B", "C"]);
        let results = vec![result("A vs B", 2, 0), result("B vs C", 1, 1)];
        let table = calc_league_table(&teams, &results, &HashMap::new());

        assert_eq!(table[0].name, "A");
        assert_eq!(table[0].points, 3);
        assert_eq!(table[0].goal_difference, 2);
        assert_eq!(table[0].played, 1);

        let b = table.iter().find(|t| t.name == "B").expect("B in table");
        assert_eq!(b.points, 1);
        assert_eq!(b.goal_difference, -2);
        assert_eq!(b.played, 2);

        let c = table.iter().find(|t| t.name == "C").expect("C in table");
        assert_eq!(c.points, 1);
        assert_eq!(c.goal_difference, 0);
        assert_eq!(c.played, 1);
    }

    #[test]
    fn goal_difference_breaks_points_ties() {
        let teams = names(&["A", "B", "C", "D"]);
        let results = vec![result("A vs C", 1, 0), result("B vs D", 3, 0)];
        let table = calc_league_table(&teams, &results, &HashMap::new());
        assert_eq!(table[0].name, "B");
        assert_eq!(table[1].name, "A");
    }

    #[test]
    fn handicaps_offset_starting_points() {
        let teams = names(&["A", "B"]);
        let handicaps = HashMap::from([("B".to_string(), 6), ("A".to_string(), -1)]);
        let table = calc_league_table(&teams, &[], &handicaps);
        assert_eq!(table[0].name, "B");
        assert_eq!(table[0].points, 6);
        assert_eq!(table[1].points, -1);
        assert_eq!(table[0].played, 0);
    }

    #[test]
    fn remaining_fixtures_subtract_played_meetings() {
        let teams = names(&["A", "B"]);
        let results = vec![result("A vs B", 1, 0)];
        let remaining = calc_remaining_fixtures(&teams, &results, 1);
        assert_eq!(remaining, vec!["B vs A".to_string()]);

        let two_rounds = calc_remaining_fixtures(&teams, &results, 2);
        assert_eq!(
            two_rounds,
            vec![
                "A vs B".to_string(),
                "B vs A".to_string(),
                "B vs A".to_string()
            ]
        );
    }

    #[test]
    fn unscored_events_do_not_consume_fixtures() {
        let teams = names(&["A", "B"]);
        let unplayed = Event {
            name: "A vs B".to_string(),
            date: "2026-05-01".to_string(),
            score: None,
            match_odds: None,
        };
        let remaining = calc_remaining_fixtures(&teams, &[unplayed], 1);
        assert_eq!(remaining.len(), 2);
    }
}
