use anyhow::{bail, Context, Result};

use crate::types::Market;

/// Parses a payoff expression like `"1|19x0"` into a positional payoff
/// vector: tokens separated by `|`, each either a bare value or
/// `<count>x<value>`.
pub fn parse_payoff(expr: &str) -> Result<Vec<i32>> {
    let mut payoff = Vec::new();
    for token in expr.split('|') {
        let parts: Vec<&str> = token.split('x').collect();
        let (count, value) = match parts.as_slice() {
            [value] => (1, value.trim()),
            [count, value] => (
                count
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("invalid payoff token: {token}"))?,
                value.trim(),
            ),
            _ => bail!("invalid payoff token: {token}"),
        };
        let value: i32 = value
            .parse()
            .with_context(|| format!("invalid payoff token: {token}"))?;
        payoff.extend(std::iter::repeat(value).take(count));
    }
    Ok(payoff)
}

/// Resolves each market's participating teams and payoff vector, failing on
/// any configuration mistake before expensive work begins.
pub fn init_markets(team_names: &[String], markets: &mut [Market]) -> Result<()> {
    for market in markets {
        if !market.include.is_empty() && !market.exclude.is_empty() {
            bail!(
                "market {} cannot have both include and exclude fields",
                market.name
            );
        }

        for team in market.include.iter().chain(market.exclude.iter()) {
            if !team_names.contains(team) {
                bail!("market {} has unknown team {team}", market.name);
            }
        }

        market.teams = if !market.include.is_empty() {
            market.include.clone()
        } else if !market.exclude.is_empty() {
            team_names
                .iter()
                .filter(|name| !market.exclude.contains(name))
                .cloned()
                .collect()
        } else {
            team_names.to_vec()
        };

        if market.payoff.is_empty() {
            bail!("market {} has no payoff defined", market.name);
        }
        market.parsed_payoff = parse_payoff(&market.payoff)
            .with_context(|| format!("market {}", market.name))?;
        if market.parsed_payoff.len() != market.teams.len() {
            bail!(
                "market {} payoff length ({}) does not match team count ({})",
                market.name,
                market.parsed_payoff.len(),
                market.teams.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(name: &str, payoff: &str, include: &[&str], exclude: &[&str]) -> Market {
        Market {
            name: name.to_string(),
            payoff: payoff.to_string(),
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            teams: Vec::new(),
            parsed_payoff: Vec::new(),
        }
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn payoff_tokens_expand_to_positional_vectors() {
        let mut winner = vec![1];
        winner.extend(std::iter::repeat(0).take(19));
        assert_eq!(parse_payoff("1|19x0").expect("valid payoff"), winner);
        assert_eq!(
            parse_payoff("3x1|2x0").expect("valid payoff"),
            vec![1, 1, 1, 0, 0]
        );
        assert_eq!(parse_payoff("-1").expect("valid payoff"), vec![-1]);
    }

    #[test]
    fn malformed_payoffs_are_rejected() {
        assert!(parse_payoff("1|x0").is_err());
        assert!(parse_payoff("axb").is_err());
        assert!(parse_payoff("1x2x3").is_err());
        assert!(parse_payoff("").is_err());
    }

    #[test]
    fn standard_market_spans_all_teams() {
        let teams = names(&["A", "B", "C", "D"]);
        let mut markets = vec![market("Winner", "1|3x0", &[], &[])];
        init_markets(&teams, &mut markets).expect("valid market");
        assert_eq!(markets[0].teams, teams);
        assert_eq!(markets[0].parsed_payoff, vec![1, 0, 0, 0]);
    }

    #[test]
    fn include_market_keeps_the_given_order() {
        let teams = names(&["A", "B", "C", "D"]);
        let mut markets = vec![market("Duel", "1|0", &["C", "A"], &[])];
        init_markets(&teams, &mut markets).expect("valid market");
        assert_eq!(markets[0].teams, names(&["C", "A"]));
    }

    #[test]
    fn exclude_market_drops_the_named_teams() {
        let teams = names(&["A", "B", "C", "D"]);
        let mut markets = vec![market("NoA", "1|0|0", &[], &["A"])];
        init_markets(&teams, &mut markets).expect("valid market");
        assert_eq!(markets[0].teams, names(&["B", "C", "D"]));
    }

    #[test]
    fn configuration_mistakes_are_fatal() {
        let teams = names(&["A", "B"]);

        let mut both = vec![market("Bad", "1|0", &["A"], &["B"])];
        assert!(init_markets(&teams, &mut both).is_err());

        let mut unknown = vec![market("Bad", "1|0", &["A", "Z"], &[])];
        assert!(init_markets(&teams, &mut unknown).is_err());

        let mut mismatch = vec![market("Bad", "1|0|0", &[], &[])];
        assert!(init_markets(&teams, &mut mismatch).is_err());

        let mut missing = vec![market("Bad", "", &[], &[])];
        assert!(init_markets(&teams, &mut missing).is_err());
    }
}
