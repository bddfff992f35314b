//! Ranking query logic
//!
//! Eligibility filtering, ordering and the display view for ranking
//! queries. The order is total: exact rating descending with ties broken
//! by ascending pilot id, so repeated queries over unchanged data return
//! identical results.

use crate::types::{Pilot, PilotStanding};
use std::cmp::Ordering;

/// Keep pilots with at least `minimum_races` completed races; 0 keeps
/// everyone
pub fn eligible_pilots(pilots: Vec<Pilot>, minimum_races: u32) -> Vec<Pilot> {
    pilots
        .into_iter()
        .filter(|pilot| pilot.races_completed >= minimum_races)
        .collect()
}

/// Order pilots by exact rating descending, ascending id on ties
pub fn sort_standings(pilots: &mut [Pilot]) {
    pilots.sort_by(|a, b| {
        b.elo
            .partial_cmp(&a.elo)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Complete ranking query over a pilot set, exact ratings preserved
pub fn rank_pilots(pilots: Vec<Pilot>, minimum_races: u32) -> Vec<Pilot> {
    let mut eligible = eligible_pilots(pilots, minimum_races);
    sort_standings(&mut eligible);
    eligible
}

/// Build the transfer view, ratings rounded to the nearest integer
pub fn build_standings(pilots: &[Pilot]) -> Vec<PilotStanding> {
    pilots.iter().map(PilotStanding::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PilotProfile;

    fn test_pilot(id: i64, elo: f64, races: u32) -> Pilot {
        let mut pilot = Pilot::new(
            id,
            PilotProfile {
                license_number: format!("FR-{:03}", id),
                first_name: "Test".to_string(),
                last_name: "Pilot".to_string(),
                pseudo: format!("pilot-{}", id),
            },
            elo,
        );
        pilot.races_completed = races;
        pilot
    }

    #[test]
    fn test_sorts_by_rating_descending() {
        let pilots = vec![
            test_pilot(1, 980.0, 5),
            test_pilot(2, 1120.0, 5),
            test_pilot(3, 1050.0, 5),
        ];

        let ranked = rank_pilots(pilots, 0);
        let ids: Vec<i64> = ranked.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let pilots = vec![
            test_pilot(9, 1000.0, 1),
            test_pilot(2, 1000.0, 1),
            test_pilot(5, 1000.0, 1),
        ];

        let ranked = rank_pilots(pilots, 0);
        let ids: Vec<i64> = ranked.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_minimum_races_filter() {
        let pilots = vec![
            test_pilot(1, 1200.0, 0),
            test_pilot(2, 1100.0, 3),
            test_pilot(3, 1000.0, 5),
        ];

        assert_eq!(rank_pilots(pilots.clone(), 0).len(), 3);

        let filtered = rank_pilots(pilots.clone(), 3);
        let ids: Vec<i64> = filtered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3]);

        assert!(rank_pilots(pilots, 6).is_empty());
    }

    #[test]
    fn test_filtered_ranking_is_a_subsequence() {
        let pilots = vec![
            test_pilot(1, 1200.0, 1),
            test_pilot(2, 1100.0, 4),
            test_pilot(3, 1000.0, 2),
            test_pilot(4, 950.0, 7),
        ];

        let everyone: Vec<i64> = rank_pilots(pilots.clone(), 0).iter().map(|p| p.id).collect();
        let filtered: Vec<i64> = rank_pilots(pilots, 3).iter().map(|p| p.id).collect();

        // The filtered ranking preserves the relative order of the full one
        let mut cursor = everyone.iter();
        for id in &filtered {
            assert!(cursor.any(|candidate| candidate == id));
        }
    }

    #[test]
    fn test_view_rounds_but_ranking_stays_exact() {
        let pilots = vec![test_pilot(1, 1015.7, 1), test_pilot(2, 1015.2, 1)];

        let ranked = rank_pilots(pilots, 0);
        assert_eq!(ranked[0].id, 1);
        assert_eq!(ranked[0].elo, 1015.7);

        let standings = build_standings(&ranked);
        assert_eq!(standings[0].elo, 1016);
        assert_eq!(standings[1].elo, 1015);
    }

    #[test]
    fn test_repeat_queries_are_identical() {
        let pilots = vec![
            test_pilot(3, 1000.0, 1),
            test_pilot(1, 1000.0, 1),
            test_pilot(2, 1040.0, 1),
        ];

        let first: Vec<i64> = rank_pilots(pilots.clone(), 0).iter().map(|p| p.id).collect();
        let second: Vec<i64> = rank_pilots(pilots, 0).iter().map(|p| p.id).collect();
        assert_eq!(first, second);
    }
}
