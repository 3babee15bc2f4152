#[cfg(test)]
mod tests {
    use crate::models::player::BalancerPlayer;
    use crate::service::team_balancer::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn players(weights: &[u32]) -> Vec<BalancerPlayer> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| BalancerPlayer {
                id: Uuid::new_v4(),
                display_name: format!("player{}", i + 1),
                rank: None,
                evidence_weight: *w,
            })
            .collect()
    }

    fn weights_of(team: &[AssignedPlayer]) -> Vec<u32> {
        team.iter().map(|p| p.player.evidence_weight).collect()
    }

    #[test]
    fn test_descending_scenario_totals() {
        let input = players(&[500, 450, 400, 350, 300, 250, 200, 150, 100, 50]);
        let result = balance_quick_match_teams(&input, 50.0).unwrap();

        assert_eq!(weights_of(&result.team_a), vec![500, 350, 300, 150, 100]);
        assert_eq!(weights_of(&result.team_b), vec![450, 400, 250, 200, 50]);
        assert_eq!(result.team_a_total, 1400);
        assert_eq!(result.team_b_total, 1350);
        assert_eq!(result.weight_delta, 50);
        // Never worse than the single largest weight left to pair.
        assert!(result.weight_delta <= 500);
        assert_eq!(result.balance_confidence, 75);
    }

    #[test]
    fn test_partition_has_no_duplicates_or_omissions() {
        let shuffled = [230, 15, 400, 90, 90, 265, 500, 150, 60, 300];
        let input = players(&shuffled);
        let result = balance_quick_match_teams(&input, 50.0).unwrap();

        let a = result.team_indices(QuickMatchTeam::TeamA);
        let b = result.team_indices(QuickMatchTeam::TeamB);
        assert_eq!(a.len(), 5);
        assert_eq!(b.len(), 5);

        let all: HashSet<usize> = a.iter().chain(b.iter()).copied().collect();
        assert_eq!(all.len(), 10);
        assert!(all.iter().all(|i| *i < 10));

        for p in result.team_a.iter().chain(result.team_b.iter()) {
            assert_eq!(p.player, input[p.index]);
        }
    }

    #[test]
    fn test_input_order_does_not_change_totals() {
        let forward = players(&[50, 100, 150, 200, 250, 300, 350, 400, 450, 500]);
        let result = balance_quick_match_teams(&forward, 50.0).unwrap();
        assert_eq!(result.team_a_total, 1400);
        assert_eq!(result.team_b_total, 1350);
    }

    #[test]
    fn test_equal_weights_split_evenly() {
        let input = players(&[150; 10]);
        let result = balance_quick_match_teams(&input, 50.0).unwrap();
        assert_eq!(result.weight_delta, 0);
        assert_eq!(result.balance_confidence, 100);
        // Ties go to team A first, then alternate.
        assert_eq!(result.team_indices(QuickMatchTeam::TeamA), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_every_player_carries_confidence_and_reasoning() {
        let input = players(&[500, 10, 10, 10, 10, 10, 10, 10, 10, 10]);
        let result = balance_quick_match_teams(&input, 50.0).unwrap();
        assert_eq!(result.weight_delta, 500 + 40 - 50);
        for p in result.team_a.iter().chain(result.team_b.iter()) {
            assert_eq!(p.confidence, result.balance_confidence);
            assert!(p.reasoning.contains("joined"));
        }
    }

    #[test]
    fn test_wrong_player_count_fails_fast() {
        let err = balance_quick_match_teams(&players(&[100; 9]), 50.0).unwrap_err();
        assert_eq!(
            err,
            BalanceError::WrongPlayerCount {
                expected: 10,
                actual: 9
            }
        );
        assert!(balance_quick_match_teams(&players(&[100; 11]), 50.0).is_err());
        assert!(balance_quick_match_teams(&[], 50.0).is_err());
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let mut input = players(&[100; 10]);
        input[9].id = input[0].id;
        let err = balance_quick_match_teams(&input, 50.0).unwrap_err();
        assert_eq!(err, BalanceError::DuplicatePlayer(input[0].id));
    }
}
