use std::collections::HashSet;

use proptest::prelude::*;
use station_alloc::allocation::{
    is_eligible, ranking, AllocationEngine, Applicant, ApplicantId, ApplicantState, Participant,
    Position, PositionRef,
};

const CATEGORIES: [&str; 3] = ["EE", "ECE", "CS"];
const ATTRIBUTES: [&str; 3] = ["lab-safety", "signals", "dbms"];

fn arb_station(slot: usize) -> impl Strategy<Value = Position> {
    (
        1usize..=3,
        50u32..=90,
        proptest::sample::subsequence(CATEGORIES.to_vec(), 1..=3),
        proptest::sample::subsequence(ATTRIBUTES.to_vec(), 0..=1),
    )
        .prop_map(move |(capacity, cutoff, categories, required)| {
            Position::new(format!("S{slot}"), capacity, cutoff as f32 / 10.0)
                .with_categories(categories)
                .with_required_attributes(required)
        })
}

fn arb_applicant(id: u32, stations: usize) -> impl Strategy<Value = Applicant> {
    (
        40u32..=100,
        proptest::sample::select(CATEGORIES.to_vec()),
        proptest::sample::subsequence(ATTRIBUTES.to_vec(), 0..=3),
        Just((0..stations).collect::<Vec<_>>()).prop_shuffle(),
        0..=stations,
    )
        .prop_map(move |(score, category, attributes, order, keep)| {
            Applicant::new(
                ApplicantId(id),
                format!("Student {id}"),
                score as f32 / 10.0,
                category,
                attributes,
                order.into_iter().take(keep).map(PositionRef).collect(),
            )
        })
}

fn arb_market() -> impl Strategy<Value = (Vec<Position>, Vec<Applicant>)> {
    (1usize..=5, 0u32..=14).prop_flat_map(|(stations, applicants)| {
        let positions: Vec<_> = (0..stations).map(arb_station).collect();
        let roster: Vec<_> = (0..applicants)
            .map(|id| arb_applicant(id + 1, stations))
            .collect();
        (positions, roster)
    })
}

proptest! {
    #[test]
    fn capacity_and_single_admission_hold((positions, applicants) in arb_market()) {
        let mut engine = AllocationEngine::new(applicants, positions).expect("valid engine");
        let report = engine.run().expect("no fault");

        let mut seen = HashSet::new();
        for fill in &report.positions {
            prop_assert!(fill.held <= fill.capacity);
            for id in &fill.admitted {
                prop_assert!(seen.insert(*id), "applicant {} admitted twice", id);
            }
        }
        let accepted = report.summary().accepted;
        prop_assert_eq!(accepted, seen.len());
    }

    #[test]
    fn every_admission_satisfies_eligibility((positions, applicants) in arb_market()) {
        let mut engine = AllocationEngine::new(applicants, positions).expect("valid engine");
        engine.run().expect("no fault");

        for participant in engine.participants() {
            if let ApplicantState::Accepted { position } = participant.state() {
                let station = engine.position(position).expect("station exists");
                prop_assert!(is_eligible(participant, station));
                let listed: Vec<PositionRef> = participant.preferences().iter().collect();
                prop_assert!(listed.contains(&position));
            }
        }
    }

    #[test]
    fn run_terminates_with_every_applicant_finalized((positions, applicants) in arb_market()) {
        let bound: usize = applicants
            .iter()
            .map(|applicant| applicant.preferences().len())
            .sum();
        let mut engine = AllocationEngine::new(applicants, positions).expect("valid engine");
        let report = engine.run().expect("no fault");

        prop_assert!(report.rounds as usize <= bound);
        prop_assert_eq!(report.summary().pending, 0);
        for participant in engine.participants() {
            prop_assert!(participant.is_finalized());
        }
    }

    #[test]
    fn each_round_admits_top_ranked_eligible((positions, applicants) in arb_market()) {
        let mut engine = AllocationEngine::new(applicants, positions).expect("valid engine");

        loop {
            let mut expected: Vec<Vec<ApplicantId>> = Vec::new();
            for (slot, station) in engine.positions().iter().enumerate() {
                let mut eligible: Vec<&Applicant> = engine
                    .participants()
                    .iter()
                    .filter(|participant| !participant.is_finalized())
                    .filter(|participant| {
                        participant.preferences().current() == Some(PositionRef(slot))
                    })
                    .filter(|participant| is_eligible(*participant, station))
                    .collect();
                eligible.sort_by(|a, b| ranking::rank(*a, *b));
                eligible.truncate(station.remaining());
                let mut ids: Vec<ApplicantId> = eligible
                    .iter()
                    .map(|participant| participant.id())
                    .collect();
                ids.sort();
                expected.push(ids);
            }
            let held_before: Vec<usize> = engine.positions().iter().map(Position::held).collect();

            if engine.step().expect("no fault").is_none() {
                break;
            }

            for (slot, station) in engine.positions().iter().enumerate() {
                let mut admitted = station.admitted()[held_before[slot]..].to_vec();
                admitted.sort();
                prop_assert_eq!(&admitted, &expected[slot]);
            }
        }
    }

    #[test]
    fn finalized_outcomes_are_immutable((positions, applicants) in arb_market()) {
        let mut engine = AllocationEngine::new(applicants, positions).expect("valid engine");
        let before = engine.run().expect("no fault");

        let ids: Vec<ApplicantId> = engine
            .participants()
            .iter()
            .map(|participant| participant.id())
            .collect();
        for id in ids {
            prop_assert!(!engine.withdraw(id).expect("known").is_applied());
            prop_assert!(!engine.reject(id).expect("known").is_applied());
        }
        prop_assert_eq!(engine.run().expect("no fault"), before);
    }
}
