use std::sync::Arc;

use anyhow::anyhow;

use transfer_outlook::features::FeatureRow;
use transfer_outlook::models::{DepartureModel, DestinationModel, EstimateSource, ModelSet};
use transfer_outlook::tables::{Club, Player, Tables, TransferRecord, ValuationRecord, parse_date};
use transfer_outlook::{Engine, EngineConfig, EstimateError, EstimateResponse};

fn player(id: u32, nationality: Option<&str>, club: Option<(u32, &str)>) -> Player {
    Player {
        player_id: id,
        name: format!("Player {id}"),
        nationality: nationality.map(str::to_string),
        current_club_id: club.map(|c| c.0),
        current_club_name: club.map(|c| c.1.to_string()).unwrap_or_default(),
        ..Default::default()
    }
}

fn transfer(player_id: u32, from: (u32, &str), to: (u32, &str), fee: Option<f64>) -> TransferRecord {
    TransferRecord {
        player_id,
        transfer_date: parse_date("2020-07-01"),
        from_club_id: Some(from.0),
        from_club_name: from.1.to_string(),
        to_club_id: Some(to.0),
        to_club_name: to.1.to_string(),
        fee,
    }
}

fn valuation(player_id: u32, day: &str, value: f64) -> ValuationRecord {
    ValuationRecord {
        player_id,
        date: parse_date(day),
        market_value: Some(value),
    }
}

fn club(id: u32, name: &str, league: &str) -> Club {
    Club {
        club_id: id,
        name: name.to_string(),
        league_id: Some(league.to_string()),
    }
}

// No club table, market value only known after the reference date.
fn sparse_world() -> Tables {
    Tables {
        players: vec![
            player(1, Some("Narnia"), Some((10, "Home"))),
            player(2, Some("Elsewhere"), None),
            player(3, Some("Narnia"), None),
            player(4, None, None),
            player(5, Some("Narnia"), Some((10, "Home"))),
        ],
        transfers: vec![
            transfer(2, (10, "Home FC"), (20, "Alpha"), Some(3.0)),
            transfer(3, (30, "Away"), (40, "Beta"), None),
        ],
        valuations: vec![
            valuation(1, "2030-01-01", 5.0),
            valuation(2, "2020-01-01", 5.0),
            valuation(3, "2020-01-01", 5.0),
            valuation(4, "2024-05-01", 7.0),
        ],
        ..Default::default()
    }
}

fn priced_world() -> Tables {
    let mut home = player(1, Some("N"), Some((10, "Home")));
    home.current_league_id = Some("L1".to_string());
    Tables {
        players: vec![
            home,
            player(2, Some("M"), None),
            player(3, Some("N"), None),
        ],
        clubs: vec![
            club(10, "Home", "L1"),
            club(20, "Alpha", "L2"),
            club(40, "Beta", "L3"),
        ],
        transfers: vec![
            transfer(2, (10, "Home"), (20, "Alpha"), Some(1000.0)),
            transfer(3, (30, "Away"), (40, "Beta"), Some(10.0)),
        ],
        valuations: vec![valuation(1, "2024-06-01", 100.0)],
        ..Default::default()
    }
}

fn estimate(engine: &Engine, id: u32) -> transfer_outlook::TransferEstimate {
    engine.estimate_transfer(id).expect("estimate should succeed")
}

#[test]
fn two_signal_player_splits_62_5_and_37_5() {
    let engine = Engine::from_tables(sparse_world(), EngineConfig::default());
    let est = estimate(&engine, 1);

    assert_eq!(est.market_value, transfer_outlook::tables::MarketValue::Unknown);
    let names: Vec<_> = est
        .likely_destinations
        .iter()
        .map(|d| d.club_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(est.likely_destinations.get("Alpha").unwrap().score, 62.5);
    assert_eq!(est.likely_destinations.get("Beta").unwrap().score, 37.5);
    // contract unknown 0.2 + unknown league 0.3
    assert_eq!(est.transfer_probability, 50.0);
    assert_eq!(est.probability_source, EstimateSource::Heuristic);
}

#[test]
fn player_without_history_gets_empty_destinations() {
    let engine = Engine::from_tables(sparse_world(), EngineConfig::default());
    let est = estimate(&engine, 4);
    assert!(est.likely_destinations.is_empty());
    assert!(est.transfer_probability.is_finite());
    assert!((0.0..=100.0).contains(&est.transfer_probability));
}

#[test]
fn league_and_affordability_shape_the_ranking() {
    let engine = Engine::from_tables(priced_world(), EngineConfig::default());
    let est = estimate(&engine, 1);

    // Alpha: (0.5 + 0.5) * 2.0 * 1.2 = 2.4; Beta: 0.3 * 1.01 * 0.2 = 0.0606
    let alpha = est.likely_destinations.get("Alpha").unwrap();
    let beta = est.likely_destinations.get("Beta").unwrap();
    assert_eq!(alpha.score, 97.54);
    assert_eq!(alpha.club_id, Some(20));
    assert_eq!(beta.score, 2.46);
    assert_eq!(beta.club_id, Some(40));
    // running contract 0.2 + league investment 0.0
    assert_eq!(est.transfer_probability, 20.0);
}

#[test]
fn missing_entities_become_error_payloads() {
    let engine = Engine::from_tables(sparse_world(), EngineConfig::default());
    assert_eq!(
        engine.estimate_transfer(999),
        Err(EstimateError::PlayerNotFound(999))
    );
    assert_eq!(
        engine.estimate_transfer(5),
        Err(EstimateError::NoValuation(5))
    );

    let json = serde_json::to_value(engine.respond(5)).unwrap();
    assert_eq!(json["player_id"], 5);
    assert_eq!(json["error"], "no valuation data for player");
}

#[test]
fn repeated_estimates_are_identical() {
    let engine = Engine::from_tables(priced_world(), EngineConfig::default());
    let first = serde_json::to_string(&engine.respond(1)).unwrap();
    let second = serde_json::to_string(&engine.respond(1)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn scores_stay_within_bounds_for_every_player() {
    let mut tables = priced_world();
    tables.players.extend(sparse_world().players.into_iter().map(|mut p| {
        p.player_id += 100;
        p
    }));
    tables
        .valuations
        .extend((101..=105).map(|id| valuation(id, "2022-01-01", 50.0)));
    let ids: Vec<u32> = tables.players.iter().map(|p| p.player_id).collect();
    let engine = Engine::from_tables(tables, EngineConfig::default());

    for response in engine.estimate_many(&ids) {
        let EstimateResponse::Estimate(est) = response else {
            continue;
        };
        assert!(est.likely_destinations.len() <= 5);
        assert!(est.likely_destinations.total() <= 100.0 + 0.05);
        for d in est.likely_destinations.iter() {
            assert!((0.0..=100.0).contains(&d.score));
        }
        assert!((0.0..=100.0).contains(&est.transfer_probability));
    }
}

#[test]
fn estimate_many_keeps_input_order() {
    let engine = Engine::from_tables(sparse_world(), EngineConfig::default());
    let responses = engine.estimate_many(&[4, 999, 1]);
    let ids: Vec<u32> = responses
        .iter()
        .map(|r| match r {
            EstimateResponse::Estimate(e) => e.player_id,
            EstimateResponse::Error(e) => e.player_id,
        })
        .collect();
    assert_eq!(ids, vec![4, 999, 1]);
}

#[test]
fn reload_publishes_new_tables() {
    let engine = Engine::from_tables(Tables::default(), EngineConfig::default());
    let held = engine.snapshot();
    assert!(engine.estimate_transfer(1).is_err());

    engine.reload(priced_world());
    assert!(engine.estimate_transfer(1).is_ok());
    assert!(held.player(1).is_none());
}

struct FixedDeparture(f64);

impl DepartureModel for FixedDeparture {
    fn predict_departure_probability(&self, _row: &FeatureRow) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

struct FixedClubs(Vec<(u32, f64)>);

impl DestinationModel for FixedClubs {
    fn predict_destination_scores(&self, _row: &FeatureRow) -> anyhow::Result<Vec<(u32, f64)>> {
        Ok(self.0.clone())
    }
}

struct Broken;

impl DestinationModel for Broken {
    fn predict_destination_scores(&self, _row: &FeatureRow) -> anyhow::Result<Vec<(u32, f64)>> {
        Err(anyhow!("model file missing"))
    }
}

impl DepartureModel for Broken {
    fn predict_departure_probability(&self, _row: &FeatureRow) -> anyhow::Result<f64> {
        Ok(f64::NAN)
    }
}

#[test]
fn model_output_is_preferred_when_usable() {
    let models = ModelSet::heuristic_only()
        .with_departure(Arc::new(FixedDeparture(0.9)))
        .with_destination(Arc::new(FixedClubs(vec![(40, 1.0), (20, 3.0), (77, 5.0)])));
    let engine = Engine::from_tables(priced_world(), EngineConfig::default()).with_models(models);
    let est = estimate(&engine, 1);

    assert_eq!(est.transfer_probability, 90.0);
    assert_eq!(est.probability_source, EstimateSource::Model);
    assert_eq!(est.destination_source, EstimateSource::Model);
    let names: Vec<_> = est
        .likely_destinations
        .iter()
        .map(|d| d.club_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(est.likely_destinations.get("Alpha").unwrap().score, 75.0);
}

#[test]
fn unusable_model_output_falls_back_to_heuristic() {
    let broken = Arc::new(Broken);
    let models = ModelSet::heuristic_only()
        .with_departure(broken.clone())
        .with_destination(broken);
    let engine = Engine::from_tables(priced_world(), EngineConfig::default()).with_models(models);
    let est = estimate(&engine, 1);

    assert_eq!(est.probability_source, EstimateSource::Heuristic);
    assert_eq!(est.destination_source, EstimateSource::Heuristic);
    assert_eq!(est.transfer_probability, 20.0);
    assert_eq!(est.likely_destinations.get("Alpha").unwrap().score, 97.54);
}
