use warbots_runtime::{run, ConfigError, RuntimeError, SimulationConfig};
use warbots_world::query;

fn small_mission() -> SimulationConfig {
    SimulationConfig {
        width: 40,
        height: 40,
        seed: 3,
        warbots: 4,
        opfor: 2,
        cycle_ms: 1,
        turn_timeout_ms: 1_000,
        max_rounds: 5_000,
        ..SimulationConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn squad_secures_the_objective() {
    let config = small_mission();
    let mut observed = 0;
    let outcome = run(&config, |report| observed = report.round)
        .await
        .expect("mission runs");

    assert!(outcome.completed, "no completion in {} rounds", outcome.rounds);
    assert_eq!(observed, outcome.rounds);
    assert!(outcome.lost.is_empty(), "lost {:?}", outcome.lost);
    assert_eq!(outcome.map.warbots().count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn frames_cover_the_whole_map() {
    let config = SimulationConfig {
        max_rounds: 3,
        ..small_mission()
    };
    let mut frames = Vec::new();
    let outcome = run(&config, |report| frames.push(query::render_rows(report.map)))
        .await
        .expect("mission runs");

    assert_eq!(outcome.rounds, 3);
    assert_eq!(frames.len(), 3);
    for frame in frames {
        assert_eq!(frame.len(), 40);
        assert!(frame.iter().all(|row| row.chars().count() == 40));
    }
}

#[tokio::test]
async fn invalid_configurations_are_rejected_before_spawning() {
    let config = SimulationConfig {
        warbots: 1,
        ..small_mission()
    };
    let result = run(&config, |_| {}).await;
    assert!(matches!(
        result,
        Err(RuntimeError::Config(ConfigError::Warbots(1)))
    ));
}
