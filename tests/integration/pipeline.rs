//! End-to-end passes: providers → aggregator → composer → dispatcher.

use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Duration;

use matchday::engine::aggregator::{Aggregator, FailurePolicy};
use matchday::http::Transport;
use matchday::notify::composer::MessageComposer;
use matchday::notify::{DispatchError, Dispatcher, Notifier};
use matchday::providers::football_data::FootballDataProvider;
use matchday::providers::uol::UolProvider;
use matchday::providers::MatchProvider;
use matchday::types::{ApiError, Competition};

use crate::mock_provider::{game, match_day, MockChannel, MockProvider, RouteTransport};

fn brasilia() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).unwrap()
}

fn providers(list: &[&Arc<MockProvider>]) -> Vec<Arc<dyn MatchProvider>> {
    list.iter()
        .map(|p| Arc::clone(p) as Arc<dyn MatchProvider>)
        .collect()
}

fn channels(list: &[&Arc<MockChannel>]) -> Vec<Arc<dyn Notifier>> {
    list.iter()
        .map(|c| Arc::clone(c) as Arc<dyn Notifier>)
        .collect()
}

/// Aggregate, apply the policy, compose and dispatch, the way the binary
/// does. On failure the notice is dispatched instead.
async fn run_pass(
    aggregator: &Aggregator,
    dispatcher: &Dispatcher,
    policy: FailurePolicy,
) -> Result<(), String> {
    let composer = MessageComposer::new(brasilia());
    let aggregation = aggregator.aggregate(match_day()).await;
    let unavailable = aggregation.failed_competitions();

    match aggregation.into_result(policy) {
        Ok(matches) => {
            let message = composer.compose(match_day(), &matches, &unavailable);
            dispatcher
                .dispatch(&message)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        Err(e) => {
            let _ = dispatcher.dispatch(&composer.failure(&e)).await;
            Err(e.to_string())
        }
    }
}

#[tokio::test]
async fn test_digest_reaches_every_channel() {
    let primary = Arc::new(
        MockProvider::new("primary")
            .with_matches(Competition::Paulistao, vec![game(Competition::Paulistao, "Palmeiras", "Santos", 19)]),
    );
    let secondary = Arc::new(
        MockProvider::new("secondary")
            .with_matches(Competition::Libertadores, vec![game(Competition::Libertadores, "Flamengo", "Palestino", 22)]),
    );
    let discord = Arc::new(MockChannel::new("Discord"));
    let telegram = Arc::new(MockChannel::new("Telegram"));

    let aggregator = Aggregator::new(providers(&[&primary, &secondary]))
        .with_registry(vec![Competition::Paulistao, Competition::LaLiga, Competition::Libertadores]);
    let dispatcher = Dispatcher::new(channels(&[&discord, &telegram]));

    run_pass(&aggregator, &dispatcher, FailurePolicy::Partial).await.unwrap();

    let sent = discord.received();
    assert_eq!(sent.len(), 1);
    assert_eq!(telegram.received(), sent);

    let message = &sent[0];
    assert!(message.starts_with("# Jogos de Hoje - 10/03/2024"));
    let paulista = message.find("## Campeonato Paulista").unwrap();
    let libertadores = message.find("## Libertadores").unwrap();
    assert!(paulista < libertadores);
    assert!(message.contains("**Palmeiras** x **Santos** - :clock1: 16:00"));
    assert!(!message.contains("La Liga"));
}

#[tokio::test]
async fn test_failing_primary_falls_back_to_secondary() {
    let primary = Arc::new(
        MockProvider::new("primary")
            .with_error(Competition::LaLiga, ApiError::status(503, "maintenance"))
            .with_matches(Competition::Bundesliga, vec![game(Competition::Bundesliga, "Bayern", "Mainz", 14)]),
    );
    let secondary = Arc::new(
        MockProvider::new("secondary")
            .with_matches(Competition::LaLiga, vec![game(Competition::LaLiga, "Barcelona", "Mallorca", 20)])
            .with_matches(Competition::Bundesliga, vec![game(Competition::Bundesliga, "Dortmund", "Koln", 17)]),
    );

    let aggregator = Aggregator::new(providers(&[&primary, &secondary]))
        .with_registry(vec![Competition::Bundesliga, Competition::LaLiga]);
    let aggregation = aggregator.aggregate(match_day()).await;

    assert!(aggregation.is_complete());
    assert_eq!(aggregation.matches[&Competition::LaLiga][0].home_team, "Barcelona");
    // The primary answered for Bundesliga, so the secondary is never asked.
    assert_eq!(aggregation.matches[&Competition::Bundesliga][0].home_team, "Bayern");
    assert_eq!(secondary.calls(), vec![Competition::LaLiga]);
}

#[tokio::test]
async fn test_partial_pass_lists_unavailable_competitions() {
    let provider = Arc::new(
        MockProvider::new("only")
            .with_matches(Competition::PremierLeague, vec![game(Competition::PremierLeague, "Arsenal", "Brentford", 15)])
            .with_error(Competition::Italiano, ApiError::Transport("connection reset".into())),
    );
    let channel = Arc::new(MockChannel::new("Discord"));

    let aggregator = Aggregator::new(providers(&[&provider]))
        .with_registry(vec![Competition::PremierLeague, Competition::Italiano]);
    let dispatcher = Dispatcher::new(channels(&[&channel]));

    run_pass(&aggregator, &dispatcher, FailurePolicy::Partial).await.unwrap();

    let message = &channel.received()[0];
    assert!(message.contains("## Premier League"));
    assert!(message.ends_with(":warning: Não foi possível buscar: Serie A Italiana\n"));
}

#[tokio::test]
async fn test_all_or_nothing_sends_failure_notice() {
    let provider = Arc::new(
        MockProvider::new("only")
            .with_matches(Competition::PremierLeague, vec![game(Competition::PremierLeague, "Arsenal", "Brentford", 15)])
            .with_error(Competition::Italiano, ApiError::Transport("connection reset".into())),
    );
    let channel = Arc::new(MockChannel::new("Discord"));

    let aggregator = Aggregator::new(providers(&[&provider]))
        .with_registry(vec![Competition::PremierLeague, Competition::Italiano]);
    let dispatcher = Dispatcher::new(channels(&[&channel]));

    let err = run_pass(&aggregator, &dispatcher, FailurePolicy::AllOrNothing)
        .await
        .unwrap_err();
    assert!(err.starts_with("list matches to Serie A Italiana"));
    assert!(err.contains("connection reset"));

    let sent = channel.received();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("Erro ao buscar os jogos de hoje: list matches to Serie A Italiana"));
}

#[tokio::test]
async fn test_nothing_found_sends_no_matches_message() {
    let provider = Arc::new(MockProvider::new("empty").with_matches(Competition::Saudita, vec![]));
    let channel = Arc::new(MockChannel::new("Telegram"));

    let aggregator = Aggregator::new(providers(&[&provider]));
    let dispatcher = Dispatcher::new(channels(&[&channel]));

    run_pass(&aggregator, &dispatcher, FailurePolicy::AllOrNothing).await.unwrap();
    assert_eq!(channel.received(), vec!["Não existem jogos para hoje.".to_string()]);
}

#[tokio::test]
async fn test_one_channel_down_still_delivers() {
    let up = Arc::new(MockChannel::new("Discord"));
    let down = Arc::new(MockChannel::new("Telegram"));
    down.set_error(ApiError::status(401, "Unauthorized"));

    let dispatcher = Dispatcher::new(channels(&[&up, &down]));
    let delivery = dispatcher.dispatch("hello").await.unwrap();
    assert_eq!(up.received(), vec!["hello".to_string()]);
    assert_eq!(delivery.delivered, vec!["Discord"]);
    assert_eq!(delivery.failed[0].channel, "Telegram");
}

#[tokio::test]
async fn test_every_channel_down_is_an_error() {
    let first = Arc::new(MockChannel::new("Discord"));
    let second = Arc::new(MockChannel::new("Telegram"));
    first.set_error(ApiError::status(404, "Unknown Webhook"));
    second.set_error(ApiError::Transport("timed out".into()));

    let dispatcher = Dispatcher::new(channels(&[&first, &second]));
    match dispatcher.dispatch("hello").await.unwrap_err() {
        DispatchError::AllFailed(composite) => {
            assert_eq!(composite.len(), 2);
            assert_eq!(composite.errors()[0].channel, "Discord");
            assert_eq!(composite.errors()[1].channel, "Telegram");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrency_limit_holds_across_the_registry() {
    let mut slow = MockProvider::new("slow").with_delay(Duration::from_millis(30));
    for competition in Competition::ALL {
        slow = slow.with_matches(*competition, vec![]);
    }
    let slow = Arc::new(slow);

    let aggregator = Aggregator::new(providers(&[&slow])).with_concurrency(2);
    let aggregation = aggregator.aggregate(match_day()).await;

    assert!(aggregation.is_complete());
    assert!(aggregation.matches.is_empty());
    assert_eq!(slow.calls().len(), Competition::ALL.len());
    assert!(slow.peak_in_flight() <= 2);
}

#[tokio::test]
async fn test_hung_competition_is_cut_by_deadline() {
    let provider = Arc::new(
        MockProvider::new("hung")
            .with_matches(Competition::Ligue1, vec![game(Competition::Ligue1, "PSG", "Lyon", 20)])
            .with_delay(Duration::from_secs(5)),
    );

    let aggregator = Aggregator::new(providers(&[&provider]))
        .with_registry(vec![Competition::Ligue1])
        .with_deadline(Duration::from_millis(50));
    let aggregation = aggregator.aggregate(match_day()).await;

    assert_eq!(aggregation.failed_competitions(), vec![Competition::Ligue1]);
    assert!(aggregation.matches.is_empty());
}

// ---------------------------------------------------------------------------
// Real providers over canned HTTP bodies
// ---------------------------------------------------------------------------

const UOL_BODY: &str = r#"{
    "equipes": {
        "1": {"nome-completo": "Palmeiras"},
        "2": {"nome-completo": "Corinthians"}
    },
    "jogos": {
        "g1": {"id-competicao": "104", "data": "2024-03-10", "horario": "16h00",
               "time1": "1", "time2": "2", "placar1": 2, "placar2": 1},
        "g2": {"id-competicao": "79", "data": "2024-03-11", "horario": "12h30",
               "time1": "1", "time2": "2"}
    }
}"#;

const CLI_BODY: &str = r#"{"matches": [{
    "utcDate": "2024-03-10T22:00:00Z",
    "homeTeam": {"name": "Flamengo"},
    "awayTeam": {"name": "Palestino"},
    "score": {"fullTime": {"home": null, "away": null}}
}]}"#;

#[tokio::test]
async fn test_uol_then_football_data_over_http() {
    let uol_transport = Arc::new(RouteTransport::new().route("?loadComponent=api", UOL_BODY));
    let fd_transport = Arc::new(
        RouteTransport::new()
            .route("/competitions/PL/", r#"{"matches": []}"#)
            .route("/competitions/CLI/", CLI_BODY),
    );

    let uol = UolProvider::new(Arc::clone(&uol_transport) as Arc<dyn Transport>, brasilia());
    let fd = FootballDataProvider::new(Arc::clone(&fd_transport) as Arc<dyn Transport>);
    let list: Vec<Arc<dyn MatchProvider>> = vec![Arc::new(uol), Arc::new(fd)];

    let aggregator = Aggregator::new(list)
        .with_registry(vec![
            Competition::Paulistao,
            Competition::PremierLeague,
            Competition::Libertadores,
            Competition::Brasileirao,
        ])
        .with_concurrency(4);
    let channel = Arc::new(MockChannel::new("Discord"));
    let dispatcher = Dispatcher::new(channels(&[&channel]));

    run_pass(&aggregator, &dispatcher, FailurePolicy::Partial).await.unwrap();

    // One dataset download shared by every UOL lookup.
    assert_eq!(uol_transport.hits("?loadComponent=api"), 1);
    // UOL had nothing for Premier League that day, so football-data.org was asked.
    assert_eq!(fd_transport.hits("/competitions/PL/"), 1);
    // Brasileirão is only on football-data.org, which has no route for it.
    assert_eq!(fd_transport.hits("/competitions/BSA/"), 1);

    let message = &channel.received()[0];
    assert!(message.contains("**Palmeiras** 2 x 1 **Corinthians** - :clock1: 16:00"));
    assert!(message.contains("**Flamengo** x **Palestino** - :clock1: 19:00"));
    assert!(!message.contains("Premier League"));
    assert!(message.ends_with(":warning: Não foi possível buscar: Brasileirão Serie A\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_passes_share_one_dataset_and_agree() {
    let transport = Arc::new(
        RouteTransport::new()
            .route("?loadComponent=api", UOL_BODY)
            .with_latency(Duration::from_millis(50)),
    );
    let uol: Arc<dyn MatchProvider> = Arc::new(UolProvider::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        brasilia(),
    ));
    let aggregator = Aggregator::new(vec![uol]);

    let passes = futures::future::join_all((0..3).map(|_| aggregator.aggregate(match_day()))).await;

    assert_eq!(transport.hits("?loadComponent=api"), 1);
    for pass in &passes {
        assert!(pass.is_complete());
        assert_eq!(pass.matches, passes[0].matches);
        assert_eq!(pass.matches.len(), 1);
    }
}
