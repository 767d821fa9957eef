//! End-to-end ingestion: mock registry -> flatten -> order -> PostgreSQL

mod common;

use common::{init_test_tracing, studies_page, study, TestPostgres};
use ctp_ingest::{ApiConfig, DatabaseConfig, FlatTrialRow, IngestConfig, Ingestor};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn registry_with_two_studies() -> MockServer {
    let server = MockServer::start().await;

    let studies = vec![
        json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT05000001", "briefTitle": "Metabolic study"},
                "statusModule": {
                    "overallStatus": "RECRUITING",
                    "startDateStruct": {"date": "2023-06"},
                    "completionDateStruct": {"date": "2026-01-31"}
                },
                "designModule": {"studyType": "INTERVENTIONAL", "phases": ["PHASE2", "PHASE3"]},
                "conditionsModule": {"conditions": ["Diabetes", "Obesity"]},
                "armsInterventionsModule": {"interventions": [{"name": "Metformin"}, {"type": "DRUG"}]},
                "contactsLocationsModule": {"locations": [{"country": "Spain"}, {"country": "Chile"}]}
            }
        }),
        json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT05000002", "briefTitle": "Registry only"},
                "designModule": {"studyType": "OBSERVATIONAL"}
            }
        }),
    ];

    Mock::given(method("GET"))
        .and(path("/api/v2/studies"))
        .and(query_param("pageSize", "100"))
        .and(query_param("countTotal", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(studies_page(studies, None)))
        .mount(&server)
        .await;

    server
}

fn config_for(server: &MockServer, database: DatabaseConfig) -> IngestConfig {
    IngestConfig {
        api: ApiConfig {
            base_url: format!("{}/api/v2/studies", server.uri()),
            ..ApiConfig::default()
        },
        database,
    }
}

fn expected_rows() -> Vec<FlatTrialRow> {
    vec![
        FlatTrialRow {
            nct_id: Some("NCT05000001".into()),
            brief_title: Some("Metabolic study".into()),
            study_type: Some("INTERVENTIONAL".into()),
            phase: Some("PHASE2".into()),
            overall_status: Some("RECRUITING".into()),
            start_date: Some("2023-06".into()),
            completion_date: Some("2026-01-31".into()),
            conditions: Some("Diabetes; Obesity".into()),
            interventions: Some("Metformin; ".into()),
            countries: Some("Spain; Chile".into()),
        },
        FlatTrialRow {
            nct_id: Some("NCT05000002".into()),
            brief_title: Some("Registry only".into()),
            study_type: Some("OBSERVATIONAL".into()),
            ..FlatTrialRow::default()
        },
    ]
}

#[tokio::test]
async fn test_collect_flattens_and_orders_without_database() {
    init_test_tracing();
    let server = registry_with_two_studies().await;
    let ingestor = Ingestor::new(&config_for(&server, DatabaseConfig::default())).unwrap();

    let (batch, pages) = ingestor.collect().await.unwrap();

    assert_eq!(pages, 1);
    assert_eq!(batch, expected_rows());
}

#[tokio::test]
async fn test_undated_studies_load_last() {
    let server = MockServer::start().await;
    let studies = vec![
        study("NCT00000001", "Old", Some("2021-05-01")),
        study("NCT00000002", "Undated", None),
        study("NCT00000003", "New", Some("2023-01-01")),
    ];
    Mock::given(method("GET"))
        .and(path("/api/v2/studies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(studies_page(studies, None)))
        .mount(&server)
        .await;

    let ingestor = Ingestor::new(&config_for(&server, DatabaseConfig::default())).unwrap();
    let (batch, _) = ingestor.collect().await.unwrap();

    let dates: Vec<_> = batch.iter().map(|r| r.start_date.as_deref()).collect();
    assert_eq!(dates, [Some("2023-01-01"), Some("2021-05-01"), None]);
}

#[tokio::test]
async fn test_exhausted_registry_is_a_successful_empty_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/studies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"studies": []})))
        .expect(1)
        .mount(&server)
        .await;

    // The destination is unreachable; an empty batch must not touch it
    let database = DatabaseConfig {
        host: "127.0.0.1".into(),
        port: 1,
        connect_timeout_secs: 1,
        ..DatabaseConfig::default()
    };
    let report = Ingestor::new(&config_for(&server, database))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.records_fetched, 0);
    assert_eq!(report.load.inserted, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_repeated_runs_converge_on_same_table() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let server = registry_with_two_studies().await;
    let ingestor = Ingestor::new(&config_for(&server, pg.database_config())).unwrap();

    let first = ingestor.run().await.unwrap();
    assert_eq!(first.records_fetched, 2);
    assert_eq!(first.load.inserted, 2);

    let second = ingestor.run().await.unwrap();
    assert_eq!(second.load.inserted, 0);
    assert_eq!(second.load.skipped, 2);
    assert_ne!(first.run_id, second.run_id);

    let stored = sqlx::query_as::<_, FlatTrialRow>(
        "SELECT nct_id, brief_title, study_type, phase, overall_status, start_date, \
         completion_date, conditions, interventions, countries \
         FROM bronze.raw_trials ORDER BY nct_id",
    )
    .fetch_all(pg.pool())
    .await
    .unwrap();
    assert_eq!(stored, expected_rows());
}
