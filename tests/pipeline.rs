use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use user_etl::pipeline::config::{CleanConfig, CorruptConfig, EnrichConfig, FetchConfig, StoreConfig};
use user_etl::pipeline::utils::read_csv;
use user_etl::pipeline::{clean, corrupt, enrich, ingest, store, Config, IngestMode};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/", addr)
}

fn random_user_api() -> Router {
    Router::new().route(
        "/api/",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let count: usize = params
                .get("results")
                .and_then(|r| r.parse().ok())
                .unwrap_or(1);
            let results: Vec<Value> = (0..count)
                .map(|i| {
                    json!({
                        "gender": "female",
                        "name": { "first": format!("Name{}", i), "last": "Smith" },
                        "location": { "country": "United States" },
                        "email": format!("name{}@example.com", i),
                    })
                })
                .collect();
            Json(json!({ "results": results }))
        }),
    )
}

fn config_in(dir: &Path, api_url: String, results: usize) -> Config {
    Config {
        store: StoreConfig {
            database_path: dir.join("db").join("user_data.db"),
            ingest_mode: IngestMode::Permissive,
        },
        fetch: FetchConfig {
            api_url,
            results,
            nationality: Some("us".to_string()),
        },
        corrupt: CorruptConfig {
            seed: Some(2024),
            ..CorruptConfig::default()
        },
        clean: CleanConfig {
            cleaned_data_path: dir.join("output").join("cleaned_data.csv"),
            report_path: dir.join("audit").join("cleaning_report.txt"),
        },
        enrich: EnrichConfig {
            cleaned_data_path: dir.join("output").join("cleaned_data.csv"),
            additional_data_path: dir.join("input").join("dataset.csv"),
            enriched_data_path: dir.join("output").join("enriched_data.csv"),
            report_path: dir.join("audit").join("enriched_report.txt"),
        },
    }
}

fn write_additional_dataset(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        path,
        "nombre,apellido,email,genero,pais,fecha_extraccion\n\
         Luz,Rojas,luz@example.com,female,Peru,2024-01-01 09:00:00\n\
         Leo,Vega,leo@example.com,male,Chile,2024-01-01 09:00:00\n\
         Ada,Mora,ada@example.com,female,Spain,2024-01-01 09:00:00\n",
    )
    .unwrap();
}

#[tokio::test]
async fn full_pipeline_ingest_corrupt_clean_enrich() {
    let temp = tempdir().unwrap();
    let url = serve(random_user_api()).await;
    let config = config_in(temp.path(), url, 40);
    write_additional_dataset(&config.enrich.additional_data_path);

    let written = ingest::run(&config).await.unwrap();
    assert_eq!(written.inserted, 40);

    let corrupted = corrupt::run(&config).await.unwrap();
    assert_eq!(corrupted.duplicated, 4);
    assert_eq!(corrupted.nulled, 2);

    let outcome = clean::run(&config).await.unwrap();
    assert_eq!(outcome.before.total_rows, 44);
    assert_eq!(outcome.before.null_count("nombre"), Some(2));
    assert_eq!(outcome.after.duplicate_rows, 0);
    assert_eq!(outcome.after.total_nulls(), 0);
    assert!(outcome.after.total_rows >= 38 && outcome.after.total_rows <= 40);

    let counts = enrich::run(&config.enrich).unwrap();
    assert_eq!(counts.base_rows, outcome.after.total_rows);
    assert_eq!(counts.additional_rows, 3);
    assert_eq!(counts.enriched_rows, counts.base_rows + counts.additional_rows);

    let enriched = read_csv(&config.enrich.enriched_data_path).unwrap();
    assert_eq!(enriched.row_count(), counts.enriched_rows);
    assert_eq!(enriched.columns.len(), 6);

    assert!(fs::read_to_string(&config.clean.report_path)
        .unwrap()
        .contains("Before cleaning:\ntotal rows: 44\n"));
    assert!(fs::read_to_string(&config.enrich.report_path)
        .unwrap()
        .contains("Additional dataset rows: 3\n"));
}

#[tokio::test]
async fn api_failure_leaves_empty_store_and_empty_clean_output() {
    let temp = tempdir().unwrap();
    let app = Router::new().route("/api/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let url = serve(app).await;
    let config = config_in(temp.path(), url, 5);

    let written = ingest::run(&config).await.unwrap();
    assert_eq!(written.inserted, 0);

    let db = store::connect(&config.store.database_path).await.unwrap();
    assert_eq!(store::count_users(&db).await.unwrap(), 0);
    db.close().await;

    let outcome = clean::run(&config).await.unwrap();
    assert_eq!(outcome.before.total_rows, 0);
    assert_eq!(read_csv(&config.clean.cleaned_data_path).unwrap().row_count(), 0);
}
