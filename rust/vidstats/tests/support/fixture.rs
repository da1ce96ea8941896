use anyhow::Context;
use axum::Router;
use std::{env, future::Future};
use tokio_postgres::NoTls;
use vidstats::{config::AppConfig, server::Server};

pub const TEST_DATABASE_ENV: &str = "VIDSTATS_TEST_DATABASE_URL";

// Timestamps carry no offset so the seed and the queries both read them in the
// server's session time zone.
const FIXTURE_SQL: &str = r#"
DROP TABLE IF EXISTS video_snapshots;
DROP TABLE IF EXISTS videos;

CREATE TABLE videos (
    id               TEXT PRIMARY KEY,
    creator_id       TEXT NOT NULL,
    video_created_at TIMESTAMPTZ NOT NULL,
    views_count      BIGINT NOT NULL,
    likes_count      BIGINT NOT NULL,
    comments_count   BIGINT NOT NULL DEFAULT 0,
    reports_count    BIGINT NOT NULL DEFAULT 0,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE video_snapshots (
    id                   TEXT PRIMARY KEY,
    video_id             TEXT NOT NULL REFERENCES videos (id),
    views_count          BIGINT NOT NULL DEFAULT 0,
    likes_count          BIGINT NOT NULL DEFAULT 0,
    comments_count       BIGINT NOT NULL DEFAULT 0,
    reports_count        BIGINT NOT NULL DEFAULT 0,
    delta_views_count    BIGINT NOT NULL,
    delta_likes_count    BIGINT NOT NULL DEFAULT 0,
    delta_comments_count BIGINT NOT NULL DEFAULT 0,
    delta_reports_count  BIGINT NOT NULL DEFAULT 0,
    created_at           TIMESTAMPTZ NOT NULL,
    updated_at           TIMESTAMPTZ NOT NULL DEFAULT now()
);

INSERT INTO videos (id, creator_id, video_created_at, views_count, likes_count) VALUES
    ('video-1', 'creator-a', '2025-11-01 12:00:00', 150000, 10),
    ('video-2', 'creator-a', '2025-11-15 12:00:00',  50000,  5),
    ('video-3', 'creator-b', '2025-11-20 12:00:00', 200000, 20),
    ('video-4', 'creator-c', '2025-12-05 12:00:00', 300000,  1);

INSERT INTO video_snapshots (id, video_id, delta_views_count, created_at) VALUES
    ('snap-1', 'video-1', 100, '2025-11-28 09:00:00'),
    ('snap-2', 'video-1', 200, '2025-11-28 11:00:00'),
    ('snap-3', 'video-2', -50, '2025-11-28 12:00:00'),
    ('snap-4', 'video-3', 400, '2025-11-28 14:00:00'),
    ('snap-5', 'video-3',   0, '2025-11-28 16:00:00'),
    ('snap-6', 'video-1', -10, '2025-11-27 12:00:00'),
    ('snap-7', 'video-2',  30, '2025-11-27 13:00:00');
"#;

/// Runs `test` against a router backed by a real PostgreSQL database seeded
/// with the fixture above. Skips when `VIDSTATS_TEST_DATABASE_URL` is unset.
///
/// The fixture drops and recreates `videos` and `video_snapshots`; point the
/// variable at a throwaway database.
pub async fn with_seeded_database<F, Fut>(test: F)
where
    F: FnOnce(Router) -> Fut,
    Fut: Future<Output = ()>,
{
    let Ok(database_url) = env::var(TEST_DATABASE_ENV) else {
        eprintln!("[vidstats-test] skipping database test: {TEST_DATABASE_ENV} is not set");
        return;
    };

    seed_fixture_database(&database_url)
        .await
        .expect("failed to seed fixture database");

    let server = Server::new(AppConfig::embedded(database_url))
        .await
        .expect("failed to start vidstats against the fixture database");
    test(server.router()).await;
}

async fn seed_fixture_database(database_url: &str) -> anyhow::Result<()> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls)
        .await
        .context("failed to connect to fixture database")?;
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            eprintln!("[vidstats-test] fixture connection error: {err}");
        }
    });

    client
        .batch_execute(FIXTURE_SQL)
        .await
        .context("failed to apply fixture schema")?;

    drop(client);
    driver.await.context("fixture connection task panicked")?;
    Ok(())
}
