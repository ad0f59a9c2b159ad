use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS donation_requests (
            id                      TEXT PRIMARY KEY,
            requester_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name                    TEXT NOT NULL,
            age                     INTEGER NOT NULL CHECK (age BETWEEN 16 AND 70),
            sex                     TEXT NOT NULL CHECK (sex IN ('M', 'F')),
            blood_type              TEXT NOT NULL,
            content                 TEXT NOT NULL,
            image_key               TEXT,
            location                TEXT NOT NULL,
            donation_due_date       TEXT NOT NULL,
            donator_registered_id   TEXT NOT NULL,
            status                  TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'selected', 'confirmed', 'reopened')),
            created_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_donation_requests_match
            ON donation_requests(blood_type, donation_due_date);

        CREATE TABLE IF NOT EXISTS rejected_matches (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            donation_request_id TEXT NOT NULL REFERENCES donation_requests(id) ON DELETE CASCADE,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, donation_request_id)
        );

        CREATE INDEX IF NOT EXISTS idx_rejected_matches_user
            ON rejected_matches(user_id);

        CREATE TABLE IF NOT EXISTS selected_matches (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            donation_request_id TEXT NOT NULL REFERENCES donation_requests(id) ON DELETE CASCADE,
            selected_at         TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, donation_request_id)
        );

        CREATE TABLE IF NOT EXISTS donation_posts (
            id              TEXT PRIMARY KEY,
            donor_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            image_key       TEXT,
            blood_type      TEXT NOT NULL,
            age             INTEGER NOT NULL,
            sex             TEXT NOT NULL CHECK (sex IN ('M', 'F')),
            region          TEXT NOT NULL,
            introduction    TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_donation_posts_created
            ON donation_posts(created_at);

        CREATE TABLE IF NOT EXISTS request_posts (
            id              TEXT PRIMARY KEY,
            requester_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            image_key       TEXT,
            blood_type      TEXT NOT NULL,
            region          TEXT NOT NULL,
            reason          TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_request_posts_created
            ON request_posts(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
