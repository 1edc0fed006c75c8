//! SQL schema for the fraudesk SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    rut           TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL    -- 'ACCOUNT_HOLDER' | 'CASEWORKER'
);

CREATE TABLE IF NOT EXISTS clients (
    client_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id  INTEGER NOT NULL UNIQUE REFERENCES identities(identity_id),
    rut          TEXT NOT NULL,
    full_name    TEXT NOT NULL,
    address      TEXT NOT NULL,
    email        TEXT NOT NULL UNIQUE,
    account      TEXT NOT NULL UNIQUE,
    phone_number TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS managers (
    manager_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id INTEGER NOT NULL UNIQUE REFERENCES identities(identity_id),
    rut         TEXT NOT NULL,
    full_name   TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    address     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tickets (
    ticket_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    card_type  TEXT NOT NULL,      -- 'CREDIT' | 'DEBIT'
    comment    TEXT NOT NULL,
    status     TEXT NOT NULL,      -- 'OPEN' | 'PENDING' | 'CLOSED'
    start_date TEXT NOT NULL,      -- YYYY-MM-DD
    end_date   TEXT,               -- YYYY-MM-DD once closed
    client_id  INTEGER NOT NULL REFERENCES clients(client_id),
    manager_id INTEGER REFERENCES managers(manager_id)
);

-- At most one OPEN/PENDING ticket per client and card.
CREATE UNIQUE INDEX IF NOT EXISTS tickets_one_active_idx
    ON tickets(client_id, card_type) WHERE status != 'CLOSED';
CREATE INDEX IF NOT EXISTS tickets_manager_status_idx ON tickets(manager_id, status);
CREATE INDEX IF NOT EXISTS tickets_status_idx         ON tickets(status);

-- An account owns its identity exclusively.
CREATE TRIGGER IF NOT EXISTS clients_drop_identity AFTER DELETE ON clients
BEGIN
    DELETE FROM identities WHERE identity_id = OLD.identity_id;
END;

CREATE TRIGGER IF NOT EXISTS managers_drop_identity AFTER DELETE ON managers
BEGIN
    DELETE FROM identities WHERE identity_id = OLD.identity_id;
END;

PRAGMA user_version = 1;
";
