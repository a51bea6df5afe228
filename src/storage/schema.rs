//! Database schema for interaction storage.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the interaction database.
pub const SCHEMA: &str = r"
-- Enable WAL mode for better concurrent read/write performance
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Queries table: one row per completed kiosk question
CREATE TABLE IF NOT EXISTS queries (
    id TEXT PRIMARY KEY NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    user_type TEXT NOT NULL DEFAULT 'visitor',
    category TEXT,
    response_time_ms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Chat history table: individual user/assistant messages
CREATE TABLE IF NOT EXISTS chat_history (
    id TEXT PRIMARY KEY NOT NULL,
    query_id TEXT,
    message TEXT NOT NULL,
    is_user INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Analytics events table: interaction telemetry
CREATE TABLE IF NOT EXISTS analytics_events (
    id TEXT PRIMARY KEY NOT NULL,
    event_type TEXT NOT NULL,
    event_data TEXT,
    session_id TEXT,
    user_type TEXT,
    created_at TEXT NOT NULL
);

-- Feedback table: visitor ratings of answers
CREATE TABLE IF NOT EXISTS feedback (
    id TEXT PRIMARY KEY NOT NULL,
    query_id TEXT NOT NULL,
    rating TEXT NOT NULL,
    comment TEXT,
    created_at TEXT NOT NULL
);

-- Schema version table for migrations
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Indexes: retention deletes and admin queries filter on these
CREATE INDEX IF NOT EXISTS idx_queries_created_at ON queries(created_at);
CREATE INDEX IF NOT EXISTS idx_queries_category ON queries(category);
CREATE INDEX IF NOT EXISTS idx_chat_history_created_at ON chat_history(created_at);
CREATE INDEX IF NOT EXISTS idx_analytics_events_created_at ON analytics_events(created_at);
CREATE INDEX IF NOT EXISTS idx_feedback_created_at ON feedback(created_at);
CREATE INDEX IF NOT EXISTS idx_feedback_query_id ON feedback(query_id);
";
