//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the census database.
//! Every entity table carries a UNIQUE constraint over its natural key, and
//! every junction table uses both sides as its primary key.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawled pages
CREATE TABLE IF NOT EXISTS website (
    website_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    root TEXT NOT NULL,
    visited TEXT NOT NULL,
    UNIQUE(name, url, root)
);

CREATE INDEX IF NOT EXISTS idx_website_url ON website(url);

-- Anchors found on crawled pages
CREATE TABLE IF NOT EXISTS hyperlink (
    hyperlink_id INTEGER PRIMARY KEY,
    url TEXT NOT NULL,
    inner_html TEXT NOT NULL,
    already_visited INTEGER NOT NULL DEFAULT 0,
    UNIQUE(url, inner_html)
);

CREATE INDEX IF NOT EXISTS idx_hyperlink_url ON hyperlink(url);

CREATE TABLE IF NOT EXISTS src_language (
    src_language_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS library (
    library_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    url TEXT NOT NULL,
    version TEXT NOT NULL,
    confidence INTEGER NOT NULL,
    UNIQUE(name, url, category, version, confidence)
);

CREATE TABLE IF NOT EXISTS framework (
    framework_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    url TEXT NOT NULL,
    version TEXT NOT NULL,
    confidence INTEGER NOT NULL,
    UNIQUE(name, url, category, version, confidence)
);

-- Embedded binary modules referenced from page scripts
CREATE TABLE IF NOT EXISTS embedded_module_file (
    embedded_module_file_id INTEGER PRIMARY KEY,
    local_file_name TEXT NOT NULL,
    source_file_name TEXT NOT NULL,
    source_script_name TEXT NOT NULL,
    file_size INTEGER,
    imports TEXT,
    exports TEXT,
    tables TEXT,
    memory TEXT,
    num_global INTEGER,
    num_func INTEGER,
    num_type INTEGER,
    UNIQUE(local_file_name, source_file_name, source_script_name)
);

CREATE TABLE IF NOT EXISTS embedded_module_function (
    embedded_module_function_id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS embedded_module (
    embedded_module_id INTEGER PRIMARY KEY,
    embedded_module_file_id INTEGER NOT NULL REFERENCES embedded_module_file(embedded_module_file_id),
    website_id INTEGER NOT NULL REFERENCES website(website_id),
    used INTEGER NOT NULL,
    use_case TEXT NOT NULL DEFAULT 'Unknown' CHECK(use_case IN (
        'None', 'Game', 'Compression', 'Cryptographic Utility',
        'Other Application', 'Image Processing', 'Unknown'
    )),
    UNIQUE(embedded_module_file_id, website_id, used, use_case)
);

CREATE TABLE IF NOT EXISTS ad_tracking (
    ad_tracking_id INTEGER PRIMARY KEY,
    used INTEGER NOT NULL,
    cookies TEXT,
    tracking_pixel TEXT,
    utm_links TEXT,
    website_id INTEGER NOT NULL REFERENCES website(website_id),
    UNIQUE(used, cookies, tracking_pixel, utm_links, website_id)
);

-- Junction tables
CREATE TABLE IF NOT EXISTS contains_library (
    website_id INTEGER NOT NULL REFERENCES website(website_id),
    library_id INTEGER NOT NULL REFERENCES library(library_id),
    PRIMARY KEY (website_id, library_id)
);

CREATE TABLE IF NOT EXISTS contains_framework (
    website_id INTEGER NOT NULL REFERENCES website(website_id),
    framework_id INTEGER NOT NULL REFERENCES framework(framework_id),
    PRIMARY KEY (website_id, framework_id)
);

CREATE TABLE IF NOT EXISTS implements_language (
    website_id INTEGER NOT NULL REFERENCES website(website_id),
    src_language_id INTEGER NOT NULL REFERENCES src_language(src_language_id),
    PRIMARY KEY (website_id, src_language_id)
);

CREATE TABLE IF NOT EXISTS has_hyperlink (
    website_id INTEGER NOT NULL REFERENCES website(website_id),
    hyperlink_id INTEGER NOT NULL REFERENCES hyperlink(hyperlink_id),
    PRIMARY KEY (website_id, hyperlink_id)
);

CREATE TABLE IF NOT EXISTS has_module_function (
    embedded_module_function_id INTEGER NOT NULL REFERENCES embedded_module_function(embedded_module_function_id),
    embedded_module_file_id INTEGER NOT NULL REFERENCES embedded_module_file(embedded_module_file_id),
    PRIMARY KEY (embedded_module_function_id, embedded_module_file_id)
);
"#;

/// Every table created by [`SCHEMA_SQL`], entities first
pub const TABLES: &[&str] = &[
    "website",
    "hyperlink",
    "src_language",
    "library",
    "framework",
    "embedded_module_file",
    "embedded_module_function",
    "embedded_module",
    "ad_tracking",
    "contains_library",
    "contains_framework",
    "implements_language",
    "has_hyperlink",
    "has_module_function",
];

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
