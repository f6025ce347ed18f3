pub const SCHEMA_SQL: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS network_info (
    row_id INTEGER PRIMARY KEY,
    mac TEXT UNIQUE,
    ip TEXT UNIQUE,
    dns_hostname TEXT UNIQUE,
    mdns_hostname TEXT,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS extra_network_info (
    network_id INTEGER NOT NULL REFERENCES network_info(row_id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    info TEXT NOT NULL,
    UNIQUE(network_id, type)
);

CREATE TABLE IF NOT EXISTS pet_info (
    row_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    identifier_type TEXT NOT NULL,
    identifier_value TEXT NOT NULL,
    device_type TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    mood TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS traffic_stats (
    name_id INTEGER NOT NULL REFERENCES pet_info(row_id) ON DELETE CASCADE,
    rx_bytes INTEGER NOT NULL,
    tx_bytes INTEGER NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_traffic_stats_name_ts ON traffic_stats(name_id, timestamp);

CREATE TABLE IF NOT EXISTS device_availability (
    name_id INTEGER NOT NULL REFERENCES pet_info(row_id) ON DELETE CASCADE,
    is_availabile INTEGER NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_device_availability_name_ts ON device_availability(name_id, timestamp);

CREATE TABLE IF NOT EXISTS device_cpu_stats (
    name_id INTEGER NOT NULL REFERENCES pet_info(row_id) ON DELETE CASCADE,
    cpu_used_percent REAL NOT NULL,
    mem_used_percent REAL NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_device_cpu_stats_name_ts ON device_cpu_stats(name_id, timestamp);

CREATE TABLE IF NOT EXISTS pet_relationships (
    name1_id INTEGER NOT NULL REFERENCES pet_info(row_id) ON DELETE CASCADE,
    name2_id INTEGER NOT NULL REFERENCES pet_info(row_id) ON DELETE CASCADE,
    relationship TEXT NOT NULL,
    UNIQUE(name1_id, name2_id)
);
";
