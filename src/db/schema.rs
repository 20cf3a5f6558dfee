pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS scan_targets (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    target_type TEXT NOT NULL,
    target_value TEXT NOT NULL,
    cloud_provider TEXT,
    cloud_region TEXT,
    repository_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    scan_frequency TEXT NOT NULL DEFAULT 'manual',
    last_scan_at TEXT,
    next_scan_at TEXT,
    risk_score INTEGER NOT NULL DEFAULT 0,
    criticality TEXT NOT NULL DEFAULT 'medium',
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scan_results (
    id TEXT PRIMARY KEY,
    target_id TEXT NOT NULL REFERENCES scan_targets(id) ON DELETE CASCADE,
    company_id TEXT NOT NULL,
    scan_type TEXT NOT NULL DEFAULT 'network_scan',
    status TEXT NOT NULL DEFAULT 'queued',
    started_at TEXT,
    completed_at TEXT,
    duration_seconds INTEGER,
    scan_config TEXT NOT NULL DEFAULT '{}',
    total_vulnerabilities INTEGER NOT NULL DEFAULT 0,
    critical_count INTEGER NOT NULL DEFAULT 0,
    high_count INTEGER NOT NULL DEFAULT 0,
    medium_count INTEGER NOT NULL DEFAULT 0,
    low_count INTEGER NOT NULL DEFAULT 0,
    info_count INTEGER NOT NULL DEFAULT 0,
    risk_score INTEGER NOT NULL DEFAULT 0,
    risk_score_delta INTEGER NOT NULL DEFAULT 0,
    raw_output TEXT,
    parsed_data TEXT NOT NULL DEFAULT '{}',
    error_message TEXT,
    initiated_by TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vulnerabilities (
    id TEXT PRIMARY KEY,
    scan_result_id TEXT NOT NULL REFERENCES scan_results(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES scan_targets(id) ON DELETE CASCADE,
    company_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    cve_id TEXT,
    cvss_score REAL,
    affected_asset TEXT NOT NULL,
    scanner_name TEXT NOT NULL,
    remediation TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    assigned_to TEXT,
    due_date TEXT,
    resolved_by TEXT,
    resolved_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_targets_company ON scan_targets(company_id);
CREATE INDEX IF NOT EXISTS idx_scans_company ON scan_results(company_id);
CREATE INDEX IF NOT EXISTS idx_scans_target ON scan_results(target_id);
CREATE INDEX IF NOT EXISTS idx_scans_status ON scan_results(status);
CREATE INDEX IF NOT EXISTS idx_vulns_scan ON vulnerabilities(scan_result_id);
CREATE INDEX IF NOT EXISTS idx_vulns_company ON vulnerabilities(company_id);
CREATE INDEX IF NOT EXISTS idx_vulns_severity ON vulnerabilities(severity);
";
