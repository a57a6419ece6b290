use std::path::PathBuf;

pub fn default_version() -> u32 {
    1
}

pub fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

pub fn default_tenant() -> String {
    "default".to_string()
}

pub fn default_jurisdiction() -> String {
    "Brazil".to_string()
}

pub fn default_timeout_sec() -> u64 {
    300 // 5 minutes
}

pub fn default_max_retries() -> u32 {
    2 // 3 attempts in total
}

pub fn default_concurrency() -> usize {
    5
}

pub fn default_min_analysis_responses() -> usize {
    3
}

pub fn default_min_analysis_responses_selected() -> usize {
    2
}

pub fn default_min_enrichment_responses() -> usize {
    2
}

pub fn default_max_severity_distance() -> u8 {
    1
}

pub fn default_min_verdict_outputs() -> usize {
    2
}

pub fn default_expiration_hours() -> u64 {
    24
}
