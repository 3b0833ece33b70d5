//! Structured JSON-lines logging.
//!
//! Every record is one JSON object with `ts`, `run_id`, `seq`, `lvl`,
//! `component`, `event`, `msg` and a `data` payload. Records go to stdout;
//! when `LOG_DIR` is set they are also appended under `<LOG_DIR>/<run_id>/`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_LEVEL").as_deref().unwrap_or("info"))
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warn,
            "error" => Level::Error,
            "fatal" => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    View,     // Derived view construction
    Validate, // Dataset consistency checks
    Refresh,  // Refresh state transitions
    System,   // Configuration, startup
    Audit,    // View fingerprints
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::View => "view",
            Domain::Validate => "validate",
            Domain::Refresh => "refresh",
            Domain::System => "system",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    sink: Option<RunLog>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let sink = match std::env::var("LOG_DIR") {
            Ok(base) => match RunLog::open(Path::new(&base), &run_id) {
                Ok(sink) => Some(sink),
                Err(err) => {
                    eprintln!("[log] failed to open run dir under {}: {}", base, err);
                    None
                }
            },
            Err(_) => None,
        };
        RunContext { run_id, sink }
    })
}

/// File sink for one run: `events.jsonl` for info and above, `trace.jsonl`
/// for trace/debug.
#[derive(Debug)]
pub struct RunLog {
    dir: PathBuf,
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

impl RunLog {
    pub fn open(base: &Path, run_id: &str) -> std::io::Result<Self> {
        let dir = base.join(run_id);
        create_dir_all(&dir)?;
        let open = |name: &str| OpenOptions::new().create(true).append(true).open(dir.join(name));
        let events = open("events.jsonl")?;
        let trace = open("trace.jsonl")?;
        std::fs::write(
            dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
            })
            .to_string(),
        )?;
        Ok(Self {
            dir,
            events: Mutex::new(BufWriter::new(events)),
            trace: Mutex::new(BufWriter::new(trace)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, level: Level, line: &str) {
        let writer = match level {
            Level::Trace | Level::Debug => &self.trace,
            _ => &self.events,
        };
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let ctx = ensure_run_context();
    let line = render_record(&ctx.run_id, level, domain.as_str(), event, fields);
    if let Some(sink) = &ctx.sink {
        sink.write(level, &line);
    }
    println!("{}", line);
}

/// Build the JSON line for a record. `msg` is lifted out of the fields to the
/// top level; everything else lands under `data`.
pub fn render_record(
    run_id: &str,
    level: Level,
    component: &str,
    event: &str,
    mut fields: Map<String, Value>,
) -> String {
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_view_built(
    kpis: usize,
    periods: usize,
    vendors: usize,
    accounts: usize,
    warnings: usize,
    vendor_share: f64,
) {
    log(
        Level::Info,
        Domain::View,
        "view_built",
        obj(&[
            ("kpis", json!(kpis)),
            ("periods", json!(periods)),
            ("vendors", json!(vendors)),
            ("accounts", json!(accounts)),
            ("warnings", json!(warnings)),
            ("vendor_share", v_num(vendor_share)),
        ]),
    );
}

pub fn log_dataset_warning(kind: &str, msg: &str) {
    log(
        Level::Warn,
        Domain::Validate,
        "dataset_warning",
        obj(&[("kind", v_str(kind)), ("msg", v_str(msg))]),
    );
}

pub fn log_refresh_transition(from: &str, to: &str, completions: u64) {
    log(
        Level::Debug,
        Domain::Refresh,
        "transition",
        obj(&[
            ("from", v_str(from)),
            ("to", v_str(to)),
            ("completions", json!(completions)),
        ]),
    );
}

pub fn log_refresh_error(msg: &str) {
    log(
        Level::Error,
        Domain::Refresh,
        "transition_error",
        obj(&[("msg", v_str(msg))]),
    );
}

pub fn log_config_fallback(key: &str, raw: &str, reason: &str) {
    log(
        Level::Warn,
        Domain::System,
        "config_fallback",
        obj(&[
            ("key", v_str(key)),
            ("raw", v_str(raw)),
            ("msg", v_str(reason)),
        ]),
    );
}

/// Log a view fingerprint so repeated builds can be compared after the fact
pub fn log_audit(event_type: &str, fingerprint: &str) {
    log(
        Level::Info,
        Domain::Audit,
        event_type,
        obj(&[("fingerprint", v_str(fingerprint))]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_level_parse_defaults_to_info() {
        assert_eq!(Level::parse("warn"), Level::Warn);
        assert_eq!(Level::parse("loud"), Level::Info);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_non_finite_number_renders_null() {
        let m = obj(&[("vendor_share", v_num(f64::NAN))]);
        assert!(m["vendor_share"].is_null());
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_render_lifts_msg() {
        let line = render_record(
            "r-test",
            Level::Warn,
            "validate",
            "dataset_warning",
            obj(&[("msg", v_str("overdue exceeds total")), ("kind", v_str("overdue"))]),
        );
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["lvl"], "WARN");
        assert_eq!(v["run_id"], "r-test");
        assert_eq!(v["msg"], "overdue exceeds total");
        assert_eq!(v["data"]["kind"], "overdue");
        assert!(v["data"].get("msg").is_none());
    }

    #[test]
    fn test_run_log_splits_by_level() {
        let dir = TempDir::new().unwrap();
        let sink = RunLog::open(dir.path(), "r-1").unwrap();
        sink.write(Level::Info, "{\"event\":\"a\"}");
        sink.write(Level::Debug, "{\"event\":\"b\"}");

        let events = std::fs::read_to_string(sink.dir().join("events.jsonl")).unwrap();
        let trace = std::fs::read_to_string(sink.dir().join("trace.jsonl")).unwrap();
        assert_eq!(events.trim(), "{\"event\":\"a\"}");
        assert_eq!(trace.trim(), "{\"event\":\"b\"}");
        assert!(sink.dir().join("manifest.json").exists());
    }
}
