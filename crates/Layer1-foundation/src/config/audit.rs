//! Audit Config - 감사 설정
//!
//! 감사 활성화 여부, 기본 액터, 저장 타임아웃 등을 관리합니다.
//! 글로벌(~/.config/trail/audit.json) 설정 위에 프로젝트(.trail/audit.json)
//! 설정을 병합합니다.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 설정 파일명
pub const AUDIT_CONFIG_FILE: &str = "audit.json";

/// Identity recorded when no actor can be resolved.
pub const DEFAULT_ACTOR: &str = "system";

const DEFAULT_APPEND_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_RECENT_LIMIT: usize = 1_000;

/// How the interceptor hands a finished record to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    /// Append is awaited (bounded by the timeout) before the caller resumes
    #[default]
    Inline,
    /// Append is spawned and the caller resumes immediately
    Background,
}

/// 감사 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// 감사 활성화
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 액터를 알 수 없을 때 사용할 기본 액터
    #[serde(default = "default_actor")]
    pub default_actor: String,

    /// 제출 방식
    #[serde(default)]
    pub submit_mode: SubmitMode,

    /// 저장 타임아웃 (밀리초)
    #[serde(default = "default_append_timeout_ms")]
    pub append_timeout_ms: u64,

    /// 최근 기록 조회 최대 개수
    #[serde(default = "default_max_recent_limit")]
    pub max_recent_limit: usize,

    /// SQLite 데이터베이스 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

/// Contents of one `audit.json`: only keys present in the file are `Some`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfigLayer {
    pub enabled: Option<bool>,
    pub default_actor: Option<String>,
    pub submit_mode: Option<SubmitMode>,
    pub append_timeout_ms: Option<u64>,
    pub max_recent_limit: Option<usize>,
    pub database_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_actor: default_actor(),
            submit_mode: SubmitMode::default(),
            append_timeout_ms: default_append_timeout_ms(),
            max_recent_limit: default_max_recent_limit(),
            database_path: None,
        }
    }
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut stores = Vec::with_capacity(2);
        if let Ok(global) = JsonStore::global() {
            stores.push(global);
        }
        if let Ok(project) = JsonStore::current_project() {
            stores.push(project);
        }
        Self::load_layers(&stores)
    }

    /// Defaults, then each store's file in order. Later files win key by key.
    pub fn load_layers(stores: &[JsonStore]) -> Result<Self> {
        let mut config = Self::new();
        for store in stores {
            if let Some(layer) = store.load_optional::<AuditConfigLayer>(AUDIT_CONFIG_FILE)? {
                config.apply(layer);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from a single store, falling back to defaults when absent.
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Self::load_layers(std::slice::from_ref(store))
    }

    pub fn save_to(&self, store: &JsonStore) -> Result<()> {
        self.validate()?;
        store.save(AUDIT_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge / Validate
    // ========================================================================

    /// 파일에 있는 키만 덮어쓰기
    pub fn apply(&mut self, layer: AuditConfigLayer) {
        if let Some(enabled) = layer.enabled {
            self.enabled = enabled;
        }
        if let Some(actor) = layer.default_actor {
            self.default_actor = actor;
        }
        if let Some(mode) = layer.submit_mode {
            self.submit_mode = mode;
        }
        if let Some(millis) = layer.append_timeout_ms {
            self.append_timeout_ms = millis;
        }
        if let Some(limit) = layer.max_recent_limit {
            self.max_recent_limit = limit;
        }
        if let Some(path) = layer.database_path {
            self.database_path = Some(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_actor.trim().is_empty() {
            return Err(Error::Config("defaultActor must not be empty".to_string()));
        }
        if self.append_timeout_ms == 0 {
            return Err(Error::Config(
                "appendTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.max_recent_limit == 0 {
            return Err(Error::Config(
                "maxRecentLimit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }

    /// Configured database path, or `<data dir>/trail/audit.db`.
    pub fn resolved_database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trail")
            .join("audit.db")
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn default_actor(mut self, actor: impl Into<String>) -> Self {
        self.default_actor = actor.into();
        self
    }

    pub fn submit_mode(mut self, mode: SubmitMode) -> Self {
        self.submit_mode = mode;
        self
    }

    pub fn append_timeout_ms(mut self, millis: u64) -> Self {
        self.append_timeout_ms = millis;
        self
    }

    pub fn max_recent_limit(mut self, limit: usize) -> Self {
        self.max_recent_limit = limit;
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_actor() -> String {
    DEFAULT_ACTOR.to_string()
}

fn default_append_timeout_ms() -> u64 {
    DEFAULT_APPEND_TIMEOUT_MS
}

fn default_max_recent_limit() -> usize {
    DEFAULT_MAX_RECENT_LIMIT
}

// ============================================================================
// 테스트
// ============================================================================
