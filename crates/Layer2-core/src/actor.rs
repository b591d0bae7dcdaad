//! Actor resolution - 누가 작업을 실행했는가
//!
//! 인터셉터는 작업 시작 시점에 `ActorResolver`를 한 번 호출합니다.
//! 리졸버가 `None`이나 빈 문자열을 돌려주면 설정의 기본 액터가 기록됩니다.
//!
//! ```ignore
//! // 요청 컨텍스트를 명시적으로 전달
//! let ctx = AuditContext::for_actor("alice");
//! auditor.audit("habit.create", &ctx, || service.create(req)).await?;
//!
//! // 클로저도 리졸버로 사용 가능
//! auditor.audit("sync", &|| session.user(), || sync()).await?;
//! ```

/// Supplies the identity of whoever triggered an operation.
pub trait ActorResolver: Send + Sync {
    /// Current actor, or `None` when unknown.
    fn resolve(&self) -> Option<String>;
}

impl<F> ActorResolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn resolve(&self) -> Option<String> {
        self()
    }
}

/// Resolve through `resolver`, falling back to `default_actor` for blank identities.
pub fn resolve_or_default<R>(resolver: &R, default_actor: &str) -> String
where
    R: ActorResolver + ?Sized,
{
    resolver
        .resolve()
        .map(|actor| actor.trim().to_string())
        .filter(|actor| !actor.is_empty())
        .unwrap_or_else(|| default_actor.to_string())
}

// ============================================================================
// AuditContext
// ============================================================================

/// Per-request context carried explicitly by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    actor: Option<String>,
}

impl AuditContext {
    /// Context with no known actor
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
        }
    }
}

impl ActorResolver for AuditContext {
    fn resolve(&self) -> Option<String> {
        self.actor.clone()
    }
}

// ============================================================================
// EnvActor
// ============================================================================

/// Reads the actor from environment variables, first non-empty wins.
#[derive(Debug, Clone)]
pub struct EnvActor {
    vars: Vec<String>,
}

impl Default for EnvActor {
    /// `TRAIL_ACTOR`, then the login user
    fn default() -> Self {
        Self::from_vars(["TRAIL_ACTOR", "USER", "USERNAME"])
    }
}

impl EnvActor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vars<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }
}

impl ActorResolver for EnvActor {
    fn resolve(&self) -> Option<String> {
        self.vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    }
}
