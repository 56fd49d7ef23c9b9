//! 토큰 발급 시각 공급자.

use chrono::{DateTime, Utc};

/// 현재 시각을 제공합니다. `iat`/`exp` 계산에 사용됩니다.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 고정 시각 시계.
///
/// 과거 시각으로 고정하면 이미 만료된 토큰을 발급할 수 있습니다.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
