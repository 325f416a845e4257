// ==========================================
// 物业批量导入系统 - 实体缓存
// ==========================================
// 职责: 按自然键缓存已解析 / 已创建的实体
// - 自然键归一化: trim + 小写
// - TTL 读时惰性检查,过期条目视为不存在并移除
// - 超出容量时淘汰命中次数最少的一条（并列取最早写入）
// - 未命中时调用查询方,锁不跨 await 持有
// 每种实体类型一个实例,互不共享条目
// ==========================================

use crate::domain::{Entity, EntityType};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub inserted_at: Instant,
    pub hit_count: u64,
}

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub lookups: u64, // 实际调用查询方的次数
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
}

struct CacheInner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    stats: CacheStats,
}

pub struct EntityCache<T> {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<CacheInner<T>>,
}

/// 自然键归一化
///
/// 只折叠 ASCII 大小写,与 SQLite `COLLATE NOCASE` 一致;
/// 非 ASCII 字母（如 "É" / "é"）视为不同的键
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

impl<T: Clone> EntityCache<T> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<T>> {
        // 缓存内容可丢弃,锁中毒时继续使用内部数据
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) > self.ttl
    }

    /// 仅查缓存（命中则累加命中次数）
    pub fn get(&self, key: &str) -> Option<T> {
        let key = normalize_key(key);
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(&key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                inner.stats.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.remove(&key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }

        inner.stats.hits += 1;
        inner.entries.get_mut(&key).map(|entry| {
            entry.hit_count += 1;
            entry.value.clone()
        })
    }

    /// 解析自然键: 先查缓存,未命中时调用查询方并缓存找到的结果
    ///
    /// # 参数
    /// - key: 自然键（内部归一化）
    /// - lookup: 查询方,接收归一化前的原始键
    pub async fn resolve<F, Fut, E>(&self, key: &str, lookup: F) -> Result<Option<T>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }

        self.lock().stats.lookups += 1;
        let found = lookup(key.trim().to_string()).await?;

        if let Some(value) = &found {
            self.store(key, value.clone());
        }
        Ok(found)
    }

    /// 直接写入（如创建成功后）
    pub fn store(&self, key: &str, value: T) {
        let key = normalize_key(key);
        let now = Instant::now();
        let mut inner = self.lock();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = now;
            return;
        }

        if inner.entries.len() >= self.capacity {
            let victim = inner
                .entries
                .iter()
                .min_by(|(_, a), (_, b)| {
                    a.hit_count
                        .cmp(&b.hit_count)
                        .then(a.inserted_at.cmp(&b.inserted_at))
                })
                .map(|(k, _)| k.clone());

            if let Some(victim) = victim {
                inner.entries.remove(&victim);
                inner.stats.evictions += 1;
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                hit_count: 0,
            },
        );
    }

    /// 是否存在未过期条目（不影响统计与命中次数）
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .entries
            .get(&normalize_key(key))
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// 条目命中次数（测试与诊断用）
    pub fn hit_count(&self, key: &str) -> Option<u64> {
        self.lock()
            .entries
            .get(&normalize_key(key))
            .map(|entry| entry.hit_count)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            size: inner.entries.len(),
            ..inner.stats
        }
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}

// ==========================================
// EntityCaches - 每种实体一个缓存
// ==========================================
pub struct EntityCaches {
    owners: EntityCache<Entity>,
    buildings: EntityCache<Entity>,
    tenants: EntityCache<Entity>,
    units: EntityCache<Entity>,
}

impl EntityCaches {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            owners: EntityCache::new(capacity, ttl),
            buildings: EntityCache::new(capacity, ttl),
            tenants: EntityCache::new(capacity, ttl),
            units: EntityCache::new(capacity, ttl),
        }
    }

    pub fn for_type(&self, entity_type: EntityType) -> &EntityCache<Entity> {
        match entity_type {
            EntityType::Owner => &self.owners,
            EntityType::Building => &self.buildings,
            EntityType::Tenant => &self.tenants,
            EntityType::Unit => &self.units,
        }
    }

    /// 输出各缓存统计
    pub fn log_stats(&self, import_id: &str) {
        for entity_type in EntityType::ALL {
            let stats = self.for_type(entity_type).stats();
            tracing::debug!(
                import_id,
                entity_type = %entity_type,
                hits = stats.hits,
                misses = stats.misses,
                lookups = stats.lookups,
                evictions = stats.evictions,
                expirations = stats.expirations,
                size = stats.size,
                "实体缓存统计"
            );
        }
    }
}
