//! UI theme preference
//!
//! The selected theme is persisted under the `theme` storage key. Unknown or
//! missing values fall back to `modern-white`.

use std::sync::RwLock;

use crate::storage::{get_non_empty, SharedStore, StorageError, THEME_KEY};

/// Theme used when nothing valid is stored
pub const DEFAULT_THEME: &str = "modern-white";

/// Theme group shown in the settings grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeGroup {
    White,
    Dark,
    Brand,
}

/// One selectable theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeMeta {
    pub key: &'static str,
    pub name: &'static str,
    pub desc: &'static str,
    pub group: ThemeGroup,
}

/// Theme catalogue in display order
pub const THEMES: &[ThemeMeta] = &[
    ThemeMeta { key: "modern-white", name: "Modern White", desc: "기본 · 깨끗한 관리자 콘솔", group: ThemeGroup::White },
    ThemeMeta { key: "navy-pro", name: "Navy Pro", desc: "프로덕션형 · 블루/네이비 기반", group: ThemeGroup::White },
    ThemeMeta { key: "ivory-office", name: "Ivory Office", desc: "따뜻한 아이보리 · 오피스 톤", group: ThemeGroup::White },
    ThemeMeta { key: "minimal-mono", name: "Minimal Mono", desc: "최소 표현 · 모노톤", group: ThemeGroup::White },
    ThemeMeta { key: "modern-dark", name: "Modern Dark", desc: "저눈부심 · 프리미엄 다크", group: ThemeGroup::Dark },
    ThemeMeta { key: "dark-navy", name: "Dark Navy", desc: "야간/장시간 · 네이비 다크", group: ThemeGroup::Dark },
    ThemeMeta { key: "youtube-studio", name: "YouTube Studio", desc: "다크 + 강한 레드 포인트", group: ThemeGroup::Dark },
    ThemeMeta { key: "terminal-neon", name: "Terminal Neon", desc: "개발자 톤 · 네온 다크", group: ThemeGroup::Dark },
    ThemeMeta { key: "kakao-business", name: "Kakao Business", desc: "브랜드 강조 · 카카오 톤", group: ThemeGroup::Brand },
    ThemeMeta { key: "naver-works", name: "Naver Works", desc: "업무형 · 네이버웍스 톤", group: ThemeGroup::Brand },
    ThemeMeta { key: "samsung-admin", name: "Samsung Admin", desc: "기업형 · 삼성 블루", group: ThemeGroup::Brand },
    ThemeMeta { key: "purple-insight", name: "Purple Insight", desc: "분석/통계 · 퍼플 프리미엄", group: ThemeGroup::Brand },
];

/// Look up a theme by key
pub fn theme_meta(key: &str) -> Option<&'static ThemeMeta> {
    THEMES.iter().find(|t| t.key == key)
}

/// Holds the active theme
pub struct ThemeService {
    store: SharedStore,
    current: RwLock<&'static ThemeMeta>,
}

impl ThemeService {
    /// Load the persisted theme
    pub fn load(store: SharedStore) -> Self {
        let stored = get_non_empty(store.as_ref(), THEME_KEY);
        let meta = match stored.as_deref().and_then(theme_meta) {
            Some(meta) => meta,
            None => {
                if let Some(unknown) = stored {
                    tracing::warn!(theme = %unknown, "Ignoring unknown stored theme");
                }
                default_meta()
            }
        };

        Self {
            store,
            current: RwLock::new(meta),
        }
    }

    /// Active theme
    pub fn current(&self) -> &'static ThemeMeta {
        self.current.read().map_or_else(|_| default_meta(), |m| *m)
    }

    /// Switch and persist; returns `false` for an unknown key
    pub fn set_theme(&self, key: &str) -> Result<bool, StorageError> {
        let Some(meta) = theme_meta(key) else {
            return Ok(false);
        };
        self.store.set(THEME_KEY, meta.key)?;
        self.replace(meta);
        Ok(true)
    }

    /// Forget the stored preference
    pub fn reset(&self) -> Result<(), StorageError> {
        self.store.remove(THEME_KEY)?;
        self.replace(default_meta());
        Ok(())
    }

    fn replace(&self, meta: &'static ThemeMeta) {
        match self.current.write() {
            Ok(mut slot) => *slot = meta,
            Err(poisoned) => *poisoned.into_inner() = meta,
        }
    }
}

fn default_meta() -> &'static ThemeMeta {
    &THEMES[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    #[test]
    fn test_default_theme() {
        let service = ThemeService::load(MemoryStore::shared());
        assert_eq!(service.current().key, DEFAULT_THEME);
    }

    #[test]
    fn test_unknown_stored_theme_falls_back() {
        let store = MemoryStore::shared();
        store.set(THEME_KEY, "neon-pink").unwrap();
        assert_eq!(ThemeService::load(store).current().key, DEFAULT_THEME);
    }

    #[test]
    fn test_set_and_reset() {
        let store = MemoryStore::shared();
        let service = ThemeService::load(store.clone());

        assert!(!service.set_theme("neon-pink").unwrap());
        assert!(service.set_theme("dark-navy").unwrap());
        assert_eq!(service.current().group, ThemeGroup::Dark);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark-navy"));

        let reloaded = ThemeService::load(store.clone());
        assert_eq!(reloaded.current().key, "dark-navy");

        service.reset().unwrap();
        assert_eq!(service.current().key, DEFAULT_THEME);
        assert!(store.get(THEME_KEY).is_none());
    }
}
