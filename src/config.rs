use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::ProfileError;
use crate::geometry::Size;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// Every delay the screen uses, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub assume_ready_ms: u64,
    pub incoming_settle_ms: u64,
    pub outgoing_settle_ms: u64,
    pub swap_cooldown_ms: u64,
    pub auto_hide_ms: u64,
    pub ambient_idle_ms: u64,
    pub cross_fade_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            assume_ready_ms: 3000,
            incoming_settle_ms: 100,
            outgoing_settle_ms: 0,
            swap_cooldown_ms: 300,
            auto_hide_ms: 3000,
            ambient_idle_ms: 10_000,
            cross_fade_ms: 300,
        }
    }
}

impl Timing {
    pub fn assume_ready(&self) -> Duration {
        Duration::from_millis(self.assume_ready_ms)
    }
    pub fn incoming_settle(&self) -> Duration {
        Duration::from_millis(self.incoming_settle_ms)
    }
    pub fn outgoing_settle(&self) -> Duration {
        Duration::from_millis(self.outgoing_settle_ms)
    }
    pub fn swap_cooldown(&self) -> Duration {
        Duration::from_millis(self.swap_cooldown_ms)
    }
    pub fn auto_hide(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }
    pub fn ambient_idle(&self) -> Duration {
        Duration::from_millis(self.ambient_idle_ms)
    }
    pub fn cross_fade(&self) -> Duration {
        Duration::from_millis(self.cross_fade_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Gestures {
    /// Release speed (px/s) below which a flick keeps the current quadrant.
    pub fling_min_speed: f32,
    /// Half-width of the angular band (degrees) that redirects to a neighbour.
    pub fling_angle_tolerance: f32,
    /// Upper bound for the vertical travel that fully collapses into PiP.
    pub collapse_max_offset: f32,
    /// Release speed below which collapse/dismiss pans snap back.
    pub settle_speed: f32,
    /// Horizontal travel (px) that locks the PiP corner family.
    pub corner_lock_min_dx: f32,
}

impl Default for Gestures {
    fn default() -> Self {
        Self {
            fling_min_speed: 500.0,
            fling_angle_tolerance: 30.0,
            collapse_max_offset: 300.0,
            settle_speed: 100.0,
            corner_lock_min_dx: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    /// Reception strictly below this selects the degraded style.
    pub degraded_below: u8,
}

impl Default for Background {
    fn default() -> Self {
        Self { degraded_below: 2 }
    }
}

/// Screen metrics used for quadrant splits and rest rects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screen {
    pub width: f32,
    pub height: f32,
    pub safe_top: f32,
    pub safe_bottom: f32,
    pub buttons_height: f32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
            safe_top: 47.0,
            safe_bottom: 34.0,
            buttons_height: 120.0,
        }
    }
}

impl Screen {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Raw axis ranges of the live touch device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Touch {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
    pub tap_ms: u64,
    pub tap_move_tol: f32,
}

impl Default for Touch {
    fn default() -> Self {
        Self {
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            tap_ms: 200,
            tap_move_tol: 0.02,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub gestures: Gestures,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    pub screen: Screen,
    #[serde(default)]
    pub touch: Touch,
}

impl Profile {
    /// The profile compiled into the binary.
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::parse(default_profile_text())
    }

    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let profile: Profile = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let t = &self.timing;
        if t.assume_ready_ms == 0 || t.auto_hide_ms == 0 || t.ambient_idle_ms == 0 {
            return Err(ProfileError::Invalid(
                "timing: assume_ready_ms, auto_hide_ms and ambient_idle_ms must be positive".into(),
            ));
        }
        let g = &self.gestures;
        if !(g.fling_angle_tolerance > 0.0 && g.fling_angle_tolerance < 90.0) {
            return Err(ProfileError::Invalid(format!(
                "gestures.fling_angle_tolerance must be in (0, 90), got {}",
                g.fling_angle_tolerance
            )));
        }
        if g.fling_min_speed < 0.0 || g.settle_speed < 0.0 || g.collapse_max_offset <= 0.0 {
            return Err(ProfileError::Invalid(
                "gestures: speeds must be non-negative and collapse_max_offset positive".into(),
            ));
        }
        if self.screen.width <= 0.0 || self.screen.height <= 0.0 {
            return Err(ProfileError::Invalid("screen size must be positive".into()));
        }
        let tc = &self.touch;
        if tc.x_max <= tc.x_min || tc.y_max <= tc.y_min {
            return Err(ProfileError::Invalid("touch axis ranges are empty".into()));
        }
        Ok(())
    }
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

/// On-disk profile directory plus the active-profile pointer.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

pub fn default_config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    Ok(dirs.home_dir().join(".config").join("callscreen"))
}

impl ProfileStore {
    pub fn load_or_install_default() -> Result<Self> {
        Self::open(&default_config_dir()?)
    }

    pub fn open(config_dir: &Path) -> Result<Self> {
        let profdir = config_dir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = config_dir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let mut active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        if active_name.is_empty() {
            warn!("empty active pointer, falling back to 'default'");
            active_name = "default".to_string();
        }
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: config_dir.to_path_buf(),
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        // parse before switching so a broken profile never becomes active
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    /// Loads a named profile without making it active.
    pub fn get(&self, name: &str) -> Result<Profile> {
        load_profile(&self.profiles_dir, name)
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}

fn load_profile(dir: &Path, name: &str) -> Result<Profile> {
    let path = dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to load {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profile_matches_defaults() {
        let p = Profile::builtin().unwrap();
        assert_eq!(p.timing.auto_hide_ms, Timing::default().auto_hide_ms);
        assert_eq!(p.gestures.fling_min_speed, 500.0);
        assert_eq!(p.gestures.fling_angle_tolerance, 30.0);
        assert_eq!(p.background.degraded_below, 2);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let p = Profile::parse("[meta]\nname = \"bare\"\n").unwrap();
        assert_eq!(p.timing.swap_cooldown_ms, 300);
        assert_eq!(p.screen.width, 390.0);
    }

    #[test]
    fn rejects_out_of_range_tolerance() {
        let err = Profile::parse("[gestures]\nfling_angle_tolerance = 120.0\n").unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn store_installs_default_and_switches() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::open(dir.path()).unwrap();
        assert_eq!(store.active_name, "default");
        assert_eq!(store.list_profiles(), vec!["default".to_string()]);

        fs::write(
            store.profiles_dir.join("fast.toml"),
            "[timing]\nauto_hide_ms = 1500\n",
        )
        .unwrap();
        store.set_active("fast").unwrap();
        assert_eq!(store.profile.timing.auto_hide_ms, 1500);
        assert_eq!(
            fs::read_to_string(&store.active_ptr).unwrap().trim(),
            "fast"
        );

        let reopened = ProfileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.active_name, "fast");
    }

    #[test]
    fn broken_profile_never_becomes_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::open(dir.path()).unwrap();
        fs::write(
            store.profiles_dir.join("bad.toml"),
            "[screen]\nwidth = -1.0\n",
        )
        .unwrap();
        assert!(store.set_active("bad").is_err());
        assert_eq!(store.active_name, "default");
        assert!(store.set_active("nope").is_err());
    }
}
