use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "dexview";

const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CATALOG_LIMIT: u32 = 100;
const DEFAULT_ICON_DIR: &str = "imgs";
const DEFAULT_ICON_SIZE: u32 = 20;
const DEFAULT_SPRITE_SIZE: u32 = 200;
const DEFAULT_GROUPS_WIDTH: u16 = 24;
const DEFAULT_MEMBERS_WIDTH: u16 = 36;
const DEFAULT_SPRITE_HEIGHT: u16 = 14;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path the configuration was read from; `None` when running on defaults
    pub config_path: Option<PathBuf>,
    pub api: ApiConfig,
    pub assets: AssetsConfig,
    pub detail: DetailConfig,
    pub keys: Keys,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            api: ApiConfig::default(),
            assets: AssetsConfig::default(),
            detail: DetailConfig::default(),
            keys: Keys::default(),
            ui: UiFile::default().into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout; zero disables it
    pub timeout_secs: u64,
    /// `limit` used for the catalog listing
    pub catalog_limit: u32,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            catalog_limit: DEFAULT_CATALOG_LIMIT,
            user_agent: format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetsConfig {
    pub icon_dir: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            icon_dir: PathBuf::from(DEFAULT_ICON_DIR),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetailConfig {
    /// Edge length of type icon thumbnails, in pixels
    pub icon_size: u32,
    /// Edge length of the scaled sprite, in pixels
    pub sprite_size: u32,
    /// Append numeric base stats after the type rows
    pub base_stats: bool,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            icon_size: DEFAULT_ICON_SIZE,
            sprite_size: DEFAULT_SPRITE_SIZE,
            base_stats: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
    pub pane: UiPane,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub error_fg: RgbColor,
}

#[derive(Debug, Clone)]
pub struct UiPane {
    pub groups_width: u16,
    pub members_width: u16,
    pub sprite_height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Keys that work regardless of the focused pane
    pub global: GlobalKeys,
    /// Keys for the group (pokedex) list
    pub groups: GroupKeys,
    /// Keys for the member list
    pub members: MemberKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub help: Vec<String>,
    pub focus_next: Vec<String>,
    pub focus_prev: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GroupKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub toggle: Vec<String>,
    pub confirm: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MemberKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub back: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            help: vec!["F1".into(), "?".into()],
            focus_next: vec!["Tab".into()],
            focus_prev: vec!["Backtab".into()],
        }
    }
}

impl Default for GroupKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            toggle: vec!["Space".into()],
            confirm: vec!["Enter".into(), "l".into(), "Right".into()],
        }
    }
}

impl Default for MemberKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            page_down: vec!["PageDown".into()],
            page_up: vec!["PageUp".into()],
            back: vec!["h".into(), "Left".into(), "Escape".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    api: ApiFile,
    assets: AssetsFile,
    detail: DetailFile,
    keys: KeysFile,
    ui: UiFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ApiFile {
    base_url: String,
    timeout_secs: u64,
    catalog_limit: u32,
    user_agent: Option<String>,
}

impl Default for ApiFile {
    fn default() -> Self {
        let defaults = ApiConfig::default();
        Self {
            base_url: defaults.base_url,
            timeout_secs: defaults.timeout_secs,
            catalog_limit: defaults.catalog_limit,
            user_agent: None,
        }
    }
}

impl From<ApiFile> for ApiConfig {
    fn from(file: ApiFile) -> Self {
        let defaults = ApiConfig::default();
        let base_url = file.base_url.trim();
        Self {
            base_url: if base_url.is_empty() {
                defaults.base_url
            } else {
                base_url.to_string()
            },
            timeout_secs: file.timeout_secs,
            catalog_limit: if file.catalog_limit == 0 {
                DEFAULT_CATALOG_LIMIT
            } else {
                file.catalog_limit
            },
            user_agent: file
                .user_agent
                .map(|ua| ua.trim().to_string())
                .filter(|ua| !ua.is_empty())
                .unwrap_or(defaults.user_agent),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AssetsFile {
    icon_dir: Option<PathBuf>,
}

impl From<AssetsFile> for AssetsConfig {
    fn from(file: AssetsFile) -> Self {
        Self {
            icon_dir: file
                .icon_dir
                .map(|dir| expand_tilde(&dir))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ICON_DIR)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetailFile {
    icon_size: u32,
    sprite_size: u32,
    base_stats: bool,
}

impl Default for DetailFile {
    fn default() -> Self {
        let defaults = DetailConfig::default();
        Self {
            icon_size: defaults.icon_size,
            sprite_size: defaults.sprite_size,
            base_stats: defaults.base_stats,
        }
    }
}

impl From<DetailFile> for DetailConfig {
    fn from(file: DetailFile) -> Self {
        Self {
            icon_size: if file.icon_size == 0 {
                DEFAULT_ICON_SIZE
            } else {
                file.icon_size
            },
            sprite_size: if file.sprite_size == 0 {
                DEFAULT_SPRITE_SIZE
            } else {
                file.sprite_size
            },
            base_stats: file.base_stats,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    groups: GroupKeysFile,
    members: MemberKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    help: KeyBinding,
    focus_next: KeyBinding,
    focus_prev: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            help: KeyBinding::Multiple(defaults.help),
            focus_next: KeyBinding::Multiple(defaults.focus_next),
            focus_prev: KeyBinding::Multiple(defaults.focus_prev),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GroupKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    toggle: KeyBinding,
    confirm: KeyBinding,
}

impl Default for GroupKeysFile {
    fn default() -> Self {
        let defaults = GroupKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            toggle: KeyBinding::Multiple(defaults.toggle),
            confirm: KeyBinding::Multiple(defaults.confirm),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MemberKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    page_down: KeyBinding,
    page_up: KeyBinding,
    back: KeyBinding,
}

impl Default for MemberKeysFile {
    fn default() -> Self {
        let defaults = MemberKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            page_down: KeyBinding::Multiple(defaults.page_down),
            page_up: KeyBinding::Multiple(defaults.page_up),
            back: KeyBinding::Multiple(defaults.back),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                help: file.global.help.into_vec(),
                focus_next: file.global.focus_next.into_vec(),
                focus_prev: file.global.focus_prev.into_vec(),
            },
            groups: GroupKeys {
                next: file.groups.next.into_vec(),
                prev: file.groups.prev.into_vec(),
                toggle: file.groups.toggle.into_vec(),
                confirm: file.groups.confirm.into_vec(),
            },
            members: MemberKeys {
                next: file.members.next.into_vec(),
                prev: file.members.prev.into_vec(),
                page_down: file.members.page_down.into_vec(),
                page_up: file.members.page_up.into_vec(),
                back: file.members.back.into_vec(),
            },
        }
    }
}

// =============================================================================
// UI config types
// =============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
    pane: UiPaneFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    error_fg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(220, 60, 60),
            selection_bg: RgbColor::new(220, 60, 60),
            selection_fg: RgbColor::new(255, 255, 255),
            separator: RgbColor::new(220, 60, 60),
            status_fg: RgbColor::new(255, 255, 255),
            status_bg: RgbColor::new(40, 40, 40),
            error_fg: RgbColor::new(255, 200, 0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiPaneFile {
    groups_width: u16,
    members_width: u16,
    sprite_height: u16,
}

impl Default for UiPaneFile {
    fn default() -> Self {
        Self {
            groups_width: DEFAULT_GROUPS_WIDTH,
            members_width: DEFAULT_MEMBERS_WIDTH,
            sprite_height: DEFAULT_SPRITE_HEIGHT,
        }
    }
}

fn non_zero_or(value: u16, default: u16) -> u16 {
    if value == 0 {
        default
    } else {
        value
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                separator: file.colors.separator,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
                error_fg: file.colors.error_fg,
            },
            pane: UiPane {
                groups_width: non_zero_or(file.pane.groups_width, DEFAULT_GROUPS_WIDTH),
                members_width: non_zero_or(file.pane.members_width, DEFAULT_MEMBERS_WIDTH),
                sprite_height: non_zero_or(file.pane.sprite_height, DEFAULT_SPRITE_HEIGHT),
            },
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Single characters keep their case ('M' is Shift+m); key names are case-insensitive.
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Global keys are active in every pane, so each pane context is checked together with them
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let global = [
        ("quit", keys.global.quit.as_slice()),
        ("help", keys.global.help.as_slice()),
        ("focus_next", keys.global.focus_next.as_slice()),
        ("focus_prev", keys.global.focus_prev.as_slice()),
    ];
    check_context_collisions(&global, "global")?;

    let mut groups = global.to_vec();
    groups.extend([
        ("groups.next", keys.groups.next.as_slice()),
        ("groups.prev", keys.groups.prev.as_slice()),
        ("groups.toggle", keys.groups.toggle.as_slice()),
        ("groups.confirm", keys.groups.confirm.as_slice()),
    ]);
    check_context_collisions(&groups, "groups")?;

    let mut members = global.to_vec();
    members.extend([
        ("members.next", keys.members.next.as_slice()),
        ("members.prev", keys.members.prev.as_slice()),
        ("members.page_down", keys.members.page_down.as_slice()),
        ("members.page_up", keys.members.page_up.as_slice()),
        ("members.back", keys.members.back.as_slice()),
    ]);
    check_context_collisions(&members, "members")?;

    Ok(())
}

// =============================================================================
// Loading
// =============================================================================

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from `path_override`, or from the default location.
///
/// A missing default file means built-in defaults; a missing explicit file is an error.
pub fn load(path_override: Option<&Path>) -> Result<Config> {
    let path = match path_override {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        if path_override.is_some() {
            bail!("configuration file not found at {}", path.display());
        }
        return Ok(Config::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let mut config =
        parse(&raw).with_context(|| format!("invalid configuration in {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

pub fn parse(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: None,
        api: cfg_file.api.into(),
        assets: cfg_file.assets.into(),
        detail: cfg_file.detail.into(),
        keys,
        ui: cfg_file.ui.into(),
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in_context(value, "", &["api", "assets", "detail", "keys", "ui"]);

    let sections: [(&str, &[&str]); 4] = [
        ("api", &["base_url", "timeout_secs", "catalog_limit", "user_agent"]),
        ("assets", &["icon_dir"]),
        ("detail", &["icon_size", "sprite_size", "base_stats"]),
        ("ui", &["colors", "pane"]),
    ];
    for (name, known) in sections {
        if let Some(section) = table.get(name) {
            warn_unknown_in_context(section, name, known);
        }
    }

    if let Some(ui) = table.get("ui") {
        if let Some(colors) = ui.get("colors") {
            warn_unknown_in_context(
                colors,
                "ui.colors",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                    "error_fg",
                ],
            );
        }
        if let Some(pane) = ui.get("pane") {
            warn_unknown_in_context(
                pane,
                "ui.pane",
                &["groups_width", "members_width", "sprite_height"],
            );
        }
    }

    if let Some(keys) = table.get("keys") {
        warn_unknown_in_context(keys, "keys", &["global", "groups", "members"]);
        let contexts: [(&str, &[&str]); 3] = [
            ("global", &["quit", "help", "focus_next", "focus_prev"]),
            ("groups", &["next", "prev", "toggle", "confirm"]),
            ("members", &["next", "prev", "page_down", "page_up", "back"]),
        ];
        for (name, known) in contexts {
            if let Some(context) = keys.get(name) {
                warn_unknown_in_context(context, &format!("keys.{}", name), known);
            }
        }
    }
}

fn warn_unknown_in_context(value: &toml::Value, context: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    let known: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            if context.is_empty() {
                warn!("unknown configuration key `{}`", key);
            } else {
                warn!("unknown configuration key `{}` in [{}]", key, context);
            }
        }
    }
}
