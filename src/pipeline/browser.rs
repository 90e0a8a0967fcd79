//! Selection-driven loading of the group list, member list and detail pane.
//!
//! `Browser` owns every list model and display surface. It is only touched from the
//! UI thread; workers report back through `Update` messages which are applied by
//! [`Browser::pump`] after their epoch has been re-validated.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::api::{GroupSummary, ItemDetail, MemberRef, Provider, ProviderError, StatRow};
use crate::assets::IconTable;
use crate::config::DetailConfig;
use crate::sprite::{self, SpriteError};

use super::generation::{Epoch, Generation};
use super::task::{Outbox, Spawn, Update};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailState {
    Idle,
    Loading,
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub level: StatusLevel,
}

/// Third-level display: the stat rows and the sprite of one member
#[derive(Debug)]
pub struct DetailPane {
    pub state: DetailState,
    /// Member whose rows are currently shown
    pub member: Option<MemberRef>,
    pub rows: Vec<StatRow>,
    pub sprite: Option<DynamicImage>,
    /// Why there is no sprite (loading, missing, failed)
    pub sprite_message: Option<String>,
    /// Bumped whenever `sprite` changes so renderers can rebuild their state
    pub sprite_revision: u64,
}

impl DetailPane {
    fn new() -> Self {
        Self {
            state: DetailState::Idle,
            member: None,
            rows: Vec::new(),
            sprite: None,
            sprite_message: None,
            sprite_revision: 0,
        }
    }

    fn set_sprite(&mut self, sprite: Option<DynamicImage>, message: Option<String>) {
        self.sprite = sprite;
        self.sprite_message = message;
        self.sprite_revision = self.sprite_revision.wrapping_add(1);
    }
}

pub struct Browser {
    provider: Arc<dyn Provider>,
    icons: Arc<IconTable>,
    spawner: Box<dyn Spawn>,
    detail_config: DetailConfig,
    outbox: Outbox,
    inbox: Receiver<Update>,

    groups: Vec<GroupSummary>,
    group_selection: Vec<usize>,

    members: Vec<MemberRef>,
    member_generation: Generation,
    member_failures: usize,
    member_selection: Option<usize>,

    detail_generation: Generation,
    detail: DetailPane,

    selection_text: String,
    status: Option<Status>,
}

impl Browser {
    pub fn new(
        provider: Arc<dyn Provider>,
        icons: Arc<IconTable>,
        spawner: Box<dyn Spawn>,
        detail_config: DetailConfig,
    ) -> Self {
        let (tx, inbox) = mpsc::channel();
        Self {
            provider,
            icons,
            spawner,
            detail_config,
            outbox: Outbox::new(tx),
            inbox,
            groups: Vec::new(),
            group_selection: Vec::new(),
            members: Vec::new(),
            member_generation: Generation::new(),
            member_failures: 0,
            member_selection: None,
            detail_generation: Generation::new(),
            detail: DetailPane::new(),
            selection_text: String::new(),
            status: None,
        }
    }

    // =========================================================================
    // Group catalog
    // =========================================================================

    /// Fetch the group catalog (blocking) and auto-select the first entry.
    ///
    /// Returns the number of groups. An empty catalog leaves the selection unset.
    pub fn load_catalog(&mut self) -> Result<usize, ProviderError> {
        let groups = self.provider.group_list()?;
        info!(count = groups.len(), "group catalog loaded");
        self.groups = groups;
        self.group_selection.clear();

        if self.groups.is_empty() {
            self.set_status(StatusLevel::Info, "No pokedexes available");
        } else {
            self.select_groups(&[0]);
        }
        Ok(self.groups.len())
    }

    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    /// Selected group rows, in row order
    pub fn group_selection(&self) -> &[usize] {
        &self.group_selection
    }

    pub fn is_group_selected(&self, index: usize) -> bool {
        self.group_selection.contains(&index)
    }

    // =========================================================================
    // Member loader
    // =========================================================================

    /// Replace the group selection. Out-of-range rows are ignored.
    pub fn select_groups(&mut self, rows: &[usize]) {
        let mut selection: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|row| *row < self.groups.len())
            .collect();
        selection.sort_unstable();
        selection.dedup();
        self.group_selection = selection;
        self.on_group_selection_changed();
    }

    /// Add or remove one row from the group selection
    pub fn toggle_group(&mut self, row: usize) {
        if row >= self.groups.len() {
            return;
        }
        let mut selection = self.group_selection.clone();
        if let Some(pos) = selection.iter().position(|selected| *selected == row) {
            selection.remove(pos);
        } else {
            selection.push(row);
        }
        self.select_groups(&selection);
    }

    fn on_group_selection_changed(&mut self) {
        let names: Vec<String> = self
            .group_selection
            .iter()
            .map(|row| self.groups[*row].name.clone())
            .collect();

        // Clear first so stale entries are never visible
        self.members.clear();
        self.member_selection = None;
        self.member_failures = 0;
        let epoch = self.member_generation.advance();

        self.selection_text = format!("[{}]", names.join(" "));
        debug!(?epoch, groups = ?names, "group selection changed");

        if names.is_empty() {
            return;
        }

        let provider = Arc::clone(&self.provider);
        let generation = self.member_generation.clone();
        let outbox = self.outbox.clone();
        self.spawner.spawn(
            "members",
            Box::new(move || {
                fetch_members_in_order(
                    provider.as_ref(),
                    &names,
                    || generation.is_current(epoch),
                    |group, result| match result {
                        Ok(members) => outbox.post(Update::Members {
                            epoch,
                            group: group.to_string(),
                            members,
                        }),
                        Err(err) => {
                            warn!(group, error = %err, "member fetch failed, skipping group");
                            outbox.post(Update::MembersFailed {
                                epoch,
                                group: group.to_string(),
                                error: err.to_string(),
                            });
                        }
                    },
                );
                outbox.post(Update::MembersDone { epoch });
            }),
        );
    }

    pub fn members(&self) -> &[MemberRef] {
        &self.members
    }

    pub fn member_selection(&self) -> Option<usize> {
        self.member_selection
    }

    // =========================================================================
    // Detail loader
    // =========================================================================

    /// Select a member row and load its detail. `None` (or an invalid row) clears
    /// the member selection without touching the detail pane.
    pub fn select_member(&mut self, row: Option<usize>) {
        let Some(row) = row.filter(|row| *row < self.members.len()) else {
            self.member_selection = None;
            return;
        };
        self.member_selection = Some(row);

        let member = self.members[row].clone();
        let epoch = self.detail_generation.advance();
        self.detail.state = DetailState::Loading;
        debug!(?epoch, member = %member.name, "member selection changed");

        let provider = Arc::clone(&self.provider);
        let icons = Arc::clone(&self.icons);
        let generation = self.detail_generation.clone();
        let outbox = self.outbox.clone();
        let config = self.detail_config.clone();
        self.spawner.spawn(
            "detail",
            Box::new(move || {
                load_detail(
                    provider.as_ref(),
                    &icons,
                    &config,
                    &generation,
                    epoch,
                    member,
                    &outbox,
                );
            }),
        );
    }

    pub fn detail(&self) -> &DetailPane {
        &self.detail
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Selected group names, as shown in the read-only entry line
    pub fn selection_text(&self) -> &str {
        &self.selection_text
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            level,
        });
    }

    // =========================================================================
    // Update application
    // =========================================================================

    /// Apply every pending worker result. Returns true if anything visible changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.inbox.try_recv() {
            changed |= self.apply(update);
        }
        changed
    }

    fn member_epoch_current(&self, epoch: Epoch) -> bool {
        let current = self.member_generation.is_current(epoch);
        if !current {
            debug!(?epoch, "dropping stale member update");
        }
        current
    }

    fn detail_epoch_current(&self, epoch: Epoch) -> bool {
        let current = self.detail_generation.is_current(epoch);
        if !current {
            debug!(?epoch, "dropping stale detail update");
        }
        current
    }

    fn apply(&mut self, update: Update) -> bool {
        match update {
            Update::Members {
                epoch,
                group,
                members,
            } => {
                if !self.member_epoch_current(epoch) {
                    return false;
                }
                debug!(group = %group, count = members.len(), "appending members");
                self.members.extend(members);
                true
            }
            Update::MembersFailed {
                epoch,
                group,
                error,
            } => {
                if !self.member_epoch_current(epoch) {
                    return false;
                }
                self.member_failures += 1;
                self.set_status(
                    StatusLevel::Error,
                    format!("Failed to load {}: {}", group, error),
                );
                true
            }
            Update::MembersDone { epoch } => {
                if !self.member_epoch_current(epoch) {
                    return false;
                }
                if self.member_failures == 0 {
                    let message = format!("Loaded {} pokemon", self.members.len());
                    self.set_status(StatusLevel::Info, message);
                } else {
                    let message = format!(
                        "Loaded {} pokemon, {} pokedex(es) failed",
                        self.members.len(),
                        self.member_failures
                    );
                    self.set_status(StatusLevel::Error, message);
                }
                true
            }
            Update::Detail {
                epoch,
                member,
                rows,
            } => {
                if !self.detail_epoch_current(epoch) {
                    return false;
                }
                self.detail.state = DetailState::Populated;
                self.detail.member = Some(member);
                self.detail.rows = rows;
                self.detail.set_sprite(None, Some("LOADING".to_string()));
                true
            }
            Update::DetailFailed {
                epoch,
                member,
                error,
            } => {
                if !self.detail_epoch_current(epoch) {
                    return false;
                }
                // Prior rows and sprite stay as they were
                self.detail.state = if self.detail.member.is_some() {
                    DetailState::Populated
                } else {
                    DetailState::Idle
                };
                self.set_status(
                    StatusLevel::Error,
                    format!("Failed to load {}: {}", member.name, error),
                );
                true
            }
            Update::Sprite { epoch, image } => {
                if !self.detail_epoch_current(epoch) {
                    return false;
                }
                self.detail.set_sprite(Some(image), None);
                true
            }
            Update::SpriteFailed { epoch, error } => {
                if !self.detail_epoch_current(epoch) {
                    return false;
                }
                self.detail.set_sprite(None, Some(error));
                true
            }
        }
    }
}

/// Fetch members group by group, in the given order.
///
/// `keep_going` is consulted before each fetch; a failed group is reported and
/// skipped.
pub fn fetch_members_in_order<K, E>(
    provider: &dyn Provider,
    groups: &[String],
    mut keep_going: K,
    mut emit: E,
) where
    K: FnMut() -> bool,
    E: FnMut(&str, Result<Vec<MemberRef>, ProviderError>),
{
    for group in groups {
        if !keep_going() {
            debug!(group = %group, "member fetch superseded");
            return;
        }
        emit(group, provider.group_members(group));
    }
}

/// Stat rows for a detail record: one type row per tag, then base stats if enabled
pub fn detail_rows(detail: &ItemDetail, icons: &IconTable, base_stats: bool) -> Vec<StatRow> {
    let mut rows: Vec<StatRow> = detail
        .types
        .iter()
        .map(|tag| StatRow::type_row(tag, icons.icon(&tag.name)))
        .collect();
    if base_stats {
        rows.extend(detail.stats.iter().map(StatRow::stat_row));
    }
    rows
}

fn fetch_sprite(
    provider: &dyn Provider,
    detail: &ItemDetail,
    size: u32,
) -> Result<DynamicImage, String> {
    let url = detail
        .sprite_url
        .as_deref()
        .ok_or_else(|| SpriteError::NoSprite.to_string())?;
    let bytes = provider.raw_bytes(url).map_err(|err| err.to_string())?;
    sprite::decode(&bytes, size).map_err(|err| err.to_string())
}

fn load_detail(
    provider: &dyn Provider,
    icons: &IconTable,
    config: &DetailConfig,
    generation: &Generation,
    epoch: Epoch,
    member: MemberRef,
    outbox: &Outbox,
) {
    if !generation.is_current(epoch) {
        return;
    }

    let detail = match provider.item_detail(&member.detail_key()) {
        Ok(detail) => detail,
        Err(err) => {
            warn!(member = %member.name, error = %err, "detail fetch failed");
            outbox.post(Update::DetailFailed {
                epoch,
                member,
                error: err.to_string(),
            });
            return;
        }
    };

    let rows = detail_rows(&detail, icons, config.base_stats);
    outbox.post(Update::Detail {
        epoch,
        member,
        rows,
    });

    if !generation.is_current(epoch) {
        return;
    }

    match fetch_sprite(provider, &detail, config.sprite_size) {
        Ok(image) => outbox.post(Update::Sprite { epoch, image }),
        Err(error) => {
            warn!(pokemon = %detail.name, error = %error, "sprite unavailable");
            outbox.post(Update::SpriteFailed { epoch, error });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::io::Cursor;
    use std::sync::Mutex;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::super::task::Job;
    use super::*;
    use crate::api::{BaseStat, TypeTag};

    #[derive(Default)]
    struct MockProvider {
        groups: Vec<GroupSummary>,
        fail_catalog: bool,
        members: HashMap<String, Vec<MemberRef>>,
        details: HashMap<String, ItemDetail>,
        sprites: HashMap<String, Vec<u8>>,
    }

    impl MockProvider {
        fn with_groups(mut self, groups: &[(&str, usize)]) -> Self {
            for (name, count) in groups {
                self.groups.push(GroupSummary::new(*name));
                let members = (1..=*count)
                    .map(|n| MemberRef::new(format!("{name}-{n}"), n as u32))
                    .collect();
                self.members.insert(name.to_string(), members);
            }
            self
        }

        fn with_failing_group(mut self, name: &str) -> Self {
            self.groups.push(GroupSummary::new(name));
            self
        }

        fn with_detail(mut self, key: &str, types: &[&str], sprite: Option<Vec<u8>>) -> Self {
            let sprite_url = sprite.as_ref().map(|_| format!("sprite://{key}"));
            if let (Some(url), Some(bytes)) = (sprite_url.clone(), sprite) {
                self.sprites.insert(url, bytes);
            }
            self.details.insert(
                key.to_string(),
                ItemDetail {
                    name: format!("pokemon-{key}"),
                    types: types
                        .iter()
                        .map(|name| TypeTag {
                            name: name.to_string(),
                        })
                        .collect(),
                    sprite_url,
                    stats: vec![
                        BaseStat {
                            name: "hp".into(),
                            value: 45,
                        },
                        BaseStat {
                            name: "speed".into(),
                            value: 90,
                        },
                    ],
                },
            );
            self
        }
    }

    fn not_found(url: &str) -> ProviderError {
        ProviderError::Status {
            url: url.to_string(),
            status: 404,
        }
    }

    impl Provider for MockProvider {
        fn group_list(&self) -> Result<Vec<GroupSummary>, ProviderError> {
            if self.fail_catalog {
                return Err(not_found("pokedex"));
            }
            Ok(self.groups.clone())
        }

        fn group_members(&self, group: &str) -> Result<Vec<MemberRef>, ProviderError> {
            self.members
                .get(group)
                .cloned()
                .ok_or_else(|| not_found(group))
        }

        fn item_detail(&self, id: &str) -> Result<ItemDetail, ProviderError> {
            self.details.get(id).cloned().ok_or_else(|| not_found(id))
        }

        fn raw_bytes(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
            self.sprites.get(url).cloned().ok_or_else(|| not_found(url))
        }
    }

    /// Queues jobs so tests decide when (and in which order) they run
    #[derive(Clone, Default)]
    struct ManualSpawner {
        queue: Arc<Mutex<VecDeque<Job>>>,
    }

    impl ManualSpawner {
        fn pending(&self) -> usize {
            self.queue.lock().unwrap().len()
        }

        fn run_next(&self) {
            let job = self.queue.lock().unwrap().pop_front().expect("no pending job");
            job();
        }

        fn run_last(&self) {
            let job = self.queue.lock().unwrap().pop_back().expect("no pending job");
            job();
        }

        fn run_all(&self) {
            while self.pending() > 0 {
                self.run_next();
            }
        }
    }

    impl Spawn for ManualSpawner {
        fn spawn(&self, _name: &str, job: Job) {
            self.queue.lock().unwrap().push_back(job);
        }
    }

    struct Harness {
        browser: Browser,
        spawner: ManualSpawner,
        _icon_dir: tempfile::TempDir,
    }

    impl Harness {
        fn settle(&mut self) {
            self.spawner.run_all();
            self.browser.pump();
        }

        fn member_names(&self) -> Vec<String> {
            self.browser
                .members()
                .iter()
                .map(|m| m.name.clone())
                .collect()
        }
    }

    fn harness_with(provider: MockProvider, config: DetailConfig) -> Harness {
        let icon_dir = tempfile::tempdir().unwrap();
        let icons = Arc::new(IconTable::new(icon_dir.path(), config.icon_size));
        let spawner = ManualSpawner::default();
        let browser = Browser::new(
            Arc::new(provider),
            icons,
            Box::new(spawner.clone()),
            config,
        );
        Harness {
            browser,
            spawner,
            _icon_dir: icon_dir,
        }
    }

    fn harness(provider: MockProvider) -> Harness {
        harness_with(
            provider,
            DetailConfig {
                sprite_size: 8,
                ..DetailConfig::default()
            },
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_catalog_auto_selects_first_group() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 3), ("johto", 2)]));
        assert_eq!(h.browser.load_catalog().unwrap(), 2);
        assert_eq!(h.browser.group_selection(), &[0]);
        assert_eq!(h.browser.selection_text(), "[kanto]");
        assert_eq!(h.spawner.pending(), 1);

        h.settle();
        assert_eq!(h.member_names(), vec!["kanto-1", "kanto-2", "kanto-3"]);
    }

    #[test]
    fn test_empty_catalog_selects_nothing() {
        let mut h = harness(MockProvider::default());
        assert_eq!(h.browser.load_catalog().unwrap(), 0);
        assert!(h.browser.group_selection().is_empty());
        assert_eq!(h.spawner.pending(), 0);
        h.settle();
        assert!(h.browser.members().is_empty());
    }

    #[test]
    fn test_catalog_failure_is_returned() {
        let provider = MockProvider {
            fail_catalog: true,
            ..MockProvider::default()
        };
        let mut h = harness(provider);
        assert!(h.browser.load_catalog().is_err());
        assert!(h.browser.groups().is_empty());
    }

    #[test]
    fn test_single_group_completeness_in_provider_order() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 151)]));
        h.browser.load_catalog().unwrap();
        h.settle();

        let members = h.browser.members();
        assert_eq!(members.len(), 151);
        let ordinals: Vec<u32> = members.iter().map(|m| m.ordinal).collect();
        assert_eq!(ordinals, (1..=151).collect::<Vec<u32>>());
    }

    #[test]
    fn test_reselection_is_idempotent() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 3), ("johto", 2)]));
        h.browser.load_catalog().unwrap();
        h.settle();

        h.browser.select_groups(&[0, 1]);
        h.settle();
        let first = h.member_names();

        h.browser.select_groups(&[0, 1]);
        h.settle();
        assert_eq!(h.member_names(), first);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn test_multi_selection_follows_row_order() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 2), ("johto", 2)]));
        h.browser.load_catalog().unwrap();
        h.settle();

        h.browser.select_groups(&[1, 0, 1]);
        assert_eq!(h.browser.group_selection(), &[0, 1]);
        assert_eq!(h.browser.selection_text(), "[kanto johto]");
        h.settle();
        assert_eq!(
            h.member_names(),
            vec!["kanto-1", "kanto-2", "johto-1", "johto-2"]
        );
    }

    #[test]
    fn test_selection_change_clears_members_synchronously() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 3), ("johto", 2)]));
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(1));
        assert_eq!(h.browser.member_selection(), Some(1));

        h.browser.select_groups(&[1]);
        assert!(h.browser.members().is_empty());
        assert_eq!(h.browser.member_selection(), None);
    }

    #[test]
    fn test_superseded_selection_is_discarded() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 3), ("johto", 2)]));
        h.browser.load_catalog().unwrap();
        h.browser.select_groups(&[1]);
        assert_eq!(h.spawner.pending(), 2);

        // Newer selection finishes first, the stale one afterwards
        h.spawner.run_last();
        h.spawner.run_next();
        h.browser.pump();

        assert_eq!(h.member_names(), vec!["johto-1", "johto-2"]);
    }

    #[test]
    fn test_stale_update_after_worker_check_is_dropped() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 3), ("johto", 2)]));
        h.browser.load_catalog().unwrap();
        let stale = h.browser.member_generation.current();

        h.browser.select_groups(&[1]);
        h.settle();

        // A worker that passed its check just before the selection changed
        h.browser.outbox.post(Update::Members {
            epoch: stale,
            group: "kanto".into(),
            members: vec![MemberRef::new("kanto-1", 1)],
        });
        h.browser.outbox.post(Update::MembersDone { epoch: stale });
        assert!(!h.browser.pump());
        assert_eq!(h.member_names(), vec!["johto-1", "johto-2"]);
    }

    #[test]
    fn test_failed_group_is_skipped() {
        let provider = MockProvider::default()
            .with_failing_group("broken")
            .with_groups(&[("hoenn", 4)]);
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();
        assert!(h.browser.members().is_empty());

        h.browser.select_groups(&[0, 1]);
        h.settle();
        assert_eq!(h.member_names(), vec!["hoenn-1", "hoenn-2", "hoenn-3", "hoenn-4"]);
        let status = h.browser.status().unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.message.contains("1 pokedex"), "{}", status.message);
    }

    #[test]
    fn test_toggle_group_to_empty_selection() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 3)]));
        h.browser.load_catalog().unwrap();
        h.settle();

        h.browser.toggle_group(0);
        assert!(h.browser.group_selection().is_empty());
        assert_eq!(h.browser.selection_text(), "[]");
        assert_eq!(h.spawner.pending(), 0);
        h.settle();
        assert!(h.browser.members().is_empty());

        h.browser.toggle_group(0);
        h.settle();
        assert_eq!(h.browser.members().len(), 3);
    }

    #[test]
    fn test_detail_rows_follow_type_order() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 6)])
            .with_detail("6", &["fire", "flying"], Some(png_bytes()));
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();

        h.browser.select_member(Some(5));
        assert_eq!(h.browser.detail().state, DetailState::Loading);
        h.settle();

        let detail = h.browser.detail();
        assert_eq!(detail.state, DetailState::Populated);
        let rows: Vec<(&str, &str)> = detail
            .rows
            .iter()
            .map(|r| (r.label.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(rows, vec![("Type", "fire"), ("Type", "flying")]);
        // No icon assets in the test directory
        assert!(detail.rows.iter().all(|r| r.icon.is_none()));

        let sprite = detail.sprite.as_ref().expect("sprite should be set");
        assert_eq!((sprite.width(), sprite.height()), (8, 8));
        assert!(detail.sprite_message.is_none());
    }

    #[test]
    fn test_base_stats_appended_when_enabled() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 1)])
            .with_detail("1", &["grass", "poison"], None);
        let mut h = harness_with(
            provider,
            DetailConfig {
                base_stats: true,
                ..DetailConfig::default()
            },
        );
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(0));
        h.settle();

        let values: Vec<&str> = h.browser.detail().rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["grass", "poison", "45", "90"]);
        assert_eq!(h.browser.detail().rows[2].label, "hp");
    }

    #[test]
    fn test_missing_sprite_degrades_to_message() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 1)])
            .with_detail("1", &["normal"], None);
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(0));
        h.settle();

        let detail = h.browser.detail();
        assert_eq!(detail.rows.len(), 1);
        assert!(detail.sprite.is_none());
        assert_eq!(detail.sprite_message.as_deref(), Some("no sprite available"));
    }

    #[test]
    fn test_detail_failure_keeps_previous_display() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 2)])
            .with_detail("1", &["water"], Some(png_bytes()));
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(0));
        h.settle();
        let revision = h.browser.detail().sprite_revision;

        // Member 2 has no detail record
        h.browser.select_member(Some(1));
        h.settle();

        let detail = h.browser.detail();
        assert_eq!(detail.state, DetailState::Populated);
        assert_eq!(detail.member.as_ref().map(|m| m.name.as_str()), Some("kanto-1"));
        assert_eq!(detail.rows.len(), 1);
        assert!(detail.sprite.is_some());
        assert_eq!(detail.sprite_revision, revision);
        assert_eq!(h.browser.status().unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn test_detail_failure_without_prior_display_is_idle() {
        let mut h = harness(MockProvider::default().with_groups(&[("kanto", 1)]));
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(0));
        h.settle();
        assert_eq!(h.browser.detail().state, DetailState::Idle);
        assert!(h.browser.detail().rows.is_empty());
    }

    #[test]
    fn test_stale_detail_never_overwrites_newer_selection() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 2)])
            .with_detail("1", &["grass"], Some(png_bytes()))
            .with_detail("2", &["fire"], None);
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();

        h.browser.select_member(Some(0));
        h.browser.select_member(Some(1));
        h.spawner.run_last();
        h.spawner.run_next();
        h.browser.pump();

        let detail = h.browser.detail();
        assert_eq!(detail.member.as_ref().map(|m| m.name.as_str()), Some("kanto-2"));
        let values: Vec<&str> = detail.rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["fire"]);
        assert!(detail.sprite.is_none());
    }

    #[test]
    fn test_stale_sprite_is_dropped() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 2)])
            .with_detail("1", &["grass"], Some(png_bytes()))
            .with_detail("2", &["fire"], None);
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();

        h.browser.select_member(Some(0));
        let stale = h.browser.detail_generation.current();
        h.browser.select_member(Some(1));
        h.settle();

        h.browser.outbox.post(Update::Sprite {
            epoch: stale,
            image: image::DynamicImage::ImageRgba8(RgbaImage::new(1, 1)),
        });
        assert!(!h.browser.pump());
        assert!(h.browser.detail().sprite.is_none());
    }

    #[test]
    fn test_select_member_none_leaves_detail() {
        let provider = MockProvider::default()
            .with_groups(&[("kanto", 1)])
            .with_detail("1", &["bug"], None);
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(0));
        h.settle();

        h.browser.select_member(None);
        assert_eq!(h.spawner.pending(), 0);
        assert_eq!(h.browser.member_selection(), None);
        assert_eq!(h.browser.detail().rows.len(), 1);
    }

    #[test]
    fn test_detail_uses_species_id_when_known() {
        let mut provider = MockProvider::default().with_detail("152", &["grass"], None);
        provider.groups.push(GroupSummary::new("original-johto"));
        provider.members.insert(
            "original-johto".into(),
            vec![MemberRef::new("chikorita", 1).with_species_id(Some(152))],
        );
        let mut h = harness(provider);
        h.browser.load_catalog().unwrap();
        h.settle();
        h.browser.select_member(Some(0));
        h.settle();
        assert_eq!(h.browser.detail().rows[0].value, "grass");
    }
}
