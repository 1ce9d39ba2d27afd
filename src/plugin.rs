//! The plugin service: collaborators, settings, and hook wiring.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use markup_scrubber::{scrub_anchors, scrub_menu, scrub_page_list, scrub_recent, MenuEntry, RecentItem};
use parking_lot::Mutex;
use restriction_broker::{
    AccessBroker, BrokerOptions, ContentDirectory, MetaKeys, MetadataStore, RoleStore,
};
use rolegate_core_types::{Actor, ContentId, RoleName};
use rolegate_event_bus::{HookDispatcher, HookFlow, HookHandler};
use rolegate_policy_center::{GateSettings, SettingsCenter};
use tracing::{debug, info, warn};

use crate::content::{self, RedirectTarget, RenderedBody};
use crate::editor::{self, EditorExtension, EditorSubmission, SaveOutcome};
use crate::errors::PluginResult;
use crate::nonce::NonceVerifier;
use crate::search::{self, ContentQuery};

/// Host hook names the plugin binds to.
pub mod hooks {
    pub const THE_CONTENT: &str = "the_content";
    pub const NAV_MENU_ITEMS: &str = "wp_nav_menu_items";
    pub const LIST_PAGES: &str = "wp_list_pages";
    pub const RECENT_ITEMS: &str = "recent_items";
    pub const PRE_GET_POSTS: &str = "pre_get_posts";
    pub const THE_TITLE: &str = "the_title";
    pub const POST_SUBMITBOX: &str = "post_submitbox";
    pub const SAVE_POST: &str = "save_post";
    pub const REDIRECT_POST_LOCATION: &str = "redirect_post_location";
    pub const ADMIN_NOTICES: &str = "admin_notices";
}

/// Per-request context handed to every hook handler.
#[derive(Clone, Debug, Default)]
pub struct RequestScope {
    pub actor: Actor,
    /// The content item being rendered or saved, when there is one.
    pub content_id: Option<ContentId>,
    pub admin_screen: bool,
    pub autosave: bool,
    pub query: BTreeMap<String, String>,
}

impl RequestScope {
    pub fn visitor(actor: Actor) -> Self {
        Self {
            actor,
            ..Self::default()
        }
    }

    pub fn admin(actor: Actor) -> Self {
        Self {
            actor,
            admin_screen: true,
            ..Self::default()
        }
    }

    pub fn for_content(mut self, id: ContentId) -> Self {
        self.content_id = Some(id);
        self
    }

    pub fn with_query_var(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn autosaving(mut self) -> Self {
        self.autosave = true;
        self
    }
}

/// Values flowing through the host hooks. A handler that receives a variant
/// it does not handle passes it on unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookPayload {
    Content(String),
    /// Terminal result of the content hook.
    Redirect(RedirectTarget),
    Title(String),
    Menu {
        markup: String,
        entries: Vec<MenuEntry>,
    },
    PageList(String),
    RecentItems(Vec<RecentItem>),
    Query(ContentQuery),
    EditorPanel {
        content_id: ContentId,
        markup: String,
    },
    Save {
        content_id: ContentId,
        submission: EditorSubmission,
        outcome: Option<SaveOutcome>,
    },
    RedirectLocation {
        content_id: ContentId,
        location: String,
    },
    AdminNotices(String),
}

/// Host collaborators the plugin is built over.
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataStore>,
    pub directory: Arc<dyn ContentDirectory>,
    pub roles: Arc<dyn RoleStore>,
    pub nonces: Arc<dyn NonceVerifier>,
}

pub struct RestrictPlugin {
    collab: Collaborators,
    settings: Arc<SettingsCenter>,
    broker: AccessBroker,
    /// Content ids whose last save rejected the redirect URL.
    pending_notices: Mutex<BTreeSet<ContentId>>,
}

fn broker_options(settings: &GateSettings) -> BrokerOptions {
    BrokerOptions {
        keys: MetaKeys::with_prefix(&settings.meta.prefix),
        privileged: settings
            .roles
            .privileged
            .iter()
            .map(|role| RoleName::from(role.as_str()))
            .collect(),
    }
}

impl RestrictPlugin {
    pub fn new(collab: Collaborators, settings: Arc<SettingsCenter>) -> Arc<Self> {
        let broker = AccessBroker::with_options(
            Arc::clone(&collab.metadata),
            Arc::clone(&collab.directory),
            broker_options(&settings.snapshot()),
        );
        Arc::new(Self {
            collab,
            settings,
            broker,
            pending_notices: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn broker(&self) -> &AccessBroker {
        &self.broker
    }

    pub fn settings(&self) -> Arc<GateSettings> {
        self.settings.snapshot()
    }

    /// Reloads settings from their sources and pushes the new keys and
    /// privileged roles into the decision engine.
    pub fn reload_settings(&self) -> PluginResult<u64> {
        let rev = self.settings.reload()?;
        self.broker.set_options(broker_options(&self.settings.snapshot()));
        info!(target = "rolegate", rev, "settings reloaded");
        Ok(rev)
    }

    /// Binds every handler on `dispatcher`. Optional filters follow the feature flags
    /// of the settings snapshot taken here.
    pub fn register(self: &Arc<Self>, dispatcher: &dyn HookDispatcher<HookPayload, RequestScope>) {
        let features = self.settings().features.clone();

        self.bind(dispatcher, hooks::THE_CONTENT, 19, "content-filter", |plugin, payload, scope| {
            match payload {
                HookPayload::Content(body) => match plugin.filter_content(scope, body) {
                    RenderedBody::Markup(markup) => HookFlow::Continue(HookPayload::Content(markup)),
                    RenderedBody::Redirect(target) => HookFlow::Halt(HookPayload::Redirect(target)),
                },
                other => HookFlow::Continue(other),
            }
        });

        if features.strip_hard_links {
            self.bind(dispatcher, hooks::THE_CONTENT, 20, "anchor-scrubber", |plugin, payload, scope| {
                match payload {
                    HookPayload::Content(body) => {
                        HookFlow::Continue(HookPayload::Content(plugin.strip_anchors(&scope.actor, body)))
                    }
                    other => HookFlow::Continue(other),
                }
            });
        }

        self.bind(dispatcher, hooks::NAV_MENU_ITEMS, 10, "menu-scrubber", |plugin, payload, scope| {
            match payload {
                HookPayload::Menu { markup, entries } => {
                    let markup = plugin.scrub_menu(&scope.actor, markup, &entries);
                    HookFlow::Continue(HookPayload::Menu { markup, entries })
                }
                other => HookFlow::Continue(other),
            }
        });

        if features.page_list {
            self.bind(dispatcher, hooks::LIST_PAGES, 10, "page-list-scrubber", |plugin, payload, scope| {
                match payload {
                    HookPayload::PageList(markup) => {
                        HookFlow::Continue(HookPayload::PageList(plugin.scrub_page_list(&scope.actor, markup)))
                    }
                    other => HookFlow::Continue(other),
                }
            });
        }

        if features.recent_items {
            self.bind(dispatcher, hooks::RECENT_ITEMS, 1, "recent-items-scrubber", |plugin, payload, scope| {
                match payload {
                    HookPayload::RecentItems(items) => {
                        HookFlow::Continue(HookPayload::RecentItems(plugin.scrub_recent(&scope.actor, items)))
                    }
                    other => HookFlow::Continue(other),
                }
            });
        }

        if features.search_filter {
            self.bind(dispatcher, hooks::PRE_GET_POSTS, 10, "search-filter", |plugin, payload, scope| {
                match payload {
                    HookPayload::Query(mut query) => {
                        plugin.restrict_search(scope, &mut query);
                        HookFlow::Continue(HookPayload::Query(query))
                    }
                    other => HookFlow::Continue(other),
                }
            });
        }

        if features.restrict_titles {
            self.bind(dispatcher, hooks::THE_TITLE, 100, "title-filter", |plugin, payload, scope| {
                match payload {
                    HookPayload::Title(title) => {
                        HookFlow::Continue(HookPayload::Title(plugin.filter_title(scope, title)))
                    }
                    other => HookFlow::Continue(other),
                }
            });
        }

        self.bind(dispatcher, hooks::POST_SUBMITBOX, 10, "editor-panel", |plugin, payload, _scope| {
            match payload {
                HookPayload::EditorPanel { content_id, mut markup } => {
                    markup.push_str(&plugin.render_panel(content_id));
                    HookFlow::Continue(HookPayload::EditorPanel { content_id, markup })
                }
                other => HookFlow::Continue(other),
            }
        });

        self.bind(dispatcher, hooks::SAVE_POST, 10, "editor-save", |plugin, payload, scope| {
            match payload {
                HookPayload::Save {
                    content_id,
                    submission,
                    ..
                } => {
                    let outcome = match plugin.save(content_id, &submission, scope.autosave) {
                        Ok(outcome) => Some(outcome),
                        Err(err) => {
                            warn!(target = "rolegate", content = %content_id, error = %err, "restriction save failed");
                            None
                        }
                    };
                    HookFlow::Continue(HookPayload::Save {
                        content_id,
                        submission,
                        outcome,
                    })
                }
                other => HookFlow::Continue(other),
            }
        });

        self.bind(dispatcher, hooks::REDIRECT_POST_LOCATION, 99, "notice-query-var", |plugin, payload, _scope| {
            match payload {
                HookPayload::RedirectLocation { content_id, location } => {
                    let location = plugin.post_save_location(content_id, location);
                    HookFlow::Continue(HookPayload::RedirectLocation { content_id, location })
                }
                other => HookFlow::Continue(other),
            }
        });

        self.bind(dispatcher, hooks::ADMIN_NOTICES, 10, "notice-render", |plugin, payload, scope| {
            match payload {
                HookPayload::AdminNotices(mut html) => {
                    if let Some(notice) = plugin.admin_notice(&scope.query) {
                        html.push_str(&notice);
                    }
                    HookFlow::Continue(HookPayload::AdminNotices(html))
                }
                other => HookFlow::Continue(other),
            }
        });
    }

    fn bind<F>(
        self: &Arc<Self>,
        dispatcher: &dyn HookDispatcher<HookPayload, RequestScope>,
        hook: &str,
        priority: i32,
        label: &str,
        handler: F,
    ) where
        F: Fn(&RestrictPlugin, HookPayload, &RequestScope) -> HookFlow<HookPayload> + Send + Sync + 'static,
    {
        let plugin = Arc::clone(self);
        let handler: HookHandler<HookPayload, RequestScope> =
            Arc::new(move |payload, scope| handler(&plugin, payload, scope));
        dispatcher.bind(hook, priority, label, handler);
    }

    pub fn filter_content(&self, scope: &RequestScope, body: String) -> RenderedBody {
        let Some(id) = scope.content_id else {
            return RenderedBody::Markup(body);
        };
        let settings = self.settings();
        content::filter_content(
            &self.broker,
            self.collab.directory.as_ref(),
            &settings,
            id,
            &scope.actor,
            body,
        )
    }

    pub fn strip_anchors(&self, actor: &Actor, body: String) -> String {
        if self.broker.is_privileged(actor) {
            return body;
        }
        let scrubbed = scrub_anchors(
            &body,
            |href| self.collab.directory.resolve_url(href),
            |id| !self.broker.is_visible(id, actor),
        );
        scrubbed.output
    }

    pub fn scrub_menu(&self, actor: &Actor, markup: String, entries: &[MenuEntry]) -> String {
        if self.broker.is_privileged(actor) {
            return markup;
        }
        let scrubbed = scrub_menu(&markup, entries, |id| !self.broker.is_visible(id, actor));
        debug!(target = "rolegate", removed = scrubbed.report.removed.len(), "menu scrubbed");
        scrubbed.output
    }

    pub fn scrub_page_list(&self, actor: &Actor, markup: String) -> String {
        if self.broker.is_privileged(actor) {
            return markup;
        }
        scrub_page_list(&markup, |id| !self.broker.is_visible(id, actor)).output
    }

    pub fn scrub_recent(&self, actor: &Actor, items: Vec<RecentItem>) -> Vec<RecentItem> {
        if self.broker.is_privileged(actor) {
            return items;
        }
        let (kept, _report) = scrub_recent(items, |id| !self.broker.is_visible(id, actor));
        kept
    }

    pub fn restrict_search(&self, scope: &RequestScope, query: &mut ContentQuery) -> usize {
        search::restrict_search(&self.broker, query, &scope.actor, scope.admin_screen)
    }

    pub fn filter_title(&self, scope: &RequestScope, title: String) -> String {
        if scope.admin_screen {
            return title;
        }
        let settings = self.settings();
        content::filter_title(
            &self.broker,
            self.collab.directory.as_ref(),
            &settings,
            title,
            &scope.actor,
        )
    }

    fn with_editor<T>(&self, run: impl FnOnce(&EditorExtension<'_>) -> T) -> T {
        let settings = self.settings();
        let editor = EditorExtension {
            metadata: self.collab.metadata.as_ref(),
            directory: self.collab.directory.as_ref(),
            roles: self.collab.roles.as_ref(),
            nonces: self.collab.nonces.as_ref(),
            settings: &settings,
        };
        run(&editor)
    }

    pub fn render_panel(&self, id: ContentId) -> String {
        self.with_editor(|editor| editor.render_panel(id))
    }

    /// Persists the panel. A rejected redirect URL queues the one-shot notice for `id`;
    /// any other completed save drops a notice still pending from an earlier one.
    pub fn save(
        &self,
        id: ContentId,
        submission: &EditorSubmission,
        autosave: bool,
    ) -> PluginResult<SaveOutcome> {
        let outcome = self.with_editor(|editor| editor.save(id, submission, autosave))?;
        if let SaveOutcome::Saved { .. } = outcome {
            let mut pending = self.pending_notices.lock();
            if outcome.needs_notice() {
                pending.insert(id);
            } else {
                pending.remove(&id);
            }
        }
        Ok(outcome)
    }

    pub fn post_save_location(&self, id: ContentId, location: String) -> String {
        if !self.pending_notices.lock().remove(&id) {
            return location;
        }
        editor::add_notice_query_var(&location, &self.settings().notice)
    }

    pub fn admin_notice(&self, query: &BTreeMap<String, String>) -> Option<String> {
        editor::render_admin_notice(query, &self.settings().notice)
    }
}
