//! CadenzaEngine that owns the dispatchers of an audio graph

use crate::Result;
use arc_swap::ArcSwap;
use cadenza_core::compat::{Arc, RwLock};
use cadenza_core::{
    compile_tree_list, AtomicStamp, DispatchSource, EngineConfig, SoundScope, StageFlags,
    TreeDispatcher,
};

#[cfg(feature = "render")]
use cadenza_core::compat::{Mutex, Weak};
#[cfg(feature = "render")]
use cadenza_render::{RenderSync, Renderer, SyncFlags};

/// Receives configuration changes published by the engine.
#[cfg(feature = "render")]
pub(crate) trait ConfigListener: Send + Sync {
    /// Move to `config`. Properties already at their target are left alone.
    fn apply_config(&self, config: &EngineConfig) -> Result<()>;
}

#[cfg(feature = "render")]
impl ConfigListener for RenderSync {
    fn apply_config(&self, config: &EngineConfig) -> Result<()> {
        if self.sample_rate() != config.sample_rate {
            self.set_sample_rate(config.sample_rate)?;
        }
        if self.buffer_size() != config.buffer_size {
            self.set_buffer_size(config.buffer_size)?;
        }
        if self.audio_channels() != config.audio_channels {
            self.set_audio_channels(config.audio_channels)?;
        }
        Ok(())
    }
}

struct Registration {
    source: DispatchSource,
    scope: SoundScope,
    dispatcher: Arc<TreeDispatcher>,
}

/// Owns one [`TreeDispatcher`] per registered (source, sound scope) pair and
/// keeps their tree lists in step with the graph.
///
/// Graph edits are not observed; call [`invalidate`](Self::invalidate) after
/// linking, unlinking, arming or disarming. The next [`tick`](Self::tick)
/// recompiles every stale tree list before running the dispatchers.
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let engine = CadenzaEngine::builder().build()?;
///
/// let source = DispatchSource::Audio(panel.clone());
/// arm(&source, SoundScope::Playback);
/// engine.add_source(source, SoundScope::Playback);
///
/// // Once per processing cycle
/// engine.tick();
/// ```
pub struct CadenzaEngine {
    config: ArcSwap<EngineConfig>,
    staging_program: Vec<StageFlags>,
    graph_stamp: AtomicStamp,
    sources: RwLock<Vec<Registration>>,

    #[cfg(feature = "render")]
    listeners: Mutex<Vec<Weak<dyn ConfigListener>>>,
}

impl CadenzaEngine {
    pub fn builder() -> crate::CadenzaEngineBuilder {
        crate::CadenzaEngineBuilder::default()
    }

    pub(crate) fn from_parts(config: EngineConfig, staging_program: Vec<StageFlags>) -> Self {
        tracing::debug!(?config, stages = staging_program.len(), "created engine");
        Self {
            config: ArcSwap::from_pointee(config),
            staging_program,
            // Dispatchers start at 0, so every new one compiles on its first tick.
            graph_stamp: AtomicStamp::new(1),
            sources: RwLock::new(Vec::new()),
            #[cfg(feature = "render")]
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> EngineConfig {
        **self.config.load()
    }

    pub fn staging_program(&self) -> &[StageFlags] {
        &self.staging_program
    }

    /// Validate and publish a new configuration.
    ///
    /// Render engines created through [`render_sync`](Self::render_sync) are
    /// moved to the new configuration first. If one of them fails, the ones
    /// already moved are returned to the current configuration and nothing is
    /// published.
    pub fn set_config(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        let previous = self.config();

        #[cfg(feature = "render")]
        self.notify_listeners(&previous, &config)?;

        self.config.store(Arc::new(config));
        tracing::debug!(from = ?previous, to = ?config, "engine config changed");
        Ok(())
    }

    /// Register a dispatcher for `source` at `scope`, or return the one already
    /// registered for the pair.
    pub fn add_source(&self, source: DispatchSource, scope: SoundScope) -> Arc<TreeDispatcher> {
        let mut sources = self.sources.write();
        if let Some(existing) = sources
            .iter()
            .find(|reg| reg.scope == scope && reg.source.same_as(&source))
        {
            return Arc::clone(&existing.dispatcher);
        }

        let dispatcher = Arc::new(TreeDispatcher::with_staging_program(&self.staging_program));
        tracing::debug!(?source, %scope, "registered dispatch source");
        sources.push(Registration {
            source,
            scope,
            dispatcher: Arc::clone(&dispatcher),
        });
        dispatcher
    }

    /// Unregister `source` at `scope` and drop its entries from every other
    /// dispatcher's tree list. Returns the removed dispatcher.
    pub fn remove_source(
        &self,
        source: &DispatchSource,
        scope: SoundScope,
    ) -> Option<Arc<TreeDispatcher>> {
        let removed = {
            let mut sources = self.sources.write();
            let index = sources
                .iter()
                .position(|reg| reg.scope == scope && reg.source.same_as(source))?;
            let removed = sources.remove(index);
            for reg in sources.iter() {
                reg.dispatcher.remove_dispatch_source(source, scope);
            }
            removed
        };

        tracing::debug!(?source, %scope, "unregistered dispatch source");
        Some(removed.dispatcher)
    }

    pub fn source_count(&self) -> usize {
        self.sources.read().len()
    }

    /// Mark every compiled tree list stale.
    pub fn invalidate(&self) -> u64 {
        self.graph_stamp.bump()
    }

    pub fn graph_stamp(&self) -> u64 {
        self.graph_stamp.get()
    }

    /// Recompile stale tree lists, then run every dispatcher in registration
    /// order.
    pub fn tick(&self) {
        let stamp = self.graph_stamp.get();

        // Snapshot so recalls may register sources or invalidate while running.
        let dispatchers: Vec<Arc<TreeDispatcher>> = {
            let sources = self.sources.read();
            for reg in sources.iter() {
                if reg.dispatcher.tree_list_stamp() != stamp {
                    let tree_list = compile_tree_list(Some(&reg.source), reg.scope);
                    tracing::debug!(
                        source = ?reg.source,
                        scope = %reg.scope,
                        entries = tree_list.len(),
                        stamp,
                        "recompiled tree list"
                    );
                    drop(reg.dispatcher.set_tree_list(tree_list));
                    reg.dispatcher.set_tree_list_stamp(stamp);
                }
            }
            sources.iter().map(|reg| Arc::clone(&reg.dispatcher)).collect()
        };

        for dispatcher in &dispatchers {
            dispatcher.run();
        }
    }

    /// Create a render engine sized by the current configuration and keep it
    /// in step with later [`set_config`](Self::set_config) calls.
    #[cfg(feature = "render")]
    pub fn render_sync<R: Renderer + 'static>(
        &self,
        renderer: R,
        flags: SyncFlags,
    ) -> Result<Arc<RenderSync>> {
        let sync = Arc::new(RenderSync::new(renderer, &self.config(), flags)?);
        let listener: Arc<dyn ConfigListener> = sync.clone();
        self.add_listener(&listener);
        Ok(sync)
    }

    #[cfg(feature = "render")]
    pub(crate) fn add_listener(&self, listener: &Arc<dyn ConfigListener>) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|weak| weak.strong_count() > 0);
        listeners.push(Arc::downgrade(listener));
    }

    #[cfg(feature = "render")]
    fn notify_listeners(&self, previous: &EngineConfig, config: &EngineConfig) -> Result<()> {
        let listeners: Vec<Arc<dyn ConfigListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|weak| weak.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };

        for (index, listener) in listeners.iter().enumerate() {
            if let Err(err) = listener.apply_config(config) {
                // The failing one may have moved part of the way too.
                for moved in &listeners[..=index] {
                    if let Err(rollback) = moved.apply_config(previous) {
                        tracing::warn!(%rollback, "failed to restore render config");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for CadenzaEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CadenzaEngine")
            .field("config", &self.config())
            .field("graph_stamp", &self.graph_stamp())
            .field("sources", &self.source_count())
            .finish()
    }
}
