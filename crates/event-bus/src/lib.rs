use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

/// Result of running one handler: keep going, or stop the chain for this dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookFlow<P> {
    Continue(P),
    Halt(P),
}

impl<P> HookFlow<P> {
    pub fn into_inner(self) -> P {
        match self {
            HookFlow::Continue(payload) | HookFlow::Halt(payload) => payload,
        }
    }
}

/// A filter handler receives the payload by value along with the request context.
pub type HookHandler<P, C> = Arc<dyn Fn(P, &C) -> HookFlow<P> + Send + Sync>;

/// Describes one registered binding, for inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingInfo {
    pub hook: String,
    pub priority: i32,
    pub label: String,
}

/// Host-side dispatcher the integration registers against at startup.
pub trait HookDispatcher<P, C>: Send + Sync {
    fn bind(&self, hook: &str, priority: i32, label: &str, handler: HookHandler<P, C>);

    /// Runs every binding of `hook` in ascending priority, then registration order.
    fn dispatch(&self, hook: &str, payload: P, ctx: &C) -> P;

    fn bindings(&self, hook: &str) -> Vec<BindingInfo>;
}

struct Binding<P, C> {
    priority: i32,
    seq: u64,
    label: String,
    handler: HookHandler<P, C>,
}

impl<P, C> Clone for Binding<P, C> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            seq: self.seq,
            label: self.label.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

struct DispatcherState<P, C> {
    hooks: HashMap<String, Vec<Binding<P, C>>>,
    next_seq: u64,
}

/// Simple in-memory dispatcher suitable for tests and embedded hosts.
pub struct InMemoryDispatcher<P, C> {
    state: RwLock<DispatcherState<P, C>>,
}

impl<P, C> InMemoryDispatcher<P, C> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(DispatcherState {
                hooks: HashMap::new(),
                next_seq: 0,
            }),
        })
    }
}

impl<P, C> HookDispatcher<P, C> for InMemoryDispatcher<P, C>
where
    P: Send + Sync,
    C: Send + Sync,
{
    fn bind(&self, hook: &str, priority: i32, label: &str, handler: HookHandler<P, C>) {
        let mut state = self.state.write();
        let seq = state.next_seq;
        state.next_seq += 1;
        let chain = state.hooks.entry(hook.to_string()).or_default();
        chain.push(Binding {
            priority,
            seq,
            label: label.to_string(),
            handler,
        });
        chain.sort_by_key(|binding| (binding.priority, binding.seq));
    }

    fn dispatch(&self, hook: &str, payload: P, ctx: &C) -> P {
        // Handlers run without the lock held so they may dispatch other hooks.
        let chain = {
            let state = self.state.read();
            match state.hooks.get(hook) {
                Some(chain) => chain.clone(),
                None => return payload,
            }
        };

        let mut current = payload;
        for binding in chain {
            match (binding.handler)(current, ctx) {
                HookFlow::Continue(next) => current = next,
                HookFlow::Halt(last) => {
                    trace!(target = "rolegate-event-bus", hook, label = %binding.label, "hook chain halted");
                    return last;
                }
            }
        }
        current
    }

    fn bindings(&self, hook: &str) -> Vec<BindingInfo> {
        let state = self.state.read();
        state
            .hooks
            .get(hook)
            .map(|chain| {
                chain
                    .iter()
                    .map(|binding| BindingInfo {
                        hook: hook.to_string(),
                        priority: binding.priority,
                        label: binding.label.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append(tag: &'static str) -> HookHandler<String, ()> {
        Arc::new(move |mut payload: String, _ctx: &()| {
            payload.push_str(tag);
            HookFlow::Continue(payload)
        })
    }

    #[test]
    fn runs_by_priority_then_registration_order() {
        let dispatcher = InMemoryDispatcher::<String, ()>::new();
        dispatcher.bind("render", 20, "late", append("c"));
        dispatcher.bind("render", 10, "first", append("a"));
        dispatcher.bind("render", 10, "second", append("b"));

        assert_eq!(dispatcher.dispatch("render", String::new(), &()), "abc");
        let labels: Vec<_> = dispatcher
            .bindings("render")
            .into_iter()
            .map(|info| info.label)
            .collect();
        assert_eq!(labels, vec!["first", "second", "late"]);
    }

    #[test]
    fn halt_skips_remaining_handlers() {
        let dispatcher = InMemoryDispatcher::<String, ()>::new();
        dispatcher.bind(
            "render",
            1,
            "stop",
            Arc::new(|_payload: String, _ctx: &()| HookFlow::Halt("stopped".to_string())),
        );
        dispatcher.bind("render", 2, "never", append("!"));

        assert_eq!(dispatcher.dispatch("render", "x".into(), &()), "stopped");
    }

    #[test]
    fn unknown_hook_passes_payload_through() {
        let dispatcher = InMemoryDispatcher::<String, ()>::new();
        assert_eq!(dispatcher.dispatch("missing", "same".into(), &()), "same");
        assert!(dispatcher.bindings("missing").is_empty());
    }
}
